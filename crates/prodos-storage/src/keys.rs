//! Storage key constants.

/// Storage keys used by the client.
pub struct StorageKeys;

impl StorageKeys {
    /// Local session record (JSON: identity, principalId, provider, expiresAt)
    pub const AUTH_SESSION: &'static str = "auth_session";

    /// Login rate-limit record (JSON: attempts, lockedUntil)
    pub const AUTH_RATE_LIMIT: &'static str = "auth_rate_limit";

    /// Managed provider's private token cache (JSON). Owned entirely by the
    /// provider client, not part of the session/rate-limit schema.
    pub const PROVIDER_TOKENS: &'static str = "sb_provider_tokens";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_unique() {
        let keys = [
            StorageKeys::AUTH_SESSION,
            StorageKeys::AUTH_RATE_LIMIT,
            StorageKeys::PROVIDER_TOKENS,
        ];
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "Storage keys must be unique");
        assert!(keys.iter().all(|k| !k.is_empty()));
    }
}
