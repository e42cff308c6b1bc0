//! Composition root: wires configuration, profile storage, the login
//! provider, and the auth controller together for each CLI command.

use anyhow::{bail, Context};
use prodos_auth::{
    ActivityWatcher, AuthController, AuthError, AuthProvider, FallbackProvider, ManagedProvider,
    RateLimitPolicy, RateLimiter, SessionStore, SystemClock, TracingEventSink,
};
use prodos_core::{Config, Paths};
use prodos_storage::FileStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

fn build_controller(config: &Config, paths: &Paths) -> anyhow::Result<AuthController> {
    paths
        .ensure_dirs()
        .context("Failed to create runtime directory")?;

    let store: Arc<dyn prodos_storage::PersistentStore> =
        Arc::new(FileStore::new(paths.profile_file()));
    let clock = Arc::new(SystemClock);
    let events = Arc::new(TracingEventSink);

    // The login strategy is fixed per deployment, chosen once at startup.
    let provider: Arc<dyn AuthProvider> = if let Some(password) = &config.app_password {
        tracing::info!("Using shared-secret login");
        Arc::new(FallbackProvider::new(password.clone()))
    } else if config.uses_managed_auth() {
        let url = config.supabase_url().context("Invalid identity API URL")?;
        tracing::info!(api_url = %url, "Using managed identity service");
        Arc::new(ManagedProvider::new(
            url.as_str().trim_end_matches('/'),
            config.supabase_publishable_key.clone(),
            store.clone(),
        ))
    } else {
        bail!("No login backend configured: set PRODOS_APP_PASSWORD or build with identity service credentials");
    };

    let policy = &config.auth;
    let sessions = SessionStore::new(
        store.clone(),
        clock.clone(),
        Duration::from_secs(u64::from(policy.session_hours) * 3600),
    );
    let limiter = RateLimiter::new(
        store,
        clock,
        RateLimitPolicy {
            max_attempts: policy.max_attempts,
            lockout: Duration::from_secs(u64::from(policy.lockout_minutes) * 60),
        },
        events.clone(),
    );

    Ok(AuthController::new(sessions, limiter, provider, events))
}

fn print_status(controller: &AuthController) -> anyhow::Result<()> {
    let status = controller.status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

pub async fn login(
    config: &Config,
    paths: &Paths,
    identifier: &str,
    secret: &str,
) -> anyhow::Result<()> {
    let controller = build_controller(config, paths)?;

    match controller.login(identifier, secret).await {
        Ok(status) => {
            println!(
                "Logged in as {}",
                status.identity.as_deref().unwrap_or("unknown")
            );
            Ok(())
        }
        Err(e @ AuthError::RateLimited { .. }) => bail!("{e}"),
        Err(e) => bail!("Login failed: {e}"),
    }
}

pub async fn status(config: &Config, paths: &Paths) -> anyhow::Result<()> {
    let controller = build_controller(config, paths)?;
    controller.initialize().await;
    print_status(&controller)
}

pub async fn logout(config: &Config, paths: &Paths) -> anyhow::Result<()> {
    let controller = build_controller(config, paths)?;
    controller.initialize().await;
    controller.logout().await;
    println!("Logged out");
    Ok(())
}

/// Keep the session alive: every line on stdin counts as user activity and
/// is debounced into at most one session extension per window.
pub async fn watch(config: &Config, paths: &Paths) -> anyhow::Result<()> {
    let controller = build_controller(config, paths)?;
    controller.initialize().await;

    if !controller.is_authenticated() {
        bail!("Not logged in");
    }

    let debounce = Duration::from_secs(u64::from(config.auth.activity_debounce_secs));
    let watcher = ActivityWatcher::spawn(controller.clone(), debounce);
    tracing::info!(debounce_secs = debounce.as_secs(), "Watching for activity on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(_line) = lines.next_line().await? {
        if let Err(e @ AuthError::SessionExpired) = controller.validate_session() {
            watcher.shutdown();
            bail!("{e}");
        }
        watcher.signal();
    }

    watcher.shutdown();
    Ok(())
}
