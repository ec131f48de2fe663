use std::str::FromStr;
use std::time::Duration;

use storyflam_core::locking::{LockPolicy, LOCK_SWEEP_INTERVAL_SECS, LOCK_TIMEOUT_SECS};

use crate::auth::jwt::JwtConfig;

/// Runtime settings for the API server, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Front-end origins allowed by CORS.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Upper bound on cleanup after the listener stops.
    pub shutdown_timeout_secs: u64,
    /// Seconds after which an unrefreshed story lock expires.
    pub lock_timeout_secs: i64,
    /// Seconds between stale-lock sweeps.
    pub lock_sweep_interval_secs: u64,
    pub jwt: JwtConfig,
}

/// Parse `key` from the environment, falling back to `default` when unset.
///
/// # Panics
///
/// Panics when the variable is set but does not parse.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key}={raw:?} is invalid: {e}")),
        Err(_) => default,
    }
}

impl ServerConfig {
    /// Build the configuration from the environment.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `HOST`                     | `0.0.0.0`               |
    /// | `PORT`                     | `3000`                  |
    /// | `CORS_ORIGINS`             | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `30`                    |
    /// | `LOCK_TIMEOUT_SECS`        | `300`                   |
    /// | `LOCK_SWEEP_INTERVAL_SECS` | `600`                   |
    ///
    /// JWT settings come from [`JwtConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on unparseable values and on non-positive lock timings, so a
    /// bad deployment fails before it serves traffic.
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        let lock_timeout_secs: i64 = env_or("LOCK_TIMEOUT_SECS", LOCK_TIMEOUT_SECS);
        assert!(lock_timeout_secs > 0, "LOCK_TIMEOUT_SECS must be positive");

        let lock_sweep_interval_secs: u64 =
            env_or("LOCK_SWEEP_INTERVAL_SECS", LOCK_SWEEP_INTERVAL_SECS);
        assert!(
            lock_sweep_interval_secs > 0,
            "LOCK_SWEEP_INTERVAL_SECS must be positive"
        );

        Self {
            host: env_or("HOST", "0.0.0.0".to_string()),
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30),
            lock_timeout_secs,
            lock_sweep_interval_secs,
            jwt: JwtConfig::from_env(),
        }
    }

    pub fn lock_policy(&self) -> LockPolicy {
        LockPolicy::with_timeout_secs(self.lock_timeout_secs)
    }

    pub fn lock_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.lock_sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_uses_default_when_unset() {
        let port: u16 = env_or("STORYFLAM_TEST_UNSET_PORT", 8080);
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_lock_policy_from_config() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            lock_timeout_secs: 120,
            lock_sweep_interval_secs: 60,
            jwt: JwtConfig {
                secret: "s".into(),
                access_token_expiry_mins: 1,
            },
        };
        assert_eq!(config.lock_policy().timeout, chrono::Duration::seconds(120));
        assert_eq!(config.lock_sweep_interval(), Duration::from_secs(60));
    }
}
