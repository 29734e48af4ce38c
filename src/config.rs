use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::auth::jwt::{AccessTokenCodec, DEFAULT_MAX_TTL_SECS, ISSUER};
use crate::auth::password::PasswordParams;
use crate::auth::session::SessionConfig;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    /// Deployment platform name ("dev", "prod", ...)
    #[serde(default = "default_platform")]
    pub platform: String,
    /// PostgreSQL connection URL; in-memory stores are used when absent
    #[serde(default)]
    pub postgres_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret; usually supplied through `JWT_SECRET`
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,
    #[serde(default = "default_max_access_ttl")]
    pub max_access_token_ttl_secs: i64,
    #[serde(default = "default_access_ttl")]
    pub refresh_access_token_ttl_secs: i64,
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
    #[serde(default)]
    pub password: PasswordParams,
    /// Static key for `Authorization: ApiKey` callers (`POLKA_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: default_issuer(),
            access_token_ttl_secs: default_access_ttl(),
            max_access_token_ttl_secs: default_max_access_ttl(),
            refresh_access_token_ttl_secs: default_access_ttl(),
            store_timeout_ms: default_store_timeout(),
            password: PasswordParams::default(),
            api_key: None,
        }
    }
}

fn default_platform() -> String {
    "dev".to_string()
}

fn default_issuer() -> String {
    ISSUER.to_string()
}

fn default_access_ttl() -> i64 {
    3600
}

fn default_max_access_ttl() -> i64 {
    DEFAULT_MAX_TTL_SECS
}

fn default_store_timeout() -> u64 {
    5000
}

/// Upper bound for any configured access token lifetime.
pub const MAX_TTL_CEILING_SECS: i64 = 30 * 24 * 3600;

fn secs(value: i64, field: &str) -> anyhow::Result<chrono::Duration> {
    chrono::Duration::try_seconds(value).with_context(|| format!("auth.{} out of range", field))
}

impl AuthConfig {
    pub fn session_config(&self) -> anyhow::Result<SessionConfig> {
        Ok(SessionConfig {
            access_token_ttl: secs(self.access_token_ttl_secs, "access_token_ttl_secs")?,
            refresh_access_token_ttl: secs(
                self.refresh_access_token_ttl_secs,
                "refresh_access_token_ttl_secs",
            )?,
            store_timeout: std::time::Duration::from_millis(self.store_timeout_ms),
            api_key: self.api_key.clone(),
        })
    }

    pub fn token_codec(&self) -> anyhow::Result<AccessTokenCodec> {
        Ok(AccessTokenCodec::new(
            &self.jwt_secret,
            self.issuer.clone(),
            secs(self.max_access_token_ttl_secs, "max_access_token_ttl_secs")?,
        ))
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.is_empty() {
            bail!("auth.jwt_secret is empty (set JWT_SECRET)");
        }
        let max = self.max_access_token_ttl_secs;
        if max <= 0 || max > MAX_TTL_CEILING_SECS {
            bail!(
                "auth.max_access_token_ttl_secs must be in 1..={} (got {})",
                MAX_TTL_CEILING_SECS,
                max
            );
        }
        for (field, ttl) in [
            ("access_token_ttl_secs", self.access_token_ttl_secs),
            ("refresh_access_token_ttl_secs", self.refresh_access_token_ttl_secs),
        ] {
            if ttl <= 0 || ttl > max {
                bail!("auth.{} must be in 1..={} (got {})", field, max, ttl);
            }
        }
        if self.store_timeout_ms == 0 {
            bail!("auth.store_timeout_ms must be positive");
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml` and apply environment overrides.
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content, |key| std::env::var(key).ok())
    }

    /// Parse YAML, then overlay values from `lookup` (normally the process environment).
    pub fn from_yaml(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let mut config: AppConfig =
            serde_yaml::from_str(content).context("Failed to parse config yaml")?;

        if let Some(secret) = lookup("JWT_SECRET") {
            config.auth.jwt_secret = secret;
        }
        if let Some(url) = lookup("DB_URL") {
            config.postgres_url = Some(url);
        }
        if let Some(platform) = lookup("PLATFORM") {
            config.platform = platform;
        }
        if let Some(key) = lookup("POLKA_KEY") {
            config.auth.api_key = Some(key);
        }
        // A blank key disables API-key callers rather than matching a blank header
        config.auth.api_key = config
            .auth
            .api_key
            .take()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        crate::logging::parse_rotation(&config.rotation)?;
        config.auth.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
log_level: info
log_dir: logs
log_file: chirpy.log
use_json: false
rotation: daily
gateway:
  host: 0.0.0.0
  port: 8080
auth:
  jwt_secret: from-yaml
"#;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml(MINIMAL, env(&[])).unwrap();
        assert_eq!(config.platform, "dev");
        assert_eq!(config.postgres_url, None);
        assert_eq!(config.auth.issuer, "chirpy");
        assert_eq!(config.auth.access_token_ttl_secs, 3600);
        assert_eq!(config.auth.max_access_token_ttl_secs, 86400);
        assert_eq!(config.auth.refresh_access_token_ttl_secs, 3600);
        assert_eq!(config.auth.store_timeout_ms, 5000);
        assert_eq!(config.auth.password, PasswordParams::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_yaml(
            MINIMAL,
            env(&[
                ("JWT_SECRET", "from-env"),
                ("DB_URL", "postgres://u:p@localhost/chirpy"),
                ("PLATFORM", "prod"),
                ("POLKA_KEY", "k"),
            ]),
        )
        .unwrap();
        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(
            config.postgres_url.as_deref(),
            Some("postgres://u:p@localhost/chirpy")
        );
        assert_eq!(config.platform, "prod");
        assert_eq!(config.auth.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let yaml = MINIMAL.replace("jwt_secret: from-yaml", "jwt_secret: \"\"");
        assert!(AppConfig::from_yaml(&yaml, env(&[])).is_err());
        assert!(AppConfig::from_yaml(&yaml, env(&[("JWT_SECRET", "s")])).is_ok());
    }

    #[test]
    fn test_session_config_conversion() {
        let config = AppConfig::from_yaml(MINIMAL, env(&[])).unwrap();
        let session = config.auth.session_config().unwrap();
        assert_eq!(session.access_token_ttl, chrono::Duration::hours(1));
        assert_eq!(session.store_timeout, std::time::Duration::from_secs(5));
        assert_eq!(
            config.auth.token_codec().unwrap().max_ttl(),
            chrono::Duration::hours(24)
        );
    }

    fn with_auth(extra: &str) -> String {
        format!("{}{}", MINIMAL, extra)
    }

    #[test]
    fn test_ttl_bounds() {
        for bad in [
            "  max_access_token_ttl_secs: 9223372036854775807\n",
            "  max_access_token_ttl_secs: 0\n",
            "  max_access_token_ttl_secs: -5\n",
            "  access_token_ttl_secs: 0\n",
            "  refresh_access_token_ttl_secs: -1\n",
            // Login TTL above the ceiling would be silently clamped
            "  access_token_ttl_secs: 90000\n",
        ] {
            assert!(
                AppConfig::from_yaml(&with_auth(bad), env(&[])).is_err(),
                "accepted: {}",
                bad.trim()
            );
        }

        let ok = with_auth(
            "  max_access_token_ttl_secs: 600\n  access_token_ttl_secs: 600\n  refresh_access_token_ttl_secs: 60\n",
        );
        let config = AppConfig::from_yaml(&ok, env(&[])).unwrap();
        assert_eq!(
            config.auth.token_codec().unwrap().max_ttl(),
            chrono::Duration::minutes(10)
        );
    }

    #[test]
    fn test_out_of_range_seconds_do_not_panic() {
        let auth = AuthConfig {
            max_access_token_ttl_secs: i64::MAX,
            access_token_ttl_secs: i64::MIN,
            ..AuthConfig::default()
        };
        assert!(auth.token_codec().is_err());
        assert!(auth.session_config().is_err());
    }

    #[test]
    fn test_blank_api_key_disables_api_key_auth() {
        let config = AppConfig::from_yaml(MINIMAL, env(&[("POLKA_KEY", "")])).unwrap();
        assert_eq!(config.auth.api_key, None);

        let config = AppConfig::from_yaml(&with_auth("  api_key: \"   \"\n"), env(&[])).unwrap();
        assert_eq!(config.auth.api_key, None);

        let config = AppConfig::from_yaml(MINIMAL, env(&[("POLKA_KEY", " k1 ")])).unwrap();
        assert_eq!(config.auth.api_key.as_deref(), Some("k1"));
    }

    #[test]
    fn test_unknown_rotation_rejected() {
        let yaml = MINIMAL.replace("rotation: daily", "rotation: weekly");
        assert!(AppConfig::from_yaml(&yaml, env(&[])).is_err());
    }

    #[test]
    fn test_dev_yaml_parses() {
        let content = include_str!("../config/dev.yaml");
        let config = AppConfig::from_yaml(content, env(&[("JWT_SECRET", "s")])).unwrap();
        assert_eq!(config.gateway.port, 8080);
    }
}
