use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Minimum HS256 secret length, in bytes.
pub const MIN_JWT_KEY_LEN: usize = 32;
/// One year.
pub const MAX_JWT_EXPIRE_MINUTES: i64 = 365 * 24 * 60;

#[derive(Parser, Debug)]
#[command(name = "forum", about = "A discussion forum server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Token signing secret
    #[arg(long, env = "FORUM_JWT_KEY", hide_env_values = true)]
    pub jwt_key: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct JwtConfig {
    pub key: String,
    pub issuer: String,
    pub audience: String,
    pub expire_minutes: i64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
    pub jwt_cookie: String,
    pub return_url_cookie: String,
    pub return_url_max_age_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            issuer: "forum".to_string(),
            audience: "forum-clients".to_string(),
            expire_minutes: 60,
        }
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expire_minutes", &self.expire_minutes)
            .finish()
    }
}

impl JwtConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.expire_minutes)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
            jwt_cookie: "jwt".to_string(),
            return_url_cookie: "ReturnUrl".to_string(),
            return_url_max_age_secs: 600,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref key) = cli.jwt_key {
            config.jwt.key = key.clone();
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("forum.db"));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.key.len() < MIN_JWT_KEY_LEN {
            anyhow::bail!(
                "jwt.key must be at least {} bytes (set it in config.toml, --jwt-key or FORUM_JWT_KEY)",
                MIN_JWT_KEY_LEN
            );
        }
        if self.jwt.expire_minutes <= 0 || self.jwt.expire_minutes > MAX_JWT_EXPIRE_MINUTES {
            anyhow::bail!(
                "jwt.expire_minutes must be between 1 and {}",
                MAX_JWT_EXPIRE_MINUTES
            );
        }
        Ok(())
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".forum")
        })
    }

    pub fn db_path(&self) -> Option<&PathBuf> {
        self.database.path.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    fn cli(data_dir: PathBuf) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(data_dir),
            jwt_key: Some(KEY.to_string()),
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.jwt.expire_minutes, 60);
        assert_eq!(config.auth.jwt_cookie, "jwt");
        assert_eq!(config.auth.return_url_cookie, "ReturnUrl");
        assert!(config.jwt.key.is_empty());
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli(PathBuf::from("/tmp/test-forum"));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-forum"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli(tmp.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), Some(&tmp.path().join("forum.db")));
        assert_eq!(config.jwt.key, KEY);
    }

    #[test]
    fn load_rejects_missing_key() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cli = cli(tmp.path().to_path_buf());
        cli.jwt_key = None;
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn load_rejects_short_key() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cli = cli(tmp.path().to_path_buf());
        cli.jwt_key = Some("too-short".to_string());
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[jwt]
key = "a-very-long-secret-key-for-testing-purposes"
issuer = "forum-test"
audience = "forum-test-clients"
expire_minutes = 15
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
            jwt_key: None,
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.jwt.issuer, "forum-test");
        assert_eq!(config.jwt.audience, "forum-test-clients");
        assert_eq!(config.jwt.ttl(), chrono::Duration::minutes(15));
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
port = 9000

[jwt]
key = "a-very-long-secret-key-for-testing-purposes"
"#,
        )
        .unwrap();

        let mut cli = cli(tmp.path().to_path_buf());
        cli.config = Some(config_path);
        cli.port = Some(4000);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.jwt.key, KEY);
    }

    #[test]
    fn validate_bounds_token_lifetime() {
        let mut config = Config::default();
        config.jwt.key = KEY.to_string();
        assert!(config.validate().is_ok());

        config.jwt.expire_minutes = 0;
        assert!(config.validate().is_err());

        config.jwt.expire_minutes = i64::MAX;
        assert!(config.validate().is_err());

        config.jwt.expire_minutes = MAX_JWT_EXPIRE_MINUTES;
        assert!(config.validate().is_ok());
        assert_eq!(config.jwt.ttl(), chrono::Duration::days(365));
    }

    #[test]
    fn debug_output_redacts_key() {
        let mut jwt = JwtConfig::default();
        jwt.key = KEY.to_string();
        let rendered = format!("{:?}", jwt);
        assert!(!rendered.contains(KEY));
        assert!(rendered.contains("<redacted>"));
    }
}
