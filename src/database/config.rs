//! WordPress configuration file support
//!
//! Reads the database credentials and table prefix out of `wp-config.php`
//! and applies environment variable overrides.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::schema::{DEFAULT_TABLE_PREFIX, Queries};

/// WordPress configuration filename, relative to the install root
pub const WP_CONFIG_FILENAME: &str = "wp-config.php";

/// Host used when `DB_HOST` is not defined
pub const DEFAULT_DB_HOST: &str = "localhost";

/// MySQL port used when `DB_HOST` carries none
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Environment variable overriding `DB_HOST`
pub const ENV_DB_HOST: &str = "WP_EXPORT_DB_HOST";

/// Environment variable overriding `DB_NAME`
pub const ENV_DB_NAME: &str = "WP_EXPORT_DB_NAME";

/// Environment variable overriding `DB_USER`
pub const ENV_DB_USER: &str = "WP_EXPORT_DB_USER";

/// Environment variable overriding `DB_PASSWORD`
pub const ENV_DB_PASSWORD: &str = "WP_EXPORT_DB_PASSWORD";

/// Environment variable overriding `$table_prefix`
pub const ENV_TABLE_PREFIX: &str = "WP_EXPORT_TABLE_PREFIX";

static DEFINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*define\(\s*['"]([A-Za-z_]+)['"]\s*,\s*['"]([^'"]*)['"]\s*\)\s*;"#)
        .expect("define pattern is valid")
});

static TABLE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*\$table_prefix\s*=\s*['"]([^'"]+)['"]\s*;"#)
        .expect("table prefix pattern is valid")
});

/// Configuration errors. All of them abort the run.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {0}: {1}")]
    ReadFailed(PathBuf, String),

    #[error("Missing required setting {0}")]
    MissingValue(&'static str),

    #[error("Invalid table prefix '{0}': only letters, digits and '_' are allowed")]
    InvalidPrefix(String),

    #[error("Invalid database host '{0}'")]
    InvalidHost(String),

    #[error("Invalid setting: {0}")]
    InvalidValue(String),

    #[error("Failed to parse settings: {0}")]
    ParseError(String),

    #[error("Failed to serialize settings: {0}")]
    SerializationError(String),
}

/// Where the MySQL server listens, as written in `DB_HOST`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbHost {
    Tcp { host: String, port: u16 },
    Socket(PathBuf),
}

impl DbHost {
    /// Parse a `DB_HOST` value: `host`, `host:port` or `host:/path/to.sock`
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(DbHost::Tcp {
                host: DEFAULT_DB_HOST.to_string(),
                port: DEFAULT_MYSQL_PORT,
            });
        }

        // Bare IPv6 addresses carry several colons and no port
        if raw.matches(':').count() > 1 && !raw.starts_with('[') {
            return Ok(DbHost::Tcp {
                host: raw.to_string(),
                port: DEFAULT_MYSQL_PORT,
            });
        }

        let (host, rest) = match raw.strip_prefix('[') {
            Some(bracketed) => {
                let (host, rest) = bracketed
                    .split_once(']')
                    .ok_or_else(|| ConfigError::InvalidHost(raw.to_string()))?;
                (host, rest.strip_prefix(':'))
            }
            None => match raw.split_once(':') {
                Some((host, rest)) => (host, Some(rest)),
                None => (raw, None),
            },
        };

        match rest {
            None => Ok(DbHost::Tcp {
                host: host.to_string(),
                port: DEFAULT_MYSQL_PORT,
            }),
            Some(rest) if rest.starts_with('/') => Ok(DbHost::Socket(PathBuf::from(rest))),
            Some(rest) => {
                let port = rest
                    .parse()
                    .map_err(|_| ConfigError::InvalidHost(raw.to_string()))?;
                Ok(DbHost::Tcp {
                    host: host.to_string(),
                    port,
                })
            }
        }
    }
}

impl fmt::Display for DbHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbHost::Tcp { host, port } => write!(f, "{}:{}", host, port),
            DbHost::Socket(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Connection parameters read from `wp-config.php`
#[derive(Clone, PartialEq, Eq)]
pub struct WpConfig {
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub db_host: DbHost,
    /// `DB_CHARSET`, informational only; connections always use utf8mb4
    pub charset: Option<String>,
    pub table_prefix: String,
}

impl fmt::Debug for WpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WpConfig")
            .field("db_name", &self.db_name)
            .field("db_user", &self.db_user)
            .field("db_password", &"<redacted>")
            .field("db_host", &self.db_host)
            .field("charset", &self.charset)
            .field("table_prefix", &self.table_prefix)
            .finish()
    }
}

impl WpConfig {
    /// Load `wp-config.php` from a WordPress root directory
    ///
    /// Environment overrides take precedence over the file.
    pub fn load(wp_root: &Path) -> Result<Self, ConfigError> {
        let config_path = wp_root.join(WP_CONFIG_FILENAME);
        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path));
        }

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFailed(config_path.clone(), e.to_string()))?;

        Self::from_sources(&content, |key| std::env::var(key).ok())
    }

    /// Parse configuration file content, without environment overrides
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Self::from_sources(content, |_| None)
    }

    /// Parse file content, consulting `env` for override values
    pub fn from_sources(
        content: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let defines = extract_defines(content);
        // An exported but empty variable does not override the file
        let env = |key: &str| env(key).filter(|v| !v.is_empty());
        let lookup = |env_key: &str, define: &str| {
            env(env_key).or_else(|| defines.get(define).cloned())
        };

        let db_name = lookup(ENV_DB_NAME, "DB_NAME")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingValue("DB_NAME"))?;
        let db_user = lookup(ENV_DB_USER, "DB_USER")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingValue("DB_USER"))?;
        // An explicitly empty password is legitimate on local installs
        let db_password =
            lookup(ENV_DB_PASSWORD, "DB_PASSWORD").ok_or(ConfigError::MissingValue("DB_PASSWORD"))?;
        let db_host = match lookup(ENV_DB_HOST, "DB_HOST") {
            Some(raw) => DbHost::parse(&raw)?,
            None => DbHost::parse(DEFAULT_DB_HOST)?,
        };

        let table_prefix = env(ENV_TABLE_PREFIX)
            .or_else(|| {
                TABLE_PREFIX_RE
                    .captures(content)
                    .map(|caps| caps[1].to_string())
            })
            .unwrap_or_else(|| DEFAULT_TABLE_PREFIX.to_string());
        Queries::validate_prefix(&table_prefix)?;

        Ok(Self {
            db_name,
            db_user,
            db_password,
            db_host,
            charset: defines.get("DB_CHARSET").cloned().filter(|v| !v.is_empty()),
            table_prefix,
        })
    }

    /// Query catalogue for this installation's table prefix
    pub fn queries(&self) -> Result<Queries, ConfigError> {
        Queries::new(&self.table_prefix)
    }
}

/// Collect every `define('NAME', 'value');` constant. The first definition wins.
fn extract_defines(content: &str) -> HashMap<String, String> {
    let mut defines = HashMap::new();
    for caps in DEFINE_RE.captures_iter(content) {
        defines
            .entry(caps[1].to_string())
            .or_insert_with(|| caps[2].to_string());
    }
    defines
}
