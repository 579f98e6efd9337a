use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub signup: SignupConfig,
    pub smtp: Option<SmtpDefaults>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            signup: SignupConfig::load()?,
            smtp: SmtpDefaults::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Behavior of the signup intake pipeline.
#[derive(Debug, Clone)]
pub struct SignupConfig {
    /// When enabled, submissions are parked in the confirmation token store
    /// and a confirmation email is sent instead of persisting immediately.
    pub email_confirmation: bool,
    /// Base URL embedded in confirmation links.
    pub base_url: String,
    /// Lifetime of an unconfirmed signup candidate.
    pub confirmation_ttl: Duration,
}

impl SignupConfig {
    fn load() -> Result<Self, ConfigError> {
        let email_confirmation = env::var("COLLECTO_EMAIL_CONFIRMATION")
            .map(|value| parse_toggle(&value))
            .unwrap_or(false);

        let base_url = env::var("COLLECTO_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let confirmation_ttl = match env::var("COLLECTO_CONFIRMATION_TTL_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .map_err(|_| ConfigError::InvalidConfirmationTtl)?,
            ),
            Err(_) => Duration::from_secs(3600),
        };

        Ok(Self {
            email_confirmation,
            base_url,
            confirmation_ttl,
        })
    }
}

impl Default for SignupConfig {
    fn default() -> Self {
        Self {
            email_confirmation: false,
            base_url: "http://localhost:3000".to_string(),
            confirmation_ttl: Duration::from_secs(3600),
        }
    }
}

/// Process-wide SMTP fallback used when a form carries no settings of its own.
#[derive(Debug, Clone)]
pub struct SmtpDefaults {
    pub from_address: String,
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl SmtpDefaults {
    fn load() -> Result<Option<Self>, ConfigError> {
        let server = match env::var("COLLECTO_SMTP_HOST") {
            Ok(server) => server,
            Err(_) => return Ok(None),
        };

        let port = env::var("COLLECTO_SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort)?;

        let from_address = env::var("COLLECTO_SMTP_FROM")
            .map_err(|_| ConfigError::IncompleteSmtp { missing: "COLLECTO_SMTP_FROM" })?;
        let username = env::var("COLLECTO_SMTP_USERNAME")
            .map_err(|_| ConfigError::IncompleteSmtp { missing: "COLLECTO_SMTP_USERNAME" })?;
        let password = env::var("COLLECTO_SMTP_PASSWORD")
            .map_err(|_| ConfigError::IncompleteSmtp { missing: "COLLECTO_SMTP_PASSWORD" })?;

        Ok(Some(Self {
            from_address,
            server,
            port,
            username,
            password,
        }))
    }
}

fn parse_toggle(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidConfirmationTtl,
    InvalidSmtpPort,
    IncompleteSmtp { missing: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidConfirmationTtl => {
                write!(f, "COLLECTO_CONFIRMATION_TTL_SECS must be a number of seconds")
            }
            ConfigError::InvalidSmtpPort => write!(f, "COLLECTO_SMTP_PORT must be a valid u16"),
            ConfigError::IncompleteSmtp { missing } => {
                write!(f, "smtp configuration is incomplete: {missing} is not set")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
