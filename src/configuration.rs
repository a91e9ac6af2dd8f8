use crate::error::ConfigError;

/// Upper bound for any access token lifetime, in seconds.
pub const MAX_ACCESS_TOKEN_EXPIRY: i64 = 3600;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub webhook: WebhookSettings,
    /// Required; `dev` enables `POST /admin/reset`
    pub platform: Platform,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Access token signing settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// seconds; must lie in (0, 3600]
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
}

/// Settings for the privileged payment-provider webhook
#[derive(serde::Deserialize, Clone)]
pub struct WebhookSettings {
    pub api_key: String,
}

/// Deployment environment. Destructive admin operations only run on `Dev`.
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Dev,
    Production,
}

impl Platform {
    pub fn allows_reset(&self) -> bool {
        matches!(self, Platform::Dev)
    }
}

fn default_issuer() -> String {
    "chirper".to_string()
}

fn default_access_token_expiry() -> i64 {
    MAX_ACCESS_TOKEN_EXPIRY
}

impl Settings {
    /// Reject configurations the service must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }
        if self.webhook.api_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired("webhook.api_key".to_string()));
        }
        if self.jwt.access_token_expiry <= 0
            || self.jwt.access_token_expiry > MAX_ACCESS_TOKEN_EXPIRY
        {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.access_token_expiry must be in (0, {}], got {}",
                MAX_ACCESS_TOKEN_EXPIRY, self.jwt.access_token_expiry
            )));
        }
        Ok(())
    }
}

/// Load settings from `configuration.{yaml,toml,json}` (optional) overlaid
/// with `APP_`-prefixed environment variables, e.g. `APP_JWT__SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    // A missing .env file is fine; the variables may come from the real environment.
    let _ = dotenvy::dotenv();

    let settings = config::Config::builder()
        .set_default("application.port", 8080)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings_from(settings)
}

fn settings_from(config: config::Config) -> Result<Settings, ConfigError> {
    let settings = config.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}
