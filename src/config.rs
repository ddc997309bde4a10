use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub db_max_connections: u32,
    /// Bearer token the cron trigger must present
    pub cron_secret: Option<String>,
    /// Email transport is unavailable while this is unset
    pub resend_api_key: Option<String>,
    pub resend_base_url: String,
    pub email_from: String,
    pub app_base_url: String,
    pub scheduler_enabled: bool,
    /// UTC hour (0-23) for the in-process scheduler
    pub scheduler_hour: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("database_url", "postgresql://localhost/family_billing")?
            .set_default("bind_address", "0.0.0.0:8080")?
            .set_default("db_max_connections", 10)?
            .set_default("resend_base_url", "https://api.resend.com")?
            .set_default("email_from", "Family Bank <reports@example.com>")?
            .set_default("app_base_url", "http://localhost:3000")?
            .set_default("scheduler_enabled", false)?
            .set_default("scheduler_hour", 2)?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.scheduler_hour > 23 {
            return Err(config::ConfigError::Message(format!(
                "SCHEDULER_HOUR must be between 0 and 23, got {}",
                self.scheduler_hour
            )));
        }
        Ok(())
    }

    /// Empty strings in the environment count as unset
    pub fn cron_secret(&self) -> Option<&str> {
        self.cron_secret.as_deref().filter(|s| !s.is_empty())
    }

    pub fn resend_api_key(&self) -> Option<&str> {
        self.resend_api_key.as_deref().filter(|s| !s.is_empty())
    }
}
