use super::*;

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.solarweb.com".to_string(),
            auth_url: "https://login.fronius.com/commonauth".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: None,
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            install_date: None,
            database: None,
            timezone: "UTC".to_string(),
            poll_interval_secs: 30,
            request_timeout_secs: 30,
            login_backoff_secs: 30,
            backfill_spacing_ms: 500,
            max_catchup_days: 31,
            exit_on_auth_error: true,
            aggregate: true,
            portal: PortalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
