use super::*;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &ServerConfig) -> ConfigResult<()> {
        Self::validate_server_settings(config)?;
        Self::validate_engine(config)?;
        Self::validate_sampling(&config.sampling)?;

        if config.context_window_tokens <= config.sampling.max_tokens as usize {
            return Err(ConfigError::InvalidValue {
                field: "context_window_tokens".to_string(),
                value: config.context_window_tokens.to_string(),
                reason: format!(
                    "Must be greater than the default max_tokens ({})",
                    config.sampling.max_tokens
                ),
            });
        }

        Ok(())
    }

    fn validate_server_settings(config: &ServerConfig) -> ConfigResult<()> {
        if config.host.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "host".to_string(),
            });
        }

        if config.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".to_string(),
                value: config.port.to_string(),
                reason: "Port must be > 0".to_string(),
            });
        }

        if config.max_payload_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_payload_size".to_string(),
                value: config.max_payload_size.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        for origin in &config.cors_allowed_origins {
            if !origin.starts_with("http://") && !origin.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    field: "cors_allowed_origins".to_string(),
                    value: origin.clone(),
                    reason: "Origin must start with http:// or https://".to_string(),
                });
            }
        }

        if let Some(level) = &config.log_level {
            if level.parse::<log::LevelFilter>().is_err() {
                return Err(ConfigError::InvalidValue {
                    field: "log_level".to_string(),
                    value: level.clone(),
                    reason: "Must be one of off, error, warn, info, debug, trace".to_string(),
                });
            }
        }

        Ok(())
    }

    fn validate_engine(config: &ServerConfig) -> ConfigResult<()> {
        if config.model_name.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "model_name".to_string(),
            });
        }

        if !config.engine_url.starts_with("http://") && !config.engine_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "engine_url".to_string(),
                value: config.engine_url.clone(),
                reason: "URL must start with http:// or https://".to_string(),
            });
        }

        if config.chat_template.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "chat_template".to_string(),
            });
        }

        if config.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                value: config.request_timeout_secs.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        Ok(())
    }

    fn validate_sampling(sampling: &SamplingDefaults) -> ConfigResult<()> {
        Self::check_temperature("sampling.temperature", sampling.temperature)?;
        Self::check_top_p("sampling.top_p", sampling.top_p)?;
        Self::check_max_tokens("sampling.max_tokens", sampling.max_tokens)
    }

    /// Temperature must lie in [0, 2].
    pub fn check_temperature(field: &str, value: f32) -> ConfigResult<()> {
        if !(0.0..=2.0).contains(&value) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason: "Must be between 0 and 2".to_string(),
            });
        }
        Ok(())
    }

    /// Top-p must lie in (0, 1].
    pub fn check_top_p(field: &str, value: f32) -> ConfigResult<()> {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason: "Must be in (0, 1]".to_string(),
            });
        }
        Ok(())
    }

    pub fn check_max_tokens(field: &str, value: u32) -> ConfigResult<()> {
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(ConfigValidator::validate(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero() {
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        let result = ConfigValidator::validate(&config);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { ref field, .. }) if field == "port")
        );
    }

    #[test]
    fn test_validate_engine_url_scheme() {
        let config = ServerConfig {
            engine_url: "localhost:30000".to_string(),
            ..Default::default()
        };
        let result = ConfigValidator::validate(&config);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { ref field, .. }) if field == "engine_url")
        );
    }

    #[test]
    fn test_validate_empty_model_name() {
        let config = ServerConfig {
            model_name: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            ConfigValidator::validate(&config),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_validate_sampling_ranges() {
        let mut config = ServerConfig::default();
        config.sampling.temperature = 2.5;
        assert!(ConfigValidator::validate(&config).is_err());

        let mut config = ServerConfig::default();
        config.sampling.top_p = 0.0;
        assert!(ConfigValidator::validate(&config).is_err());

        let mut config = ServerConfig::default();
        config.sampling.max_tokens = 0;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_validate_context_window_smaller_than_max_tokens() {
        let config = ServerConfig {
            context_window_tokens: 64,
            ..Default::default()
        };
        let result = ConfigValidator::validate(&config);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "context_window_tokens"
        ));
    }

    #[test]
    fn test_validate_cors_origins() {
        let config = ServerConfig {
            cors_allowed_origins: vec!["localhost:3000".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            ConfigValidator::validate(&config),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "cors_allowed_origins"
        ));

        let config = ServerConfig {
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            ..Default::default()
        };
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_log_level() {
        let config = ServerConfig {
            log_level: Some("loud".to_string()),
            ..Default::default()
        };
        assert!(ConfigValidator::validate(&config).is_err());

        let config = ServerConfig {
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        assert!(ConfigValidator::validate(&config).is_ok());
    }
}
