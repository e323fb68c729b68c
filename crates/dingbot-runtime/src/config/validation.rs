//! Checks run after extraction, before anything is built from the config.

use super::error::{ConfigError, ConfigResult};
use super::schema::{DingbotConfig, LogOutput, LoggingConfig, OutgoingConfig, RobotConfig};

/// Validates every section in order: logging, robot, outgoing.
pub fn validate_config(config: &DingbotConfig) -> ConfigResult<()> {
    validate_logging(&config.logging)?;
    validate_robot(&config.robot)?;
    validate_outgoing(&config.outgoing)
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::MissingField {
            field: "logging.file_path",
        });
    }

    if let Some(target) = logging
        .filters
        .keys()
        .find(|t| t.is_empty() || t.contains(char::is_whitespace))
    {
        return Err(ConfigError::invalid(
            "logging",
            format!("filter target {target:?} is not a module path"),
        ));
    }

    Ok(())
}

// An empty token list is accepted; the runtime then runs without a client.
fn validate_robot(robot: &RobotConfig) -> ConfigResult<()> {
    if let Some(index) = robot.tokens.iter().position(|t| t.trim().is_empty()) {
        return Err(ConfigError::invalid(
            "robot",
            format!("tokens[{index}] is blank"),
        ));
    }

    if robot.secret.as_deref().is_some_and(str::is_empty) {
        return Err(ConfigError::invalid("robot", "secret is set but empty"));
    }

    let base = robot.base_url.as_str();
    if base.is_empty() {
        return Err(ConfigError::MissingField {
            field: "robot.base_url",
        });
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl {
            url: base.to_string(),
            reason: "scheme must be http or https".to_string(),
        });
    }

    if robot.timeout_ms == 0 {
        return Err(ConfigError::invalid("robot", "timeout_ms must be positive"));
    }

    Ok(())
}

fn validate_outgoing(outgoing: &OutgoingConfig) -> ConfigResult<()> {
    if !outgoing.enabled {
        return Ok(());
    }

    if outgoing.host.is_empty() {
        return Err(ConfigError::MissingField {
            field: "outgoing.host",
        });
    }
    if outgoing.port == 0 {
        return Err(ConfigError::InvalidPort(outgoing.port));
    }
    if !outgoing.path.starts_with('/') {
        return Err(ConfigError::invalid(
            "outgoing",
            format!("path {:?} must start with '/'", outgoing.path),
        ));
    }

    let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
    if set(&outgoing.app_secret) && set(&outgoing.token) {
        return Err(ConfigError::invalid(
            "outgoing",
            "app_secret and token cannot both be set",
        ));
    }

    if outgoing.timestamp_tolerance_ms == 0 {
        return Err(ConfigError::invalid(
            "outgoing",
            "timestamp_tolerance_ms must be positive",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_outgoing() -> DingbotConfig {
        let mut config = DingbotConfig::default();
        config.outgoing.enabled = true;
        config
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&DingbotConfig::default()).is_ok());
    }

    #[test]
    fn test_blank_token() {
        let mut config = DingbotConfig::default();
        config.robot.tokens = vec!["ok".into(), " ".into()];
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.section(), Some("robot"));
        assert_eq!(
            err.to_string(),
            "Invalid [robot] configuration: tokens[1] is blank"
        );
    }

    #[test]
    fn test_empty_secret() {
        let mut config = DingbotConfig::default();
        config.robot.tokens = vec!["t".into()];
        config.robot.secret = Some(String::new());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid { section: "robot", .. })
        ));
    }

    #[test]
    fn test_base_url_scheme() {
        let mut config = DingbotConfig::default();
        config.robot.base_url = "oapi.dingtalk.com".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_disabled_outgoing_is_not_checked() {
        let mut config = DingbotConfig::default();
        config.outgoing.port = 0;
        assert!(validate_config(&config).is_ok());

        config.outgoing.enabled = true;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(0)));
        assert_eq!(err.section(), Some("outgoing"));
    }

    #[test]
    fn test_outgoing_auth_conflict() {
        let mut config = enabled_outgoing();
        config.outgoing.app_secret = Some("secret".into());
        config.outgoing.token = Some("token".into());
        assert!(validate_config(&config).is_err());

        config.outgoing.token = Some(String::new());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_outgoing_path() {
        let mut config = enabled_outgoing();
        config.outgoing.path = "outgoing".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = DingbotConfig::default();
        config.logging.output = LogOutput::File;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField {
                field: "logging.file_path"
            }
        ));
        assert_eq!(err.section(), Some("logging"));
    }
}
