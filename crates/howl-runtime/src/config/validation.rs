//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{AlbumConfig, BotConfig, HowlConfig, LogOutput, LoggingConfig, LoungeConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &HowlConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_lounge_config(&config.lounge)?;
    validate_album_config(&config.album)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    validate_prefix("bot.default_prefix", &bot.default_prefix)?;
    validate_prefix("bot.debug_prefix", &bot.debug_prefix)?;
    Ok(())
}

fn validate_prefix(field: &str, prefix: &str) -> ConfigResult<()> {
    if prefix.is_empty() {
        return Err(ConfigError::missing_field(field));
    }
    if prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "{field} cannot contain whitespace: {prefix:?}"
        )));
    }
    Ok(())
}

fn validate_lounge_config(lounge: &LoungeConfig) -> ConfigResult<()> {
    if !lounge.is_enabled() {
        return Ok(());
    }
    if lounge.rules_channel_id == 0 {
        return Err(ConfigError::missing_field("lounge.rules_channel_id"));
    }
    Ok(())
}

fn validate_album_config(album: &AlbumConfig) -> ConfigResult<()> {
    if album.refresh_interval_secs == 0 {
        return Err(ConfigError::validation(
            "Album refresh interval must be greater than 0",
        ));
    }

    if album.fallback_url.is_empty() {
        return Err(ConfigError::missing_field("album.fallback_url"));
    }

    let Some(url) = &album.url else {
        return Ok(());
    };
    if album_id(url).is_none() {
        return Err(ConfigError::invalid_url(
            url,
            "expected an imgur album url like https://imgur.com/a/<id>",
        ));
    }
    if album.client_id.is_empty() {
        return Err(ConfigError::missing_field("album.client_id"));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    if logging.filters.keys().any(|module| module.is_empty()) {
        return Err(ConfigError::validation("Log filter module cannot be empty"));
    }
    Ok(())
}

/// Extracts the album id from an imgur album url.
///
/// Accepts exactly `http(s)://imgur.com/a/<alphanumeric id>`.
pub fn album_id(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let id = rest.strip_prefix("imgur.com/a/")?;
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&HowlConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_prefix() {
        let mut config = HowlConfig::default();
        config.bot.default_prefix = "w .".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        config.bot.default_prefix = String::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { field }) if field == "bot.default_prefix"
        ));
    }

    #[test]
    fn test_validate_lounge_requires_rules_channel() {
        let mut config = HowlConfig::default();
        config.lounge.community_id = 1;
        assert!(validate_config(&config).is_err());

        config.lounge.rules_channel_id = 2;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_album() {
        let mut config = HowlConfig::default();
        config.album.url = Some("https://imgur.com/gallery/abc".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));

        config.album.url = Some("https://imgur.com/a/abc123".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.album.client_id = "client".to_string();
        assert!(validate_config(&config).is_ok());

        config.album.refresh_interval_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = HowlConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some(PathBuf::from("howl.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_album_id() {
        assert_eq!(album_id("http://imgur.com/a/KLXYG"), Some("KLXYG"));
        assert_eq!(album_id("https://imgur.com/a/a1B2"), Some("a1B2"));
        assert_eq!(album_id("https://imgur.com/a/"), None);
        assert_eq!(album_id("https://imgur.com/a/abc/"), None);
        assert_eq!(album_id("ftp://imgur.com/a/abc"), None);
        assert_eq!(album_id("https://i.imgur.com/a/abc"), None);
    }
}
