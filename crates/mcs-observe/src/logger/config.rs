use std::io::IsTerminal;

use crate::logger::{error::LoggerError, format::LoggerFormat};

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stderr().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color,
        }
    }
}

impl LoggerConfig {
    /// Build from the `[log]` section of the server config.
    pub fn from_parts(level: &str, format: &str) -> Result<Self, LoggerError> {
        if level.trim().is_empty() {
            return Err(LoggerError::InvalidLogLevel(level.to_string()));
        }
        Ok(Self {
            format: format.parse()?,
            level: level.trim().to_string(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_parses_format() {
        let cfg = LoggerConfig::from_parts("debug", "JSON").unwrap();
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert_eq!(cfg.level, "debug");
    }

    #[test]
    fn from_parts_rejects_unknown_format() {
        assert!(matches!(
            LoggerConfig::from_parts("info", "xml"),
            Err(LoggerError::InvalidFormat(_))
        ));
        assert!(matches!(
            LoggerConfig::from_parts(" ", "text"),
            Err(LoggerError::InvalidLogLevel(_))
        ));
    }
}
