//! Launch mode selection.

use strum::{Display, EnumString};

use crate::config::LaunchConfig;

/// How the server is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LaunchMode {
    /// Single auto-reloading process with debug logs.
    Development,
    /// Multi-worker process manager, or single-worker fallback.
    Production,
}

impl LaunchMode {
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Pick the launch mode.
///
/// Development when `DEBUG` is exactly `"true"` or `NODE_ENV` is exactly
/// `"development"`; production for every other combination, including unset.
pub fn select_mode(config: &LaunchConfig) -> LaunchMode {
    let debug = config.debug.as_deref() == Some("true");
    let node_dev = config.node_env.as_deref() == Some("development");
    if debug || node_dev {
        LaunchMode::Development
    } else {
        LaunchMode::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn config(debug: Option<&str>, node_env: Option<&str>) -> LaunchConfig {
        LaunchConfig {
            debug: debug.map(str::to_string),
            node_env: node_env.map(str::to_string),
            path: None,
            settings: Settings::default(),
        }
    }

    #[test]
    fn test_unset_is_production() {
        assert_eq!(select_mode(&config(None, None)), LaunchMode::Production);
    }

    #[test]
    fn test_debug_true_is_development() {
        assert_eq!(
            select_mode(&config(Some("true"), None)),
            LaunchMode::Development
        );
        assert_eq!(
            select_mode(&config(Some("true"), Some("production"))),
            LaunchMode::Development
        );
    }

    #[test]
    fn test_node_env_development_is_development() {
        assert_eq!(
            select_mode(&config(None, Some("development"))),
            LaunchMode::Development
        );
        assert_eq!(
            select_mode(&config(Some("false"), Some("development"))),
            LaunchMode::Development
        );
    }

    #[test]
    fn test_comparison_is_exact() {
        assert_eq!(select_mode(&config(Some("True"), None)), LaunchMode::Production);
        assert_eq!(select_mode(&config(Some("1"), None)), LaunchMode::Production);
        assert_eq!(select_mode(&config(None, Some("dev"))), LaunchMode::Production);
        assert_eq!(select_mode(&config(Some(""), Some(""))), LaunchMode::Production);
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(LaunchMode::Development.to_string(), "development");
        assert_eq!("production".parse::<LaunchMode>(), Ok(LaunchMode::Production));
    }
}
