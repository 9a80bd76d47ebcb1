use std::env;

use crate::errors::ShimError;

/// Connection string used when `DATABASE_URL` is not set. Development only.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///./test.db";

/// Target of the backend proxy when `BACKEND_URL` is not set.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub debug: bool,
    pub api_base_path: String,
    pub backend_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ShimError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup so callers (and
    /// tests) never have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ShimError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = lookup("DEBUG").is_some_and(|raw| debug_enabled(&raw));

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            debug,
            api_base_path: lookup("API_BASE_PATH").unwrap_or_else(|| "/".to_string()),
            backend_url: lookup("BACKEND_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
        })
    }

    #[must_use]
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self
                .database_url
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            echo: self.debug,
        }
    }
}

/// Everything the engine needs; constructed once and handed to `Database::connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub echo: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            echo: false,
        }
    }
}

#[must_use]
pub fn parse_bool_like(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Reads a `DEBUG` value. Recognized boolean spellings map as expected; any
/// other non-empty value turns debugging on.
#[must_use]
pub fn debug_enabled(raw: &str) -> bool {
    parse_bool_like(raw).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_like_values() {
        assert_eq!(parse_bool_like("TRUE"), Some(true));
        assert_eq!(parse_bool_like(" on "), Some(true));
        assert_eq!(parse_bool_like(""), Some(false));
        assert_eq!(parse_bool_like("off"), Some(false));
        assert_eq!(parse_bool_like("maybe"), None);
    }

    #[test]
    fn debug_values() {
        assert!(debug_enabled("1"));
        assert!(debug_enabled("verbose"));
        assert!(!debug_enabled("false"));
        assert!(!debug_enabled("  "));
    }
}
