//! TOML-based configuration for hqlc.
//!
//! Supports a config file (hqlc.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [query]
//! dialect = "postgres"
//! literal_rendering = "as_param_outside_select"
//! max_fetch_depth = 3
//! format_sql = false
//! quote_identifiers = false
//! plan_cache_size = 256
//! metamodel = "${APP_HOME}/metamodel.toml"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_PLAN_CACHE_SIZE;
use crate::compile::CompileOptions;
use crate::convert::{LiteralRendering, DEFAULT_MAX_FETCH_DEPTH};
use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unterminated variable reference in '{0}'")]
    UnterminatedVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Query compilation settings.
    pub query: QuerySettings,
}

/// The `[query]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Target SQL dialect.
    pub dialect: Dialect,

    /// Literal policy; the dialect default applies when absent.
    pub literal_rendering: Option<LiteralRendering>,

    /// Bound on eager fetch nesting. `0` disables metamodel-driven fetches.
    pub max_fetch_depth: usize,

    /// Pretty-print rendered SQL.
    pub format_sql: bool,

    /// Quote every table and column identifier.
    pub quote_identifiers: bool,

    /// Compiled plans kept per compiler. `0` disables the cache.
    pub plan_cache_size: usize,

    /// Metamodel definition file (supports ${ENV_VAR} expansion).
    pub metamodel: Option<String>,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            literal_rendering: None,
            max_fetch_depth: DEFAULT_MAX_FETCH_DEPTH,
            format_sql: false,
            quote_identifiers: false,
            plan_cache_size: DEFAULT_PLAN_CACHE_SIZE,
            metamodel: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `HQLC_CONFIG`
    /// 2. `./hqlc.toml`
    /// 3. `~/.config/hqlc/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("HQLC_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("hqlc.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("hqlc").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    pub fn compile_options(&self) -> CompileOptions {
        let query = &self.query;
        let mut options = CompileOptions::default()
            .with_dialect(query.dialect)
            .with_max_fetch_depth(query.max_fetch_depth)
            .with_format_sql(query.format_sql)
            .with_quoted_identifiers(query.quote_identifiers)
            .with_plan_cache_size(query.plan_cache_size);
        if let Some(literal_rendering) = query.literal_rendering {
            options = options.with_literal_rendering(literal_rendering);
        }
        options
    }

    /// The configured metamodel path with environment variables expanded.
    pub fn metamodel_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.query
            .metamodel
            .as_deref()
            .map(|raw| expand_env_vars(raw).map(PathBuf::from))
            .transpose()
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A `$` not followed by a name is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name = if chars.next_if_eq(&'{').is_some() {
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(ch) => name.push(ch),
                    None => return Err(SettingsError::UnterminatedVar(s.to_string())),
                }
            }
            name
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                result.push('$');
                continue;
            }
            name
        };

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_braces() {
        env::set_var("HQLC_TEST_VAR", "hello");
        assert_eq!(expand_env_vars("${HQLC_TEST_VAR}").unwrap(), "hello");
        assert_eq!(
            expand_env_vars("prefix_${HQLC_TEST_VAR}_suffix").unwrap(),
            "prefix_hello_suffix"
        );
        env::remove_var("HQLC_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        env::set_var("HQLC_TEST_VAR2", "world");
        assert_eq!(expand_env_vars("$HQLC_TEST_VAR2").unwrap(), "world");
        assert_eq!(expand_env_vars("$HQLC_TEST_VAR2!").unwrap(), "world!");
        assert_eq!(expand_env_vars("cost: $ 5").unwrap(), "cost: $ 5");
        env::remove_var("HQLC_TEST_VAR2");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        assert!(matches!(
            expand_env_vars("${NONEXISTENT_VAR_12345}"),
            Err(SettingsError::MissingEnvVar(name)) if name == "NONEXISTENT_VAR_12345"
        ));
        assert!(matches!(
            expand_env_vars("${UNCLOSED"),
            Err(SettingsError::UnterminatedVar(_))
        ));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[query]
dialect = "tsql"
literal_rendering = "as_literal"
max_fetch_depth = 1
format_sql = true
plan_cache_size = 16
metamodel = "model.toml"
"#;

        let settings = Settings::from_toml(toml).unwrap();
        assert_eq!(settings.query.dialect, Dialect::TSql);
        assert_eq!(
            settings.query.literal_rendering,
            Some(LiteralRendering::AsLiteral)
        );
        assert!(settings.query.format_sql);
        assert!(!settings.query.quote_identifiers);
        assert_eq!(
            settings.metamodel_path().unwrap(),
            Some(PathBuf::from("model.toml"))
        );

        let options = settings.compile_options();
        assert_eq!(options.dialect, Dialect::TSql);
        assert_eq!(options.literal_rendering, Some(LiteralRendering::AsLiteral));
        assert_eq!(options.max_fetch_depth, 1);
        assert_eq!(options.plan_cache_size, 16);
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.query.dialect, Dialect::Ansi);
        assert_eq!(settings.query.max_fetch_depth, DEFAULT_MAX_FETCH_DEPTH);
        assert_eq!(settings.query.plan_cache_size, DEFAULT_PLAN_CACHE_SIZE);
        assert_eq!(settings.metamodel_path().unwrap(), None);
    }

    #[test]
    fn test_unknown_dialect_is_a_parse_error() {
        let result = Settings::from_toml("[query]\ndialect = \"oracle\"\n");
        assert!(matches!(result, Err(SettingsError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Settings::from_file("/nonexistent/hqlc.toml"),
            Err(SettingsError::FileNotFound(_))
        ));
    }
}
