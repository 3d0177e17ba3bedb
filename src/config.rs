use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default model used for both pipeline stages when no override is provided.
pub const DEFAULT_MODEL_NAME: &str = "gemini-2.5-flash";
/// Default base URL of the Gemini REST API.
pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
/// Origin allowed by CORS when `ALLOWED_ORIGINS` is not set.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the CouncellorX server.
///
/// Built once at startup and shared read-only (usually behind an `Arc`).
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential sent to the model provider with every call.
    pub api_key: String,
    /// Model identifier used for the document extraction call.
    pub extraction_model: String,
    /// Model identifier used for the schema-constrained structuring call.
    pub structuring_model: String,
    /// Origins permitted to call the HTTP API from a browser.
    pub allowed_origins: Vec<String>,
    /// Base URL of the Gemini API.
    pub gemini_api_url: String,
    /// Upper bound on a single model call.
    pub model_timeout: Duration,
    /// Directory receiving temporary upload files; `None` uses the OS default.
    pub upload_temp_dir: Option<PathBuf>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Values that are empty or whitespace-only are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = var("GOOGLE_API_KEY")
            .or_else(|| var("GEMINI_API_KEY"))
            .ok_or_else(|| ConfigError::MissingVariable("GOOGLE_API_KEY".to_string()))?;

        Ok(Self {
            api_key,
            extraction_model: var("EXTRACTION_MODEL_NAME")
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            structuring_model: var("STRUCTURING_MODEL_NAME")
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|value| parse_origins(&value))
                .filter(|origins| !origins.is_empty())
                .unwrap_or_else(|| vec![DEFAULT_ALLOWED_ORIGIN.to_string()]),
            gemini_api_url: var("GEMINI_API_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string()),
            model_timeout: Duration::from_secs(
                parse_optional(var("MODEL_TIMEOUT_SECS"), "MODEL_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_MODEL_TIMEOUT_SECS),
            ),
            upload_temp_dir: var("UPLOAD_TEMP_DIR").map(PathBuf::from),
            server_port: parse_optional(var("SERVER_PORT"), "SERVER_PORT")?,
        })
    }

    /// Directory in which upload temp files are created.
    pub fn temp_dir(&self) -> PathBuf {
        self.upload_temp_dir.clone().unwrap_or_else(env::temp_dir)
    }
}

fn parse_optional<T: FromStr>(value: Option<String>, key: &str) -> Result<Option<T>, ConfigError> {
    value
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Split a comma-separated origin list, dropping blank entries.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load `.env` (when present) and build the configuration.
pub fn init_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        extraction_model = %config.extraction_model,
        structuring_model = %config.structuring_model,
        allowed_origins = ?config.allowed_origins,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn missing_api_key_is_reported() {
        let error = load(&[("EXTRACTION_MODEL_NAME", "m")]).expect_err("missing key");
        assert!(matches!(error, ConfigError::MissingVariable(key) if key == "GOOGLE_API_KEY"));
    }

    #[test]
    fn only_api_key_set_uses_defaults() {
        let config = load(&[("GOOGLE_API_KEY", "google-key")]).expect("config");

        assert_eq!(config.api_key, "google-key");
        assert_eq!(config.extraction_model, DEFAULT_MODEL_NAME);
        assert_eq!(config.structuring_model, DEFAULT_MODEL_NAME);
        assert_eq!(config.allowed_origins, vec![DEFAULT_ALLOWED_ORIGIN]);
        assert_eq!(config.gemini_api_url, DEFAULT_GEMINI_API_URL);
        assert_eq!(
            config.model_timeout,
            Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS)
        );
        assert_eq!(config.upload_temp_dir, None);
        assert_eq!(config.server_port, None);
    }

    #[test]
    fn gemini_api_key_is_accepted_as_fallback() {
        let config = load(&[("GEMINI_API_KEY", "gemini-key")]).expect("config");
        assert_eq!(config.api_key, "gemini-key");

        let config = load(&[("GOOGLE_API_KEY", "google-key"), ("GEMINI_API_KEY", "gemini-key")])
            .expect("config");
        assert_eq!(config.api_key, "google-key");
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let config = load(&[
            ("GOOGLE_API_KEY", "   "),
            ("GEMINI_API_KEY", "gemini-key"),
            ("EXTRACTION_MODEL_NAME", ""),
            ("STRUCTURING_MODEL_NAME", " \t"),
            ("ALLOWED_ORIGINS", " , "),
            ("MODEL_TIMEOUT_SECS", " "),
            ("SERVER_PORT", ""),
        ])
        .expect("config");

        assert_eq!(config.api_key, "gemini-key");
        assert_eq!(config.extraction_model, DEFAULT_MODEL_NAME);
        assert_eq!(config.structuring_model, DEFAULT_MODEL_NAME);
        assert_eq!(config.allowed_origins, vec![DEFAULT_ALLOWED_ORIGIN]);
        assert_eq!(
            config.model_timeout,
            Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS)
        );
        assert_eq!(config.server_port, None);
    }

    #[test]
    fn blank_api_keys_everywhere_are_missing() {
        let error = load(&[("GOOGLE_API_KEY", " "), ("GEMINI_API_KEY", "")])
            .expect_err("missing key");
        assert!(matches!(error, ConfigError::MissingVariable(_)));
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("GOOGLE_API_KEY", "key"),
            ("EXTRACTION_MODEL_NAME", "vision-model"),
            ("STRUCTURING_MODEL_NAME", "text-model"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("GEMINI_API_URL", "http://127.0.0.1:9999"),
            ("MODEL_TIMEOUT_SECS", "30"),
            ("UPLOAD_TEMP_DIR", "/var/tmp/uploads"),
            ("SERVER_PORT", "8080"),
        ])
        .expect("config");

        assert_eq!(config.extraction_model, "vision-model");
        assert_eq!(config.structuring_model, "text-model");
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.gemini_api_url, "http://127.0.0.1:9999");
        assert_eq!(config.model_timeout, Duration::from_secs(30));
        assert_eq!(config.temp_dir(), PathBuf::from("/var/tmp/uploads"));
        assert_eq!(config.server_port, Some(8080));
    }

    #[test]
    fn invalid_numbers_are_rejected_by_name() {
        let error = load(&[("GOOGLE_API_KEY", "key"), ("MODEL_TIMEOUT_SECS", "soon")])
            .expect_err("bad timeout");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "MODEL_TIMEOUT_SECS"));

        for port in ["http", "70000", "-1"] {
            let error = load(&[("GOOGLE_API_KEY", "key"), ("SERVER_PORT", port)])
                .expect_err("bad port");
            assert!(
                matches!(&error, ConfigError::InvalidValue(key) if key == "SERVER_PORT"),
                "{port}: {error}"
            );
        }
    }

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        let origins = parse_origins(" https://a.example , ,https://b.example,");
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn temp_dir_falls_back_to_os_default() {
        let config = Config {
            api_key: "key".into(),
            extraction_model: DEFAULT_MODEL_NAME.into(),
            structuring_model: DEFAULT_MODEL_NAME.into(),
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.into()],
            gemini_api_url: DEFAULT_GEMINI_API_URL.into(),
            model_timeout: Duration::from_secs(1),
            upload_temp_dir: None,
            server_port: None,
        };
        assert_eq!(config.temp_dir(), env::temp_dir());
    }
}
