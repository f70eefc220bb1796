//! Server configuration from environment variables.
//!
//! Every variable is optional. A `.env` file in the working directory is
//! loaded by `main` before [`Settings::from_env`] runs.

use std::path::PathBuf;
use std::str::FromStr;

use axum::http::HeaderValue;
use story_core::SamplingConfig;
use tracing::info;

use crate::error::ConfigError;

/// Which origins may call the API from a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    /// `CORS_ORIGINS` unset or `*`.
    Any,
    /// Explicit comma-separated list.
    List(Vec<String>),
}

impl CorsOrigins {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == "*" {
            return CorsOrigins::Any;
        }
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
        if origins.is_empty() {
            CorsOrigins::Any
        } else {
            CorsOrigins::List(origins)
        }
    }
}

/// State of the provider credential, as reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Connected,
    NotConfigured,
    Error,
}

impl CredentialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialStatus::Connected => "connected",
            CredentialStatus::NotConfigured => "not_configured",
            CredentialStatus::Error => "error",
        }
    }
}

/// Application settings.
#[derive(Clone, PartialEq)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_max_tokens: u32,
    pub openai_temperature: f32,
    pub openai_base_url: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: CorsOrigins,
    pub prompts_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: openai::DEFAULT_MODEL.to_string(),
            openai_max_tokens: 2000,
            openai_temperature: 0.8,
            openai_base_url: openai::DEFAULT_BASE_URL.to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: CorsOrigins::Any,
            prompts_file: PathBuf::from("prompts.yaml"),
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let settings = Self {
            openai_api_key: lookup("OPENAI_API_KEY").map(|key| key.trim().to_string()),
            openai_model: lookup("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_max_tokens: parse_var(&lookup, "OPENAI_MAX_TOKENS", defaults.openai_max_tokens)?,
            openai_temperature: parse_var(
                &lookup,
                "OPENAI_TEMPERATURE",
                defaults.openai_temperature,
            )?,
            openai_base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            cors_origins: lookup("CORS_ORIGINS")
                .map(|raw| CorsOrigins::parse(&raw))
                .unwrap_or(defaults.cors_origins),
            prompts_file: lookup("PROMPTS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.prompts_file),
        };

        info!(
            model = %settings.openai_model,
            api_key_configured = settings.credential_status() == CredentialStatus::Connected,
            cors = ?settings.cors_origins,
            prompts_file = %settings.prompts_file.display(),
            "Configuration loaded"
        );
        Ok(settings)
    }

    /// Whether the credential is present and usable, without contacting the provider.
    pub fn credential_status(&self) -> CredentialStatus {
        match self.openai_api_key.as_deref().map(str::trim) {
            None | Some("") => CredentialStatus::NotConfigured,
            Some(key) if HeaderValue::from_str(&format!("Bearer {key}")).is_ok() => CredentialStatus::Connected,
            Some(_) => CredentialStatus::Error,
        }
    }

    pub fn sampling(&self) -> SamplingConfig {
        SamplingConfig {
            model: self.openai_model.clone(),
            max_tokens: self.openai_max_tokens,
            temperature: self.openai_temperature,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_model", &self.openai_model)
            .field("openai_max_tokens", &self.openai_max_tokens)
            .field("openai_temperature", &self.openai_temperature)
            .field("openai_base_url", &self.openai_base_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_origins", &self.cors_origins)
            .field("prompts_file", &self.prompts_file)
            .finish()
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw,
        }),
    }
}
