use std::path::PathBuf;
use std::time::Duration;

use crate::{
    parse_setting, require_setting, FileConfig, GeminiSettings, DEFAULT_BASE_URL,
    DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MAX_RETRIES, DEFAULT_MODEL, DEFAULT_PACING,
    DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};

pub(crate) const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub(crate) const DEFAULT_INPUT_DIR: &str = "images";
pub(crate) const DEFAULT_EXAMPLES_DIR: &str = "examples";

/// Values given on the command line; these win over everything else.
#[derive(Debug, Clone, Default)]
pub(crate) struct CliOverrides {
    pub(crate) input_dir: Option<PathBuf>,
    pub(crate) examples_dir: Option<PathBuf>,
    pub(crate) max_retries: Option<u32>,
    pub(crate) pacing_ms: Option<u64>,
    pub(crate) model: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunSettings {
    pub(crate) input_dir: PathBuf,
    pub(crate) examples_dir: PathBuf,
    pub(crate) max_retries: u32,
    pub(crate) pacing: Duration,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
    pub(crate) temperature: f64,
    pub(crate) max_output_tokens: u32,
}

impl RunSettings {
    /// Layer settings: command line, then environment, then config file, then defaults.
    /// `env` looks up one variable, returning `None` when unset or blank.
    pub(crate) fn resolve(
        cli: &CliOverrides,
        file: &FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<RunSettings, Box<dyn std::error::Error>> {
        let env_max_retries = parse_setting::<u32>("CARDSCAN_MAX_RETRIES", env("CARDSCAN_MAX_RETRIES"))?;
        let env_pacing_ms = parse_setting::<u64>("CARDSCAN_PACING_MS", env("CARDSCAN_PACING_MS"))?;
        let env_timeout = parse_setting::<u64>("GEMINI_TIMEOUT", env("GEMINI_TIMEOUT"))?;
        let env_temperature = parse_setting::<f64>("GEMINI_TEMPERATURE", env("GEMINI_TEMPERATURE"))?;
        let env_max_tokens =
            parse_setting::<u32>("GEMINI_MAX_OUTPUT_TOKENS", env("GEMINI_MAX_OUTPUT_TOKENS"))?;

        let pacing_ms = cli
            .pacing_ms
            .or(env_pacing_ms)
            .or(file.pacing_ms)
            .unwrap_or(DEFAULT_PACING.as_millis() as u64);

        Ok(RunSettings {
            input_dir: cli
                .input_dir
                .clone()
                .or_else(|| env("CARDSCAN_INPUT_DIR").map(PathBuf::from))
                .or_else(|| file.input_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR)),
            examples_dir: cli
                .examples_dir
                .clone()
                .or_else(|| env("CARDSCAN_EXAMPLES_DIR").map(PathBuf::from))
                .or_else(|| file.examples_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXAMPLES_DIR)),
            max_retries: cli
                .max_retries
                .or(env_max_retries)
                .or(file.max_retries)
                .unwrap_or(DEFAULT_MAX_RETRIES),
            pacing: Duration::from_millis(pacing_ms),
            model: cli
                .model
                .clone()
                .or_else(|| env("GEMINI_MODEL"))
                .or_else(|| file.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: env("GEMINI_BASE_URL")
                .or_else(|| file.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(
                env_timeout
                    .or(file.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            temperature: env_temperature
                .or(file.temperature)
                .unwrap_or(DEFAULT_TEMPERATURE),
            max_output_tokens: env_max_tokens
                .or(file.max_output_tokens)
                .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
        })
    }

    pub(crate) fn gemini_settings(&self, api_key: String) -> GeminiSettings {
        GeminiSettings {
            api_key,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

/// The API key is the one setting with no default; a missing key is fatal.
pub(crate) fn require_api_key(
    env: impl Fn(&str) -> Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    require_setting(API_KEY_VAR, env(API_KEY_VAR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings =
            RunSettings::resolve(&CliOverrides::default(), &FileConfig::default(), env_from(&[])).unwrap();
        assert_eq!(settings.input_dir, PathBuf::from("images"));
        assert_eq!(settings.examples_dir, PathBuf::from("examples"));
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.pacing, Duration::from_secs(1));
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let file = FileConfig {
            max_retries: Some(1),
            model: Some("file-model".to_string()),
            input_dir: Some(PathBuf::from("file-images")),
            pacing_ms: Some(250),
            ..FileConfig::default()
        };
        let env = env_from(&[("CARDSCAN_MAX_RETRIES", "2"), ("GEMINI_MODEL", "env-model")]);
        let cli = CliOverrides {
            max_retries: Some(7),
            ..CliOverrides::default()
        };
        let settings = RunSettings::resolve(&cli, &file, env).unwrap();
        assert_eq!(settings.max_retries, 7);
        assert_eq!(settings.model, "env-model");
        assert_eq!(settings.input_dir, PathBuf::from("file-images"));
        assert_eq!(settings.pacing, Duration::from_millis(250));
    }

    #[test]
    fn invalid_env_number_is_an_error() {
        let err = RunSettings::resolve(
            &CliOverrides::default(),
            &FileConfig::default(),
            env_from(&[("CARDSCAN_PACING_MS", "soon")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("CARDSCAN_PACING_MS"));
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = require_api_key(env_from(&[])).unwrap_err();
        assert_eq!(err.to_string(), "Missing GEMINI_API_KEY");
    }

    #[test]
    fn blank_api_key_is_an_error() {
        let err = require_api_key(env_from(&[("GEMINI_API_KEY", "   ")])).unwrap_err();
        assert_eq!(err.to_string(), "Missing GEMINI_API_KEY");
    }

    #[test]
    fn api_key_is_read_from_its_variable() {
        let key = require_api_key(env_from(&[("GEMINI_API_KEY", "abc123")])).unwrap();
        assert_eq!(key, "abc123");
    }

    #[test]
    fn gemini_settings_carry_key_and_model() {
        let settings = RunSettings::resolve(
            &CliOverrides {
                model: Some("gemini-pro-vision".to_string()),
                ..CliOverrides::default()
            },
            &FileConfig::default(),
            env_from(&[("GEMINI_TEMPERATURE", "0.4")]),
        )
        .unwrap();
        let gemini = settings.gemini_settings("secret".to_string());
        assert_eq!(gemini.api_key, "secret");
        assert_eq!(gemini.model, "gemini-pro-vision");
        assert!((gemini.temperature - 0.4).abs() < f64::EPSILON);
    }
}
