use std::path::{Path, PathBuf};

use serde::Deserialize;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "cardscan.json";

/// Optional settings read from `cardscan.json`. Every key may be omitted.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub(crate) struct FileConfig {
    pub(crate) model: Option<String>,
    pub(crate) base_url: Option<String>,
    pub(crate) timeout_secs: Option<u64>,
    pub(crate) temperature: Option<f64>,
    pub(crate) max_output_tokens: Option<u32>,
    pub(crate) input_dir: Option<PathBuf>,
    pub(crate) examples_dir: Option<PathBuf>,
    pub(crate) max_retries: Option<u32>,
    pub(crate) pacing_ms: Option<u64>,
}

pub(crate) fn config_file_path(cli: Option<&Path>) -> PathBuf {
    cli.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub(crate) fn load_file_config(path: &Path) -> FileConfig {
    match std::fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unparsable config file");
            FileConfig::default()
        }),
        Err(_) => FileConfig::default(),
    }
}
