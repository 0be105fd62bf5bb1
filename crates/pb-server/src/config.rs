use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub api_base: String,
    pub repo: String,
    pub templates_config: String,
    pub templates_split: String,
    pub images_config: String,
    pub split: String,
    pub row_limit: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            api_base: "https://datasets-server.huggingface.co".to_owned(),
            repo: "feiziaarash/mmscore".to_owned(),
            templates_config: "templates".to_owned(),
            templates_split: "in100".to_owned(),
            images_config: "in100".to_owned(),
            split: "colorjitter".to_owned(),
            row_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub target_count: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { target_count: 10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 7200,
            sweep_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKindConfig,
    pub csv_path: String,
    pub sheets_api_base: String,
    pub spreadsheet_id: Option<String>,
    pub sheet_name: String,
    pub credential: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKindConfig::default(),
            csv_path: "responses/user_responses.csv".to_owned(),
            sheets_api_base: "https://sheets.googleapis.com".to_owned(),
            spreadsheet_id: None,
            sheet_name: "responses".to_owned(),
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SinkKindConfig {
    #[default]
    LocalCsv,
    Sheets,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "json".to_owned(),
        }
    }
}
