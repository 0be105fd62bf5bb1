use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, ensure};
use pb_core::eval::{condition_category, DatasetName, SplitName};

use crate::config::{AppConfig, SinkKindConfig};
use crate::dataset::RowsQuery;

// ---------------------------------------------------------------------------
// SinkSelection — validated sink choice
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkSelection {
    LocalCsv {
        path: PathBuf,
    },
    Sheets {
        api_base: String,
        spreadsheet_id: String,
        sheet_name: String,
        credential: String,
    },
}

// ---------------------------------------------------------------------------
// RuntimeConfig — fully validated runtime configuration
// ---------------------------------------------------------------------------

pub struct RuntimeConfig {
    pub listen_addr: String,
    pub dataset_api_base: String,
    pub dataset_name: DatasetName,
    pub split: SplitName,
    pub templates_query: RowsQuery,
    pub images_query: RowsQuery,
    pub target_count: usize,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    pub sink: SinkSelection,
    pub log_level: String,
    pub log_format: String,
}

// ---------------------------------------------------------------------------
// into_runtime — converts raw AppConfig into validated RuntimeConfig
// ---------------------------------------------------------------------------

pub fn into_runtime(config: AppConfig) -> Result<RuntimeConfig, anyhow::Error> {
    ensure!(!config.server.listen.is_empty(), "server listen address required");
    ensure!(!config.dataset.api_base.is_empty(), "dataset api_base required");
    ensure!(!config.dataset.repo.is_empty(), "dataset repo required");
    ensure!(
        !config.dataset.templates_config.is_empty(),
        "dataset templates_config required"
    );
    ensure!(
        !config.dataset.templates_split.is_empty(),
        "dataset templates_split required"
    );
    ensure!(
        !config.dataset.images_config.is_empty(),
        "dataset images_config required"
    );
    ensure!(!config.dataset.split.is_empty(), "dataset split required");
    ensure!(config.dataset.row_limit > 0, "dataset row_limit must be positive");
    ensure!(
        config.sampling.target_count > 0,
        "sampling target_count must be positive"
    );
    ensure!(config.session.ttl_secs > 0, "session ttl_secs must be positive");
    ensure!(
        config.session.sweep_interval_secs > 0,
        "session sweep_interval_secs must be positive"
    );

    let split = SplitName::new(&config.dataset.split);
    // Fail at startup, not on the first session, when the split has no
    // condition category.
    condition_category(&split)?;

    let sink = match config.sink.kind {
        SinkKindConfig::LocalCsv => {
            ensure!(!config.sink.csv_path.is_empty(), "sink csv_path required");
            SinkSelection::LocalCsv {
                path: PathBuf::from(config.sink.csv_path),
            }
        }
        SinkKindConfig::Sheets => {
            ensure!(
                !config.sink.sheets_api_base.is_empty(),
                "sink sheets_api_base required"
            );
            ensure!(!config.sink.sheet_name.is_empty(), "sink sheet_name required");
            let Some(spreadsheet_id) = config
                .sink
                .spreadsheet_id
                .filter(|id| !id.is_empty())
            else {
                bail!("sink spreadsheet_id required for the sheets sink");
            };
            let Some(credential) = config.sink.credential.filter(|c| !c.is_empty()) else {
                bail!("sink credential required for the sheets sink");
            };
            SinkSelection::Sheets {
                api_base: config.sink.sheets_api_base,
                spreadsheet_id,
                sheet_name: config.sink.sheet_name,
                credential,
            }
        }
    };

    let templates_query = RowsQuery {
        dataset: config.dataset.repo.clone(),
        config: config.dataset.templates_config,
        split: config.dataset.templates_split,
        length: config.dataset.row_limit,
    };
    let images_query = RowsQuery {
        dataset: config.dataset.repo.clone(),
        config: config.dataset.images_config.clone(),
        split: config.dataset.split.clone(),
        length: config.dataset.row_limit,
    };

    Ok(RuntimeConfig {
        listen_addr: config.server.listen,
        dataset_api_base: config.dataset.api_base,
        dataset_name: DatasetName::new(config.dataset.images_config.clone()),
        split,
        templates_query,
        images_query,
        target_count: config.sampling.target_count,
        session_ttl: Duration::from_secs(config.session.ttl_secs),
        sweep_interval: Duration::from_secs(config.session.sweep_interval_secs),
        sink,
        log_level: config.logging.level,
        log_format: config.logging.format,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SinkConfig;

    fn make_config() -> AppConfig {
        AppConfig::default()
    }

    fn make_sheets_sink() -> SinkConfig {
        SinkConfig {
            kind: SinkKindConfig::Sheets,
            spreadsheet_id: Some("sheet-abc".to_owned()),
            credential: Some("token-xyz".to_owned()),
            ..SinkConfig::default()
        }
    }

    #[test]
    fn test_valid_config_conversion() {
        let runtime = into_runtime(make_config()).expect("valid config should convert");

        assert_eq!(runtime.listen_addr, "0.0.0.0:8080");
        assert_eq!(runtime.dataset_name.as_str(), "in100");
        assert_eq!(runtime.split.as_str(), "colorjitter");
        assert_eq!(runtime.templates_query.config, "templates");
        assert_eq!(runtime.templates_query.split, "in100");
        assert_eq!(runtime.images_query.config, "in100");
        assert_eq!(runtime.images_query.split, "colorjitter");
        assert_eq!(runtime.images_query.length, 100);
        assert_eq!(runtime.target_count, 10);
        assert_eq!(runtime.session_ttl, Duration::from_secs(7200));
        assert_eq!(runtime.sweep_interval, Duration::from_secs(300));
        assert_eq!(
            runtime.sink,
            SinkSelection::LocalCsv {
                path: PathBuf::from("responses/user_responses.csv")
            }
        );
    }

    #[test]
    fn test_sheets_sink_conversion() {
        let mut config = make_config();
        config.sink = make_sheets_sink();

        let runtime = into_runtime(config).expect("sheets config should convert");
        match runtime.sink {
            SinkSelection::Sheets {
                spreadsheet_id,
                sheet_name,
                credential,
                ..
            } => {
                assert_eq!(spreadsheet_id, "sheet-abc");
                assert_eq!(sheet_name, "responses");
                assert_eq!(credential, "token-xyz");
            }
            other => panic!("expected sheets sink, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_repo_rejected() {
        let mut config = make_config();
        config.dataset.repo.clear();

        match into_runtime(config) {
            Err(e) => assert!(e.to_string().contains("dataset repo required")),
            Ok(_) => panic!("expected error for empty repo"),
        }
    }

    #[test]
    fn test_zero_target_count_rejected() {
        let mut config = make_config();
        config.sampling.target_count = 0;

        match into_runtime(config) {
            Err(e) => assert!(e.to_string().contains("target_count must be positive")),
            Ok(_) => panic!("expected error for zero target_count"),
        }
    }

    #[test]
    fn test_unknown_split_rejected() {
        let mut config = make_config();
        config.dataset.split = "blur".to_owned();

        match into_runtime(config) {
            Err(e) => assert!(e.to_string().contains("no condition category")),
            Ok(_) => panic!("expected error for unknown split"),
        }
    }

    #[test]
    fn test_sheets_without_spreadsheet_id_rejected() {
        let mut config = make_config();
        config.sink = make_sheets_sink();
        config.sink.spreadsheet_id = None;

        match into_runtime(config) {
            Err(e) => assert!(e.to_string().contains("spreadsheet_id required")),
            Ok(_) => panic!("expected error for missing spreadsheet_id"),
        }
    }

    #[test]
    fn test_sheets_without_credential_rejected() {
        let mut config = make_config();
        config.sink = make_sheets_sink();
        config.sink.credential = Some(String::new());

        match into_runtime(config) {
            Err(e) => assert!(e.to_string().contains("credential required")),
            Ok(_) => panic!("expected error for missing credential"),
        }
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = make_config();
        config.session.ttl_secs = 0;

        match into_runtime(config) {
            Err(e) => assert!(e.to_string().contains("ttl_secs must be positive")),
            Ok(_) => panic!("expected error for zero ttl"),
        }
    }
}
