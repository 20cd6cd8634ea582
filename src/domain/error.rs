//! Domain error types.

/// Top-level error type for sigtest.
#[derive(Debug, thiserror::Error)]
pub enum SigtestError {
    #[error("invalid parameter {parameter}: {reason}")]
    Configuration { parameter: String, reason: String },

    #[error("input contract violated: {reason}")]
    InputContract { reason: String },

    #[error("data quality error: {reason}")]
    DataQuality { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SigtestError {
    pub fn configuration(parameter: &str, reason: impl Into<String>) -> Self {
        SigtestError::Configuration {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    pub fn input_contract(reason: impl Into<String>) -> Self {
        SigtestError::InputContract {
            reason: reason.into(),
        }
    }

    pub fn data_quality(reason: impl Into<String>) -> Self {
        SigtestError::DataQuality {
            reason: reason.into(),
        }
    }
}

impl From<&SigtestError> for std::process::ExitCode {
    fn from(err: &SigtestError) -> Self {
        let code: u8 = match err {
            SigtestError::Io(_) | SigtestError::Json(_) => 1,
            SigtestError::Configuration { .. }
            | SigtestError::ConfigParse { .. }
            | SigtestError::ConfigMissing { .. }
            | SigtestError::ConfigInvalid { .. } => 2,
            SigtestError::InputContract { .. } => 3,
            SigtestError::DataQuality { .. } => 4,
            SigtestError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
