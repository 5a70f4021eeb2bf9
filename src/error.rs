//! Error taxonomy for costing, history and export

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CostError {
    #[error("invalid produced quantity: {0}")]
    InvalidQuantity(String),

    #[error("no product selected")]
    NoProductSelected,

    #[error("failed to fetch {endpoint}: {message}")]
    FetchFailure { endpoint: String, message: String },

    #[error("stored history is corrupt: {0}")]
    StorageCorrupt(String),

    #[error("nothing to export, calculate a cost first")]
    NothingToExport,

    #[error("nothing to save, calculate a cost first")]
    NothingToSave,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("export error: {0}")]
    Export(String),
}

impl CostError {
    pub fn fetch(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::FetchFailure {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Validation errors block the action and ask the user to correct input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuantity(_)
                | Self::NoProductSelected
                | Self::NothingToExport
                | Self::NothingToSave
        )
    }
}

impl From<rust_xlsxwriter::XlsxError> for CostError {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CostError>;
