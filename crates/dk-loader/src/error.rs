use thiserror::Error;

/// Why a tool module could not be resolved or instantiated.
///
/// Cloneable so one failed in-flight import can be reported to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("Tool not registered: {0}")]
    NotRegistered(String),

    #[error("Failed to import module for {id}: {reason}")]
    ImportFailed { id: String, reason: String },

    #[error("Module for {id} does not export {export}")]
    MissingExport { id: String, export: String },

    #[error("Failed to construct {id}: {reason}")]
    Construct { id: String, reason: String },
}

impl LoaderError {
    /// Id of the tool the error concerns
    pub fn tool_id(&self) -> &str {
        match self {
            LoaderError::NotRegistered(id) => id,
            LoaderError::ImportFailed { id, .. }
            | LoaderError::MissingExport { id, .. }
            | LoaderError::Construct { id, .. } => id,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;
