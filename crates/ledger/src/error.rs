use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Stale version stamp writing {entity} {key}")]
    VersionConflict { entity: &'static str, key: String },

    #[error("{entity} not found in the ledger: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{entity} already exists in the ledger: {key}")]
    AlreadyExists { entity: &'static str, key: String },
}

impl LedgerError {
    pub(crate) fn conflict(entity: &'static str, key: impl ToString) -> Self {
        LedgerError::VersionConflict {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}
