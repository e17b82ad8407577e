use thiserror::Error;

#[derive(Error, Debug)]
pub enum LojaError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown member: {0}")]
    UnknownMember(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown equipment: {0}")]
    UnknownEquipment(String),

    #[error("Invalid status change: {0}")]
    InvalidTransition(String),

    #[error("Invalid value: {0}")]
    Validation(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LojaError>;
