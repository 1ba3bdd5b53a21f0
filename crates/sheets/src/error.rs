use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot reach workbook at {location}: {reason}")]
    Connection { location: String, reason: String },
    #[error("worksheet not found: {0}")]
    SheetNotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("sheets api returned status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("failed to decode worksheet: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
