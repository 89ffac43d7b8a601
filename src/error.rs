use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EnrichError {
    #[error("failed to read input spreadsheet at {path}: {message}")]
    #[diagnostic(help("check that the file exists and is a csv, xlsx, xls, xlsb or ods file"))]
    InputRead { path: Utf8PathBuf, message: String },

    #[error("column {column:?} not found in input {path}")]
    MissingColumn { path: Utf8PathBuf, column: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("lookup request failed: {0}")]
    LookupHttp(String),

    #[error("lookup response is not valid JSON: {0}")]
    LookupDecode(String),

    #[error("store error: {0}")]
    Persistence(String),

    #[error("no stored record for {0}")]
    RecordNotFound(String),
}

impl From<rusqlite::Error> for EnrichError {
    fn from(err: rusqlite::Error) -> Self {
        EnrichError::Persistence(err.to_string())
    }
}
