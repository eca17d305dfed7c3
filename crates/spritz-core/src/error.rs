use thiserror::Error;

pub type SpritzResult<T> = Result<T, SpritzError>;

#[derive(Debug, Error)]
pub enum SpritzError {
    #[error("truncated input: {0}")]
    TruncatedInput(String),

    #[error("bad password or corrupted file")]
    BadPasswordOrCorrupt,

    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u8),

    #[error("compressed payload is malformed: {0}")]
    CompressionFormat(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpritzError {
    /// Classify a failed fixed-size read: running out of input means the
    /// container is truncated, anything else is the source's own failure.
    pub fn truncated(err: std::io::Error, field: &str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            SpritzError::TruncatedInput(field.to_string())
        } else {
            SpritzError::Io(err)
        }
    }

    /// Classify an error surfaced while reading the compressed body.
    ///
    /// The inflater reports malformed data as `InvalidData`/`InvalidInput`
    /// I/O errors; those become `CompressionFormat`, the rest stay I/O.
    pub fn from_body(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::InvalidInput => {
                SpritzError::CompressionFormat(err.to_string())
            }
            std::io::ErrorKind::UnexpectedEof => {
                SpritzError::TruncatedInput("compressed body".to_string())
            }
            _ => SpritzError::Io(err),
        }
    }
}
