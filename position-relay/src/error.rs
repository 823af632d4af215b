use thiserror::Error;

/// A raw payload that could not be turned into a `DecodedMessage`.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("received empty payload")]
    Empty,
    #[error("payload is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A well-formed position update missing a field, or carrying one of the wrong type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field `{field}` is unusable, found {found}")]
pub struct FieldExtractionError {
    pub field: &'static str,
    pub found: String,
}

impl FieldExtractionError {
    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            found: "nothing".to_owned(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("field `{field}` is not a finite number")]
    NonFinite { field: &'static str },
    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("datagram truncated: sent {sent} of {len} bytes")]
    Truncated { sent: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("consume failed: {0}")]
    Consume(String),
}

/// Everything that can abort the processing of a single event.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("field extraction failed: {0}")]
    Extract(#[from] FieldExtractionError),
    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),
}

impl PipelineError {
    /// Name of the pipeline stage that failed, for logs and metric labels.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Decode(_) => "decode",
            PipelineError::Extract(_) => "transform",
            PipelineError::Encode(_) => "encode",
        }
    }
}
