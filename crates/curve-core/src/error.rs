use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Archive entry not found: {0}")]
    EntryNotFound(String),
    #[error("Failed to read archive entry '{path}': {source}")]
    Archive {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Document has no drawing data")]
    MissingDrawingData,
    #[error("Document lists no artboard paths")]
    NoArtboards,
    #[error("Artboard entry '{0}' contains no artboard")]
    MissingArtboard(String),
    #[error("Malformed {what}: {source}")]
    Malformed {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Missing field '{0}'")]
    MissingField(String),
    #[error("Field '{field}' is not {expected}")]
    UnexpectedType {
        field: String,
        expected: &'static str,
    },
    #[error("Index {index} out of range for '{array}' (length {len})")]
    IndexOutOfRange {
        array: String,
        index: i64,
        len: usize,
    },
    #[error("{element}: crop rectangle must have exactly two points, found {found}")]
    InvalidCropRect { element: String, found: usize },
    #[error("Invalid color: no rgba, hsba or legacy hsb components")]
    InvalidColor,
    #[error("Group nesting exceeds {0} levels")]
    GroupDepthExceeded(usize),
    #[error("Group '{0}' contains itself")]
    GroupCycle(String),
    #[error("Invalid keyed archive: {0}")]
    KeyedArchive(String),
    #[error("Keyed archive nesting exceeds {0} levels")]
    UnarchiveDepthExceeded(usize),
    #[error("Keyed archive expands past {0} values")]
    UnarchiveNodesExceeded(usize),
    #[error("Keyed archive object {0} references itself")]
    ReferenceCycle(u64),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Plist(#[from] plist::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
