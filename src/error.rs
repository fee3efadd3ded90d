use serde::{Deserialize, Serialize, Serializer};

/// Error raised by a [`DocumentLoader`](crate::loader::DocumentLoader).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// The URL is not a pinned context and the loader has no fallback.
    #[error("Unknown context: {0}")]
    UnknownContext(String),
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Unable to load document `{url}`: {message}")]
    Fetch { url: String, message: String },
}

impl LoaderError {
    pub fn url(&self) -> &str {
        match self {
            Self::UnknownContext(url) | Self::NotFound(url) => url,
            Self::Fetch { url, .. } => url,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Programmer error: a required option was not supplied.
    #[error("{0}")]
    Argument(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Signature(String),
    #[error("{0}")]
    Purpose(String),
    /// The controller document of a verification method could not be loaded.
    #[error("Unable to load controller `{controller}`.")]
    Controller {
        controller: String,
        #[source]
        source: LoaderError,
    },
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("Canonicalization failed: {0}")]
    Canonicalization(String),
    #[error("Invalid JSON: {0}")]
    Json(String),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("`{0}` is not supported by this suite.")]
    NotImplemented(&'static str),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

impl Error {
    /// Error class name, stable across releases and safe to log.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Argument(_) => "ArgumentError",
            Self::NotFound(_) => "NotFoundError",
            Self::Signature(_) => "SignatureError",
            Self::Purpose(_) | Self::Controller { .. } => "PurposeError",
            Self::Loader(_) => "LoaderError",
            Self::Canonicalization(_) => "CanonicalizationError",
            Self::Json(_) => "SyntaxError",
            Self::Verification(_) => "VerificationError",
            Self::NotImplemented(_) => "NotImplementedError",
        }
    }

    pub fn to_record(&self) -> ErrorRecord {
        let cause = match self {
            Self::Controller { source, .. } => Some(Box::new(ErrorRecord {
                name: "LoaderError".to_string(),
                message: source.to_string(),
                cause: None,
                errors: Vec::new(),
            })),
            _ => None,
        };
        let errors = match self {
            Self::Verification(e) => e.errors.iter().map(Error::to_record).collect(),
            _ => Vec::new(),
        };
        ErrorRecord {
            name: self.name().to_string(),
            message: self.to_string(),
            cause,
            errors,
        }
    }
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

/// Aggregate of every per-proof failure of a verification.
#[derive(thiserror::Error, Debug, Clone)]
#[error("Verification error(s).")]
pub struct VerificationError {
    pub errors: Vec<Error>,
}

impl VerificationError {
    pub fn new(errors: Vec<Error>) -> Self {
        Self { errors }
    }
}

/// Serializable form of an [`Error`], kept for audit logs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ErrorRecord>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorRecord>,
}
