use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for Docvault operations
///
/// This enum represents all possible error types that can occur during backup,
/// restore, and store operations. Each error kind describes a specific category
/// of failure, enabling precise error handling.
///
/// # Examples
///
/// ```rust,ignore
/// use docvault::errors::{DocvaultError, ErrorKind, DocvaultResult};
///
/// fn example() -> DocvaultResult<()> {
///     Err(DocvaultError::new("snapshot has no metadata", ErrorKind::NotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Construction Errors - missing required collaborators or handles
    /// A required collaborator (remote handle, store opener) was not supplied
    ConfigurationError,

    // Argument Errors - actively used in bulk write validation
    /// Caller supplied inconsistent arguments (e.g. mismatched id/value counts)
    ArgumentError,

    // Lookup Errors
    /// The requested resource was not found
    NotFound,

    // Remote Errors - fetch/write/auth/quota failures from the remote side
    /// Remote collection fetch or batch write failed
    RemoteError,

    // Local Storage Errors
    /// The local storage engine failed
    StorageError,
    /// The store has already been closed
    StoreAlreadyClosed,

    // IO and Encoding Errors
    /// Generic IO error
    IOError,
    /// Error encoding or decoding data
    EncodingError,

    // Generic/Internal Errors - used as fallback
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ConfigurationError => write!(f, "Configuration error"),
            ErrorKind::ArgumentError => write!(f, "Argument error"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::RemoteError => write!(f, "Remote error"),
            ErrorKind::StorageError => write!(f, "Storage error"),
            ErrorKind::StoreAlreadyClosed => write!(f, "Store already closed"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom Docvault error type.
///
/// `DocvaultError` encapsulates error information including the error message,
/// kind, and optional cause. It supports error chaining and backtraces for
/// debugging.
///
/// # Examples
///
/// ```rust,ignore
/// use docvault::errors::{DocvaultError, ErrorKind};
///
/// // Create a simple error
/// let err = DocvaultError::new("blob not found", ErrorKind::NotFound);
///
/// // Create an error with a cause
/// let cause = DocvaultError::new("connection reset", ErrorKind::RemoteError);
/// let err = DocvaultError::new_with_cause("backup of 'users' failed", ErrorKind::RemoteError, cause);
/// ```
#[derive(Clone)]
pub struct DocvaultError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<DocvaultError>>,
    backtrace: Arc<Backtrace>,
}

impl DocvaultError {
    /// Creates a new `DocvaultError` with the specified message and error kind.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    ///
    /// # Returns
    ///
    /// A new `DocvaultError` instance.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        DocvaultError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `DocvaultError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for
    /// debugging.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    /// * `cause` - The underlying error that caused this error
    ///
    /// # Returns
    ///
    /// A new `DocvaultError` instance with the cause error attached.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: DocvaultError) -> Self {
        DocvaultError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&Box<DocvaultError>> {
        self.cause.as_ref()
    }
}

impl Display for DocvaultError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for DocvaultError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace),
        }
    }
}

impl Error for DocvaultError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for Docvault operations.
///
/// `DocvaultResult<T>` is shorthand for `Result<T, DocvaultError>`.
/// All fallible Docvault operations return this type.
pub type DocvaultResult<T> = Result<T, DocvaultError>;

// From trait implementations for automatic error conversion
impl From<std::io::Error> for DocvaultError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::IOError,
        };
        DocvaultError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<serde_json::Error> for DocvaultError {
    fn from(err: serde_json::Error) -> Self {
        DocvaultError::new(
            &format!("JSON encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<std::string::FromUtf8Error> for DocvaultError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        DocvaultError::new(
            &format!("UTF-8 encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<String> for DocvaultError {
    fn from(msg: String) -> Self {
        DocvaultError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for DocvaultError {
    fn from(msg: &str) -> Self {
        DocvaultError::new(msg, ErrorKind::InternalError)
    }
}
