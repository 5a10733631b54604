use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use tracing_error::SpanTrace;

/* 📖 # Why a custom error type and not anyhow/thiserror?

The service only has a handful of failure modes, and the HTTP layer needs to
tell them apart to pick a status code. An opaque error would force the handler
to guess from message text. With a closed enum the handler matches on the kind,
and the compiler flags any new kind the mapping has not covered. Every error
also carries the span trace from where it was created, so a 599 in the logs
points at the request that failed.
*/

/// Error variants that can occur in todo operations.
#[derive(Debug)]
pub enum ErrorKind {
    /// A required field was missing or empty
    Validation { message: String },

    /// An item with this id already exists
    Conflict { id: String },

    /// No item with this id exists
    NotFound { id: String },

    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation { message } => write!(f, "{}", message),
            ErrorKind::Conflict { id } => write!(f, "Todo with id [{}] already exists", id),
            ErrorKind::NotFound { id } => write!(f, "could not find todo with id [{}]", id),
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/* 📖 # Why separate ErrorKind and TodoError?

ErrorKind is what callers match on (the API layer turns `NotFound` into a 404,
`Conflict` into a 409 and so on). TodoError wraps it with the context strings
added while the error travels up the stack, plus the span trace captured where
it was created. Display of the kind alone is the client-facing message; Display
of the whole error is what goes into the logs.
*/

/// Error type wrapping an [`ErrorKind`] with context and a span trace.
#[derive(Debug)]
pub struct TodoError {
    kind: ErrorKind,
    context: Vec<String>,
    span_trace: SpanTrace,
}

impl TodoError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a catch-all error carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation {
            message: message.into(),
        })
    }

    pub fn conflict(id: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict { id: id.into() })
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound { id: id.into() })
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the span trace captured when the error was created.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Returns the innermost error in the source chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }
}

impl From<ErrorKind> for TodoError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for TodoError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for TodoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ctx) in self.context.iter().enumerate() {
            if i == 0 {
                write!(f, "{}", ctx)?;
            } else {
                write!(f, ": {}", ctx)?;
            }
        }

        if !self.context.is_empty() {
            write!(f, ": ")?;
        }

        write!(f, "{}", self.kind)
    }
}

/* 📖 # Why use Box<TodoError> in the result type?

The span trace and context vector make TodoError several words wide. Boxing it
keeps `TodoResult<T>` close to the size of `T`, which matters on the store's
hot paths where almost every call succeeds.
*/

/// Standard result type for todo operations.
pub type TodoResult<T> = std::result::Result<T, Box<TodoError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> TodoResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> TodoResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for TodoResult<T> {
    fn context(self, context: impl Into<String>) -> TodoResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> TodoResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Creates a boxed message error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::TodoError::message(format!($($arg)*)))
    };
}

/// Returns early with a boxed message error built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}
