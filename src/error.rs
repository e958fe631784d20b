//! Errors with context trails
//!
//! Every fallible call in this crate returns [`Result<T>`]. An [`Error`] records
//! *what kind* of failure happened, the engine's own diagnostic when it left one,
//! and a trail of context messages added as the error travels outwards.
//!
//! # Examples
//!
//! ```
//! use isle::{Error, ErrorKind};
//!
//! let err = Error::new(ErrorKind::ConstructionFailure)
//!     .with_message("parse error: unexpected '}'")
//!     .context("reading iteration domain")
//!     .context("building schedule");
//!
//! assert!(err.is_construction_failure());
//! assert_eq!(err.context_trail().len(), 2);
//! assert_eq!(
//!     err.to_string(),
//!     "Error: construction failed: parse error: unexpected '}'\n  -> reading iteration domain\n  -> building schedule"
//! );
//! ```

use std::error::Error as StdError;
use std::fmt;

/// The ways a call into the engine can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A factory, parser or combinator returned no object.
    ConstructionFailure,
    /// An optimization or sampling query has no answer (empty or unbounded).
    NoSolution,
    /// A raw pointer belongs to a context that is being torn down.
    DetachedContext,
}

impl ErrorKind {
    fn describe(self) -> &'static str {
        match self {
            ErrorKind::ConstructionFailure => "construction failed",
            ErrorKind::NoSolution => "no solution",
            ErrorKind::DetachedContext => "context is being torn down",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// An engine failure plus the context it propagated through.
///
/// # Examples
///
/// ```
/// use isle::{Error, ErrorKind};
///
/// let err = Error::new(ErrorKind::NoSolution).context("minimizing i over the domain");
/// assert!(err.is_no_solution());
/// assert_eq!(err.message(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    context: Vec<String>,
}

impl Error {
    /// Create an error of the given kind with no diagnostic and an empty trail.
    pub fn new(kind: ErrorKind) -> Self {
        Error {
            kind,
            message: None,
            context: Vec::new(),
        }
    }

    /// Attach the engine's diagnostic message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Add a context layer.
    ///
    /// Layers accumulate in the order they are added, innermost first.
    ///
    /// ```
    /// use isle::{Error, ErrorKind};
    ///
    /// let err = Error::new(ErrorKind::ConstructionFailure)
    ///     .context("parsing")
    ///     .context("loading kernel");
    /// assert_eq!(err.context_trail(), &["parsing", "loading kernel"]);
    /// ```
    pub fn context(mut self, msg: impl Into<String>) -> Self {
        self.context.push(msg.into());
        self
    }

    /// What went wrong.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The engine's diagnostic, if it recorded one.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Context messages in the order they were added.
    pub fn context_trail(&self) -> &[String] {
        &self.context
    }

    /// Whether this is an [`ErrorKind::NoSolution`].
    pub fn is_no_solution(&self) -> bool {
        self.kind == ErrorKind::NoSolution
    }

    /// Whether this is an [`ErrorKind::ConstructionFailure`].
    pub fn is_construction_failure(&self) -> bool {
        self.kind == ErrorKind::ConstructionFailure
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        for ctx in &self.context {
            write!(f, "\n  -> {}", ctx)?;
        }
        Ok(())
    }
}

impl StdError for Error {}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_message_or_context() {
        let err = Error::new(ErrorKind::NoSolution);
        assert_eq!(err.to_string(), "Error: no solution");
    }

    #[test]
    fn display_with_context() {
        let err = Error::new(ErrorKind::DetachedContext)
            .with_message("0x10")
            .context("adopting set")
            .context("loading");
        let output = err.to_string();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Error: context is being torn down: 0x10");
        assert_eq!(lines[1], "  -> adopting set");
        assert_eq!(lines[2], "  -> loading");
    }

    #[test]
    fn predicates_follow_kind() {
        assert!(Error::new(ErrorKind::NoSolution).is_no_solution());
        assert!(!Error::new(ErrorKind::NoSolution).is_construction_failure());
        assert!(Error::new(ErrorKind::ConstructionFailure).is_construction_failure());
    }

    #[test]
    fn usable_as_dyn_error() {
        let err: Box<dyn StdError> = Box::new(Error::new(ErrorKind::ConstructionFailure));
        assert!(err.to_string().starts_with("Error: construction failed"));
    }

    #[test]
    fn equality_includes_trail() {
        let a = Error::new(ErrorKind::NoSolution).context("x");
        let b = Error::new(ErrorKind::NoSolution).context("x");
        let c = Error::new(ErrorKind::NoSolution).context("y");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
