//! Error types for the render function engine

use thiserror::Error;

/// Main error type for function evaluation
///
/// Degenerate inputs (empty series lists, all-absent series, series below a
/// validity threshold) are never reported through this type; they produce
/// empty or absent results instead.
#[derive(Error, Debug)]
pub enum Error {
    /// A textual parameter could not be parsed (six-sigma factor, period, ...)
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat {
        /// Parameter being parsed
        field: String,
        /// Description of the format error
        message: String,
    },

    /// A name fragment index does not exist in a series name
    #[error("Node index {index} out of range for '{name}' ({nodes} nodes)")]
    NodeOutOfRange {
        /// Series name being addressed
        name: String,
        /// Requested node index (may be negative)
        index: i64,
        /// Number of fragments the name has
        nodes: usize,
    },

    /// A reduction group lacks a series for one of the matchers
    #[error("Group '{group}' has no series matching '{matcher}'")]
    MissingGroupMember {
        /// Reduction key of the incomplete group
        group: String,
        /// Matcher with no corresponding series
        matcher: String,
    },

    /// Function name is not registered
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Argument has the wrong type or value
    #[error("Invalid argument {position} to {function}: {message}")]
    InvalidArgument {
        /// Function being called
        function: String,
        /// Zero-based argument position
        position: usize,
        /// Description of the problem
        message: String,
    },

    /// The context carries no target evaluator but one is required
    #[error("No target evaluator available for '{0}'")]
    NoEvaluator(String),

    /// Nested target evaluation failed
    #[error("Evaluation of '{target}' failed: {message}")]
    Evaluation {
        /// Target expression being evaluated
        target: String,
        /// Failure description
        message: String,
    },

    /// Invalid regular expression
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a format error for a named parameter
    pub fn format(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidFormat {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-argument error
    pub fn argument(function: impl Into<String>, position: usize, message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            function: function.into(),
            position,
            message: message.into(),
        }
    }

    /// True for malformed textual parameters
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::InvalidFormat { .. })
    }

    /// True for references to name fragments or group members that do not exist
    pub fn is_addressing_error(&self) -> bool {
        matches!(
            self,
            Error::NodeOutOfRange { .. } | Error::MissingGroupMember { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::format("factor", "too many separators").is_format_error());
        assert!(Error::NodeOutOfRange {
            name: "a.b".to_string(),
            index: 5,
            nodes: 2,
        }
        .is_addressing_error());
        assert!(Error::MissingGroupMember {
            group: "g.reduce.sumSeries".to_string(),
            matcher: "used".to_string(),
        }
        .is_addressing_error());
        assert!(!Error::UnknownFunction("nope".to_string()).is_addressing_error());
    }

    #[test]
    fn test_error_display() {
        let err = Error::argument("highestMax", 1, "expected integer");
        let display = format!("{}", err);
        assert!(display.contains("highestMax"));
        assert!(display.contains("expected integer"));

        let err = Error::NodeOutOfRange {
            name: "collectd.db1.load".to_string(),
            index: 10000,
            nodes: 3,
        };
        assert!(err.to_string().contains("10000"));
    }
}
