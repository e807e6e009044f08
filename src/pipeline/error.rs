use std::fmt;

/// Errors that can occur while a request moves through the pipeline
///
/// Decode variants (`MalformedBody`, `MissingField`, `InvalidField`) map to
/// a 400 response. `Template` and `InvalidPattern` variants are server
/// faults; their detail stays in the server-side log.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The request body could not be parsed as form-encoded data
    MalformedBody {
        message: String,
    },

    /// A declared form field had no submitted value and no default
    MissingField {
        name: String,
    },

    /// A submitted value could not be converted to the field's declared type
    InvalidField {
        name: String,
        value: String,
    },

    /// Template lookup or rendering failed
    Template {
        message: String,
    },

    /// A route pattern could not be parsed at registration time
    InvalidPattern {
        pattern: String,
        message: String,
    },
}

impl PipelineError {
    /// Create a MalformedBody error
    pub fn malformed_body(message: impl Into<String>) -> Self {
        Self::MalformedBody {
            message: message.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(name: impl Into<String>) -> Self {
        Self::MissingField { name: name.into() }
    }

    /// Create an InvalidField error
    pub fn invalid_field(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidField {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create a Template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create an InvalidPattern error
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// True if the error is the client's fault (a decode failure)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedBody { .. } | Self::MissingField { .. } | Self::InvalidField { .. }
        )
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::MalformedBody { message } => {
                write!(f, "Malformed form body: {}", message)
            }
            PipelineError::MissingField { name } => {
                write!(f, "Missing form field: {}", name)
            }
            PipelineError::InvalidField { name, value } => {
                write!(f, "Invalid value for form field '{}': {:?}", name, value)
            }
            PipelineError::Template { message } => {
                write!(f, "Template error: {}", message)
            }
            PipelineError::InvalidPattern { pattern, message } => {
                write!(f, "Invalid route pattern '{}': {}", pattern, message)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_body() {
        let err = PipelineError::malformed_body("unexpected byte");
        assert_eq!(err.to_string(), "Malformed form body: unexpected byte");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_missing_field() {
        let err = PipelineError::missing_field("title");
        assert_eq!(err.to_string(), "Missing form field: title");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_invalid_field() {
        let err = PipelineError::invalid_field("expires", "soon");
        assert_eq!(
            err.to_string(),
            "Invalid value for form field 'expires': \"soon\""
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn test_template_error_is_not_client_error() {
        let err = PipelineError::template("page not found in cache");
        assert_eq!(err.to_string(), "Template error: page not found in cache");
        assert!(!err.is_client_error());
    }
}
