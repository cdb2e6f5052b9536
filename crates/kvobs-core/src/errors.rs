use thiserror::Error;

/// Result type alias using KvoError
pub type Result<T> = std::result::Result<T, KvoError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling and testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    /// Malformed key path, or a path segment that cannot be resolved
    InvalidPath,
    /// Mutation rejected by an observed object (wrong shape, bad index)
    InvalidInput,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidPath => "ERR_INVALID_PATH",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and the
/// observation context (key path, offending segment) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    key_path: Option<String>,
    segment: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            key_path: None,
            segment: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add key path context
    pub fn with_key_path(mut self, key_path: impl Into<String>) -> Self {
        self.key_path = Some(key_path.into());
        self
    }

    /// Add segment context
    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn key_path(&self) -> Option<&str> {
        self.key_path.as_deref()
    }

    pub fn segment(&self) -> Option<&str> {
        self.segment.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(key_path) = &self.key_path {
            write!(f, " (key_path: {})", key_path)?;
        }
        if let Some(segment) = &self.segment {
            write!(f, " (segment: {})", segment)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for observation and observed-object operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KvoError {
    // ===== Key Path Errors =====
    /// Key path has no segments
    #[error("Key path is empty")]
    EmptyPath,

    /// A segment is empty or not an identifier
    #[error("Invalid segment '{segment}' in key path '{key_path}'")]
    InvalidSegment { key_path: String, segment: String },

    /// The object a segment is applied to has no such attribute
    #[error("{type_name} has no attribute '{attribute}'")]
    UnknownAttribute { type_name: String, attribute: String },

    /// An intermediate segment resolved to a value that cannot be descended into
    #[error("Segment '{segment}' of key path '{key_path}' does not resolve to an object")]
    NotAnObject { key_path: String, segment: String },

    // ===== Mutation Errors =====
    /// Collection mutation on an attribute that does not hold a list
    #[error("Attribute '{attribute}' of {type_name} is not a collection")]
    NotACollection { type_name: String, attribute: String },

    /// Collection index outside the current bounds
    #[error("Index {index} out of bounds for attribute '{attribute}' (len {len})")]
    IndexOutOfBounds {
        attribute: String,
        index: usize,
        len: usize,
    },
}

impl KvoError {
    /// True for every error in the invalid-path class
    pub fn is_invalid_path(&self) -> bool {
        ExError::from(self.clone()).kind() == ExErrorKind::InvalidPath
    }
}

// Lets an already-parsed KeyPath go wherever a path-like argument is accepted
impl From<std::convert::Infallible> for KvoError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// Conversion from KvoError to ExError
impl From<KvoError> for ExError {
    fn from(err: KvoError) -> Self {
        match err {
            KvoError::EmptyPath => {
                ExError::new(ExErrorKind::InvalidPath).with_message("Key path is empty")
            }

            KvoError::InvalidSegment { key_path, segment } => {
                ExError::new(ExErrorKind::InvalidPath)
                    .with_key_path(key_path)
                    .with_segment(segment)
                    .with_message("Segment is not a valid attribute identifier")
            }

            KvoError::UnknownAttribute {
                type_name,
                attribute,
            } => ExError::new(ExErrorKind::InvalidPath)
                .with_segment(attribute)
                .with_message(format!("Attribute not present on {}", type_name)),

            KvoError::NotAnObject { key_path, segment } => ExError::new(ExErrorKind::InvalidPath)
                .with_key_path(key_path)
                .with_segment(segment)
                .with_message("Intermediate segment does not resolve to an object"),

            KvoError::NotACollection {
                type_name,
                attribute,
            } => ExError::new(ExErrorKind::InvalidInput)
                .with_segment(attribute)
                .with_message(format!("Attribute of {} is not a collection", type_name)),

            KvoError::IndexOutOfBounds {
                attribute,
                index,
                len,
            } => ExError::new(ExErrorKind::InvalidInput)
                .with_segment(attribute)
                .with_message(format!("Index {} out of bounds (len {})", index, len)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code_and_context() {
        let err = ExError::new(ExErrorKind::InvalidPath)
            .with_op("observe")
            .with_key_path("a..b")
            .with_segment("")
            .with_message("bad segment");

        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_INVALID_PATH]"));
        assert!(rendered.contains("observe"));
        assert!(rendered.contains("a..b"));
    }

    #[test]
    fn test_every_variant_maps_to_a_coded_kind() {
        let errors = [
            KvoError::EmptyPath,
            KvoError::InvalidSegment {
                key_path: "a..b".to_string(),
                segment: String::new(),
            },
            KvoError::NotACollection {
                type_name: "Person".to_string(),
                attribute: "name".to_string(),
            },
        ];
        for err in errors {
            let ex_err = ExError::from(err);
            assert!(ex_err.code().starts_with("ERR_INVALID_"));
        }
    }

    #[test]
    fn test_invalid_path_class() {
        assert!(KvoError::EmptyPath.is_invalid_path());
        assert!(KvoError::UnknownAttribute {
            type_name: "Person".to_string(),
            attribute: "age".to_string(),
        }
        .is_invalid_path());
        assert!(!KvoError::IndexOutOfBounds {
            attribute: "tags".to_string(),
            index: 4,
            len: 1,
        }
        .is_invalid_path());
    }
}
