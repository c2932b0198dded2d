//! Error types for every stage of the export and serving pipeline.

use thiserror::Error;

/// Errors raised while constructing the network module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A layer was declared with a zero-sized dimension.
    #[error("layer dimension `{name}` must be positive")]
    ZeroDimension { name: &'static str },
}

/// Errors raised while compiling a module against a signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Two layers of the module do not chain.
    #[error("layer `{layer}` expects {expected} input features but the previous layer produces {found}")]
    LayerMismatch {
        layer: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("parameter #{index} of `{function}` has an empty name")]
    EmptyParameterName { function: String, index: usize },

    #[error("parameter `{name}` of `{function}` is declared more than once")]
    DuplicateParameter { function: String, name: String },

    /// A type in the signature cannot be represented at runtime.
    #[error("unsupported type `{ty}` in `{location}`: {reason}")]
    UnsupportedType {
        location: String,
        ty: String,
        reason: &'static str,
    },
}

/// Errors raised while executing a compiled program.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("{function}() expected {expected} argument(s) but received {found}")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("expected a value of type '{expected}' for argument '{name}' but instead found type '{found}'")]
    ArgumentType {
        name: String,
        expected: String,
        found: String,
    },

    #[error("key '{0}' is missing from the input dictionary")]
    MissingKey(String),

    #[error("{0}")]
    Shape(String),

    #[error("{0}")]
    DataType(String),

    /// The tensor runtime rejected an operation.
    #[error("tensor backend error: {0}")]
    Backend(String),
}

impl InferenceError {
    /// True when the failure is caused by the caller's inputs rather than by
    /// the servable itself.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, InferenceError::Backend(_))
    }
}

/// Errors raised while reading or writing a compiled artifact.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a compiled artifact (bad magic bytes)")]
    BadMagic,

    #[error("unsupported artifact format version {0}")]
    UnsupportedVersion(u32),

    #[error("artifact is truncated")]
    Truncated,

    #[error("invalid artifact header: {0}")]
    Header(#[from] serde_json::Error),

    #[error("parameter record error: {0}")]
    Record(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Errors raised while converting between JSON payloads and runtime values.
///
/// The three kinds map onto distinct client-facing responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorIoError {
    /// Payload structure is wrong.
    #[error("{0}")]
    Format(String),
    /// Unknown or incompatible element type.
    #[error("{0}")]
    DataType(String),
    /// Element count does not match the declared shape.
    #[error("{0}")]
    Shape(String),
}

impl TensorIoError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub(crate) fn data_type(msg: impl Into<String>) -> Self {
        Self::DataType(msg.into())
    }

    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }
}

/// Errors surfaced by the servable manager.
#[derive(Error, Debug)]
pub enum ServingError {
    /// The identifier could not be resolved to a loadable servable.
    #[error("failed to load from servable_identifier: {identifier}: {reason}")]
    InvalidServable { identifier: String, reason: String },

    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// The background inference task died before producing a result.
    #[error("inference task failed: {0}")]
    TaskFailed(String),
}

/// Errors raised by the one-shot export pipeline.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
