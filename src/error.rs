//! Error types for pointer validation, schema loading and reference
//! resolution.

use std::path::PathBuf;

use thiserror::Error;

use crate::cancel::Cancelled;

/// Errors produced while validating JSON pointers (RFC 6901) and schema
/// reference pointers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    #[error("invalid JSON pointer: {0}")]
    InvalidPointer(String),

    #[error("invalid segment {segment:?}: {cause}")]
    Segment {
        segment: String,
        /// Zero-based position of the segment within the pointer.
        position: usize,
        cause: SegmentCause,
    },
}

/// The reason a pointer segment was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentCause {
    /// A `~` not followed by `0` or `1`. Carries the offending one- or
    /// two-character sequence.
    #[error("invalid escape sequence: {0}")]
    InvalidEscape(String),

    /// The segment is not a schema applicator keyword in a position that
    /// requires one.
    #[error("unknown keyword")]
    UnknownKeyword,

    /// A collection applicator appeared as the final segment.
    #[error("does not point to schema")]
    NoSchema,

    /// The segment after a sequence applicator is not a valid array index.
    #[error("invalid array index")]
    InvalidArrayIndex,
}

impl PointerError {
    pub(crate) fn segment(segment: &str, position: usize, cause: SegmentCause) -> Self {
        PointerError::Segment {
            segment: segment.to_string(),
            position,
            cause,
        }
    }

    /// Returns the process exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors reported by schema loaders.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The loader does not handle this kind of URI. In a loader chain this
    /// signals fall-through to the next loader.
    #[error("unsupported URI: {0}")]
    UnsupportedUri(String),

    /// No external loader was configured.
    #[error("no loader configured")]
    NotConfigured,

    #[error("schema not found: {0}")]
    NotFound(String),

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read schema: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// Catch-all for user-supplied loader implementations.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl LoadError {
    /// Returns the process exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::NotFound(_) | LoadError::Read { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::Network { .. } => 3,
            LoadError::Cancelled(_) => 1,
            _ => 2,
        }
    }
}

/// Errors produced while resolving a `$ref` against a schema tree.
///
/// Traversal errors carry the position at which resolution failed,
/// formatted as `"<resource-uri>#<pointer>"`.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Pointer(#[from] PointerError),

    #[error("unknown keyword {keyword:?} at {position:?}")]
    UnknownKeyword { keyword: String, position: String },

    #[error("missing array index at {position:?}")]
    MissingArrayIndex { position: String },

    #[error("invalid array index {segment:?} at {position:?}: {source}")]
    InvalidArrayIndex {
        segment: String,
        position: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("index out of bounds ({index}/{max}) at {position:?}")]
    IndexOutOfBounds {
        index: usize,
        max: usize,
        position: String,
    },

    #[error("unknown key {key:?} at {position:?}")]
    UnknownKey { key: String, position: String },

    #[error("missing schema at {position:?}")]
    MissingSchema { position: String },

    #[error("missing key at {position:?}")]
    MissingKey { position: String },

    /// The external loader failed or declined to load a resource that is
    /// not embedded in the current document.
    #[error("unable to locate non-embedded resource {{\"$id\": {id:?}}}: {source}")]
    ResourceNotFound {
        id: String,
        #[source]
        source: LoadError,
    },

    /// A URI matched the local identifier map but no prefetched schema
    /// exists for its resource root.
    #[error("unable to locate embedded resource: {source}")]
    EmbeddedResource {
        #[source]
        source: LoadError,
    },

    /// A mid-traversal dereference failed.
    #[error("failed to resolve {{\"$ref\": {reference:?}}} at {position:?}: {source}")]
    RefResolution {
        reference: String,
        position: String,
        #[source]
        source: Box<ResolveError>,
    },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl ResolveError {
    /// Returns the process exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::ResourceNotFound { source, .. }
            | ResolveError::EmbeddedResource { source } => source.exit_code(),
            ResolveError::RefResolution { source, .. } => source.exit_code(),
            ResolveError::Cancelled(_) => 1,
            _ => 2,
        }
    }
}
