//! JSON Schema (draft 2020-12) identifiers, references and traversal.
//!
//! This library works with schema documents as in-memory trees and
//! implements the identifier and reference machinery of JSON Schema:
//! computing the URIs under which every subschema is known, resolving
//! `$ref` strings (JSON pointers, plain-name anchors, and URIs), and
//! walking the tree with full control over descent.
//!
//! # Example
//!
//! ```
//! use schema_refs::{resolve_reference, ResolveConfig, Schema};
//!
//! let root: Schema = serde_json::from_str(
//!     r##"{
//!         "$defs": {
//!             "foo": {"type": "boolean"}
//!         }
//!     }"##,
//! )
//! .unwrap();
//!
//! let resolved = resolve_reference(&ResolveConfig::new(), "#/$defs/foo", &root).unwrap();
//! assert_eq!(resolved, serde_json::from_str::<Schema>(r#"{"type": "boolean"}"#).unwrap());
//! ```
//!
//! # Reference grammar
//!
//! [`resolve_reference`] accepts pure pointers (`""`, `"#"`, `"#/..."`),
//! same-document plain-name anchors (`"#name"`), relative URIs resolved
//! against the current resource (`"other.json#/..."`), and absolute URIs.
//! Resources embedded in the starting document (subschemas declaring
//! `$id`) resolve in memory; everything else is delegated to a
//! [`SchemaLoader`].
//!
//! Instance validation is out of scope: this library interprets schema
//! structure, it does not evaluate schemas against documents.

mod cancel;
mod error;
mod identifiers;
mod loader;
mod pointer;
mod resolver;
mod schema;
mod uri;
mod walk;

pub use cancel::{CancelToken, Cancelled};
pub use error::{LoadError, PointerError, ResolveError, SegmentCause};
pub use identifiers::{compute_identifiers, compute_identifiers_with, IdentifierMap, Identifiers};
pub use loader::{DirLoader, LoaderChain, LocalLoader, SchemaLoader};
pub use pointer::{
    escape_segment, is_array_index, unescape, unescape_segment, validate, validate_reference,
    validate_with,
};
pub use resolver::{resolve_reference, ResolveConfig};
pub use schema::{ObjectSchema, Schema, Type, TypeSet};
pub use walk::{walk, Scope, WalkAction};

#[cfg(feature = "remote")]
pub use loader::HttpLoader;
