//! Integration tests for the directory-backed external loader.

use std::path::Path;

use schema_refs::{CancelToken, DirLoader, LoadError, Schema, SchemaLoader};
use serde_json::json;

fn loader() -> DirLoader {
    DirLoader::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures"))
}

fn parse(json: serde_json::Value) -> Schema {
    serde_json::from_value(json).expect("schema should parse")
}

#[test]
fn refuses_non_file_uris() {
    let err = loader()
        .load(&CancelToken::none(), "https://example.com/foo.json")
        .unwrap_err();
    assert!(matches!(err, LoadError::UnsupportedUri(_)));
}

#[test]
fn loads_embedded_documents() {
    let schema = loader()
        .load(&CancelToken::none(), "file:///embedded/foo.json")
        .unwrap();

    let expected = parse(json!({
        "type": "array",
        "items": {
            "oneOf": [
                {"$ref": "#/$defs/uint8"},
                {"$ref": "file:///embedded/bar.json#/$defs/negativeOne"}
            ]
        },
        "$defs": {
            "uint8": {
                "type": "integer",
                "minimum": 0,
                "maximum": 255
            }
        }
    }));
    assert_eq!(schema, expected);
}

#[test]
fn missing_documents_are_not_found() {
    let err = loader()
        .load(&CancelToken::none(), "file:///embedded/missing.json")
        .unwrap_err();
    assert!(matches!(err, LoadError::NotFound(_)));
}

#[test]
fn non_json_content_fails_to_parse() {
    let err = loader()
        .load(&CancelToken::none(), "file:///embedded/baz.txt")
        .unwrap_err();
    assert!(matches!(err, LoadError::InvalidJson { .. }));
}

#[test]
fn cancellation_is_observed() {
    let token = CancelToken::new();
    token.cancel();
    let err = loader()
        .load(&token, "file:///embedded/foo.json")
        .unwrap_err();
    assert!(matches!(err, LoadError::Cancelled(_)));
}

#[test]
fn cross_file_references_resolve_through_the_loader() {
    use schema_refs::{resolve_reference, ResolveConfig};
    use std::sync::Arc;

    let config = ResolveConfig::new().loader(Arc::new(loader()));
    let root = loader()
        .load(&CancelToken::none(), "file:///embedded/foo.json")
        .unwrap();

    let resolved = resolve_reference(&config, "#/items/oneOf/1", &root).unwrap();
    assert_eq!(resolved, parse(json!({"const": -1})));
}
