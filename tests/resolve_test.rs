//! Integration tests for reference resolution, including embedded
//! resources, plain-name anchors, and externally loaded documents.

use std::path::Path;
use std::sync::Arc;

use schema_refs::{resolve_reference, DirLoader, ResolveConfig, Schema};
use serde_json::json;

fn fixtures_dir() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn config() -> ResolveConfig {
    ResolveConfig::new().loader(Arc::new(DirLoader::new(fixtures_dir())))
}

fn parse(json: serde_json::Value) -> Schema {
    serde_json::from_value(json).expect("schema should parse")
}

/// The document the pointer-grammar tests run against. No subschema
/// declares `$id`, so pointers resolve purely in-tree.
fn defs_schema() -> Schema {
    parse(json!({
        "$defs": {
            "foo": {"type": "boolean"},
            "bar": {
                "type": "object",
                "properties": {
                    "a": {"type": "string"},
                    "b": {
                        "anyOf": [
                            {"$ref": "#/$defs/foo"},
                            {"$ref": "/$defs/null_schema"},
                            {"$ref": "/"},
                            {"$ref": "#"},
                            {"$ref": "#/$defs/bar/properties/a"},
                            {"$ref": "#/$defs/bar/properties/b/$defs/null_schema/$defs/x"},
                            {"$ref": "file:///file-system/entry-schema.schema.json#/properties/storage/oneOf/0"},
                            {"$ref": "file:///miscellaneous-examples/arrays.schema.json#/properties/vegetables"},
                            {"$ref": "file:///miscellaneous-examples/complex-object.schema.json#/properties/name"}
                        ],
                        "$defs": {
                            "null_schema": {
                                "type": "null",
                                "$defs": {
                                    "x": {
                                        "type": "array",
                                        "items": {"type": "number"}
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "baz": {"$ref": "#/$defs/bar"},
            "bu/z": {},
            "ba~z": {"type": "boolean"}
        }
    }))
}

mod pointers {
    use super::*;

    fn check(reference: &str, expected: Option<Schema>) {
        let schema = defs_schema();
        let before = schema.clone();

        let result = resolve_reference(&config(), reference, &schema);
        match expected {
            Some(expected) => {
                let resolved = result.unwrap_or_else(|e| panic!("{reference}: {e}"));
                assert_eq!(resolved, expected, "ref {reference:?}");
            }
            None => {
                assert!(result.is_err(), "ref {reference:?} should fail");
            }
        }

        // Resolution must never mutate the source document.
        assert_eq!(schema, before, "source modified by {reference:?}");
    }

    #[test]
    fn self_absolute() {
        check("#", Some(defs_schema()));
    }

    #[test]
    fn self_relative() {
        check("/", Some(defs_schema()));
    }

    #[test]
    fn defs_entry_by_fragment_pointer() {
        check("#/$defs/foo", Some(parse(json!({"type": "boolean"}))));
    }

    #[test]
    fn defs_entry_by_relative_pointer() {
        check("/$defs/foo", Some(parse(json!({"type": "boolean"}))));
    }

    #[test]
    fn nested_properties() {
        check(
            "/$defs/bar/properties/a",
            Some(parse(json!({"type": "string"}))),
        );
        check(
            "/$defs/bar/properties/b/$defs/null_schema",
            Some(parse(json!({
                "type": "null",
                "$defs": {"x": {"type": "array", "items": {"type": "number"}}}
            }))),
        );
    }

    #[test]
    fn alias_is_dereferenced_mid_pointer() {
        // baz is a pure alias for bar; the remaining segments apply to
        // the target.
        check(
            "#/$defs/baz/properties/a",
            Some(parse(json!({"type": "string"}))),
        );
    }

    #[test]
    fn relative_reference_without_anchor_document_fails() {
        // null_schema is not defined at the root, and the node's own
        // $defs are not consulted for a reference found on it.
        check("/$defs/bar/properties/b/anyOf/1", None);
    }

    #[test]
    fn trailing_empty_segment_fails() {
        check("/foo/", None);
    }

    #[test]
    fn escaped_slash_in_pointer() {
        check("/$defs/bu~1z", Some(parse(json!({}))));
    }

    #[test]
    fn escaped_tilde_in_pointer() {
        check("/$defs/ba~0z", Some(parse(json!({"type": "boolean"}))));
    }

    #[test]
    fn external_reference_with_pointer() {
        check(
            "#/$defs/bar/properties/b/anyOf/6",
            Some(parse(json!({
                "properties": {
                    "type": {"enum": ["disk"]},
                    "device": {"type": "string", "pattern": "^/dev/[^/]+(/[^/]+)*$"}
                },
                "required": ["type", "device"],
                "additionalProperties": false
            }))),
        );
    }

    #[test]
    fn external_reference_keeps_inner_references() {
        check(
            "#/$defs/bar/properties/b/anyOf/7",
            Some(parse(json!({
                "type": "array",
                "items": {"$ref": "#/$defs/veggie"}
            }))),
        );
    }

    #[test]
    fn external_reference_to_plain_property() {
        check(
            "#/$defs/bar/properties/b/anyOf/8",
            Some(parse(json!({"type": "string"}))),
        );
    }
}

mod subschemas {
    use super::*;

    /// A document with embedded resources: B is its own resource
    /// (`other.json`), D claims an unrelated absolute URI, and anchors
    /// live at several nesting depths.
    fn ids_schema() -> Schema {
        parse(json!({
            "$id": "https://example.com/schema.json",
            "$defs": {
                "A": {"$anchor": "foo"},
                "B": {
                    "$id": "other.json",
                    "$defs": {
                        "X": {
                            "$anchor": "bar",
                            "not": {"$ref": "#/$defs/Y/oneOf/2"}
                        },
                        "Y": {
                            "oneOf": [
                                {"$ref": "#/$defs/X"},
                                {"$ref": "file:///miscellaneous-examples/arrays.schema.json#/properties/vegetables"},
                                {"$ref": "https://domain.tld/schema.json#/not"},
                                {"$ref": "/schema.json#/$defs/C"}
                            ]
                        }
                    }
                },
                "C": {"type": "string"},
                "D": {
                    "$id": "https://domain.tld/schema.json",
                    "not": {"$ref": "https://example.com/other.json#bar"}
                }
            }
        }))
    }

    fn expected_x() -> Schema {
        parse(json!({
            "$anchor": "bar",
            "not": {"$ref": "#/$defs/Y/oneOf/2"}
        }))
    }

    fn check(reference: &str, expected: Schema) {
        let schema = ids_schema();
        let before = schema.clone();

        let resolved = resolve_reference(&config(), reference, &schema)
            .unwrap_or_else(|e| panic!("{reference}: {e}"));
        assert_eq!(resolved, expected, "ref {reference:?}");
        assert_eq!(schema, before, "source modified by {reference:?}");
    }

    #[test]
    fn same_document_anchor() {
        check("#foo", parse(json!({"$anchor": "foo"})));
    }

    #[test]
    fn anchor_across_embedded_resource() {
        check("other.json#bar", expected_x());
    }

    #[test]
    fn embedded_resource_root_is_returned_intact() {
        check(
            "other.json",
            parse(json!({
                "$id": "other.json",
                "$defs": {
                    "X": {
                        "$anchor": "bar",
                        "not": {"$ref": "#/$defs/Y/oneOf/2"}
                    },
                    "Y": {
                        "oneOf": [
                            {"$ref": "#/$defs/X"},
                            {"$ref": "file:///miscellaneous-examples/arrays.schema.json#/properties/vegetables"},
                            {"$ref": "https://domain.tld/schema.json#/not"},
                            {"$ref": "/schema.json#/$defs/C"}
                        ]
                    }
                }
            })),
        );
    }

    #[test]
    fn chain_across_three_resources() {
        // X/not refers into Y, whose branch crosses into D (an embedded
        // resource under a foreign URI), whose `not` comes back to X via
        // its plain-name anchor.
        check("#/$defs/B/$defs/X/not", expected_x());
    }

    #[test]
    fn external_document_via_embedded_reference() {
        check(
            "#/$defs/B/$defs/Y/oneOf/1",
            parse(json!({
                "type": "array",
                "items": {"$ref": "#/$defs/veggie"}
            })),
        );
    }

    #[test]
    fn root_relative_uri_reference_from_inner_resource() {
        // Inside B, "/schema.json#/$defs/C" resolves against
        // https://example.com/other.json back to the outer document.
        check("#/$defs/B/$defs/Y/oneOf/3", parse(json!({"type": "string"})));
    }

    #[test]
    fn embedded_resource_under_foreign_authority() {
        check(
            "https://domain.tld/schema.json",
            parse(json!({
                "$id": "https://domain.tld/schema.json",
                "not": {"$ref": "https://example.com/other.json#bar"}
            })),
        );
    }
}

mod scenarios {
    use super::*;

    #[test]
    fn tilde_escaping_resolves_to_the_right_keys() {
        let schema = parse(json!({
            "$defs": {"fo~o": true, "ba/r": true}
        }));

        let resolved = resolve_reference(&config(), "#/$defs/fo~0o", &schema).unwrap();
        assert!(resolved.is_true());

        let resolved = resolve_reference(&config(), "#/$defs/ba~1r", &schema).unwrap();
        assert!(resolved.is_true());
    }

    #[test]
    fn array_applicator_bounds() {
        let schema = parse(json!({
            "$defs": {"x": {"oneOf": [{"const": "A"}, {"const": "B"}]}}
        }));

        assert_eq!(
            resolve_reference(&config(), "#/$defs/x/oneOf/0", &schema).unwrap(),
            parse(json!({"const": "A"}))
        );

        let err = resolve_reference(&config(), "#/$defs/x/oneOf/2", &schema).unwrap_err();
        assert!(err.to_string().contains("index out of bounds (2/1)"));

        let err = resolve_reference(&config(), "#/$defs/x/oneOf/two", &schema).unwrap_err();
        assert!(err.to_string().contains(r#"invalid array index "two""#));

        let err = resolve_reference(&config(), "#/$defs/x/oneOf", &schema).unwrap_err();
        assert!(err.to_string().contains("missing array index"));
    }

    #[test]
    fn unknown_key_reports_the_key() {
        let schema = parse(json!({"$defs": {"known": true}}));
        let err = resolve_reference(&config(), "#/$defs/unknown", &schema).unwrap_err();
        assert!(err.to_string().contains(r#"unknown key "unknown""#));
    }

    #[test]
    fn failed_external_load_is_wrapped_with_position() {
        let schema = parse(json!({
            "$defs": {"broken": {"$ref": "file:///does-not-exist.json#/foo"}}
        }));

        let err = resolve_reference(&config(), "#/$defs/broken", &schema).unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains(r#"failed to resolve {"$ref": "file:///does-not-exist.json#/foo"}"#),
            "unexpected message: {message}"
        );
        assert!(
            message.contains("unable to locate non-embedded resource"),
            "unexpected message: {message}"
        );
    }

    #[test]
    fn resolving_root_references_is_the_identity() {
        let schema = defs_schema();
        assert_eq!(resolve_reference(&config(), "", &schema).unwrap(), schema);
        assert_eq!(resolve_reference(&config(), "#", &schema).unwrap(), schema);
    }
}
