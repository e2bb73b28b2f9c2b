//! JSON pointer validation and decoding (RFC 6901), plus the keyword-aware
//! validator for pointers used as schema references.

use crate::error::{PointerError, SegmentCause};

/// Schema applicator keywords holding collections of subschemas. A pointer
/// segment naming one of these must be followed by an index or key.
const COLLECTION_KEYWORDS: &[&str] = &[
    "allOf",
    "anyOf",
    "oneOf",
    "prefixItems",
    "$defs",
    "dependentSchemas",
    "properties",
    "patternProperties",
];

/// Keywords holding a single subschema. Legal as the final segment.
const SINGLE_SCHEMA_KEYWORDS: &[&str] = &[
    "not",
    "if",
    "then",
    "else",
    "items",
    "contains",
    "additionalProperties",
    "propertyNames",
    "unevaluatedItems",
    "unevaluatedProperties",
    "contentSchema",
];

/// Keywords whose collection is an ordered sequence indexed by array index.
const SEQUENCE_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf", "prefixItems"];

/// Keywords whose collection is a mapping keyed by arbitrary names.
const MAPPING_KEYWORDS: &[&str] = &["$defs", "dependentSchemas", "properties", "patternProperties"];

/// Validates `pointer` against the RFC 6901 grammar.
///
/// The empty string and `"/"` are valid. Any other pointer must start with
/// `/`; successive slashes produce empty segments, which are legal. A `~`
/// must be followed by `0` or `1`.
pub fn validate(pointer: &str) -> Result<(), PointerError> {
    validate_with(pointer, |_, _| Ok(()))
}

/// Validates `pointer` like [`validate`], invoking `hook` with each
/// segment's index and the full segment sequence after the segment has
/// passed the lexical checks. Hook errors propagate.
pub fn validate_with<F>(pointer: &str, mut hook: F) -> Result<(), PointerError>
where
    F: FnMut(usize, &[&str]) -> Result<(), PointerError>,
{
    if pointer.is_empty() || pointer == "/" {
        return Ok(());
    }

    if !pointer.starts_with('/') {
        return Err(PointerError::InvalidPointer(pointer.to_string()));
    }

    // The first char must be a "/", so only the first occurrence is
    // consumed. Further "/" are kept, as "//" is a valid JSON pointer.
    let segments: Vec<&str> = pointer[1..].split('/').collect();

    for (i, segment) in segments.iter().enumerate() {
        let token: Vec<char> = segment.chars().collect();
        for (j, c) in token.iter().enumerate() {
            // A reference token is *(unescaped / escaped) where unescaped
            // is any code point except ~ and /, the latter being the
            // separator. A ~ is only legal when followed by 0 or 1.
            if *c != '~' || matches!(token.get(j + 1), Some('0') | Some('1')) {
                continue;
            }

            let mut offender = String::from('~');
            if let Some(next) = token.get(j + 1) {
                offender.push(*next);
            }
            return Err(PointerError::segment(
                segment,
                i,
                SegmentCause::InvalidEscape(offender),
            ));
        }

        hook(i, &segments)?;
    }

    Ok(())
}

/// Validates a same-document schema reference pointer.
///
/// A leading `#` is stripped when the reference is longer than one
/// character; the remainder must be a valid JSON pointer whose segments
/// follow the schema applicator grammar: collection applicators require a
/// following index or key, single-schema keywords stand on their own, and
/// anything else is only legal directly under a mapping applicator (any
/// key) or a sequence applicator (an array index).
pub fn validate_reference(reference: &str) -> Result<(), PointerError> {
    let pointer = if reference.len() > 1 && reference.starts_with('#') {
        &reference[1..]
    } else {
        reference
    };
    validate_with(pointer, schema_segment)
}

fn schema_segment(i: usize, segments: &[&str]) -> Result<(), PointerError> {
    let segment = segments[i];

    if COLLECTION_KEYWORDS.contains(&segment) {
        if i + 1 >= segments.len() {
            return Err(PointerError::segment(segment, i, SegmentCause::NoSchema));
        }
        return Ok(());
    }

    if SINGLE_SCHEMA_KEYWORDS.contains(&segment) {
        return Ok(());
    }

    if i > 0 {
        let prev = segments[i - 1];
        if MAPPING_KEYWORDS.contains(&prev) {
            return Ok(());
        }
        if SEQUENCE_KEYWORDS.contains(&prev) {
            if is_array_index(segment) {
                return Ok(());
            }
            return Err(PointerError::segment(
                segment,
                i,
                SegmentCause::InvalidArrayIndex,
            ));
        }
    }

    Err(PointerError::segment(
        segment,
        i,
        SegmentCause::UnknownKeyword,
    ))
}

/// Splits `pointer` into unescaped segments.
///
/// Trims a single leading `/`, splits on `/` and decodes `~1` to `/`
/// before `~0` to `~` (in that order, so `~01` becomes `~1`). The empty
/// pointer and `"/"` both decode to no segments.
pub fn unescape(pointer: &str) -> Vec<String> {
    if pointer.is_empty() || pointer == "/" {
        return Vec::new();
    }

    pointer
        .strip_prefix('/')
        .unwrap_or(pointer)
        .split('/')
        .map(unescape_segment)
        .collect()
}

/// Decodes the RFC 6901 escapes in a single segment.
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Encodes a key for use as a pointer segment (`~` to `~0`, `/` to `~1`).
pub fn escape_segment(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Whether `segment` is a valid JSON pointer array index: `"0"`, or a
/// non-empty decimal without leading zero or sign.
pub fn is_array_index(segment: &str) -> bool {
    if segment == "0" {
        return true;
    }
    !segment.is_empty()
        && !segment.starts_with('0')
        && segment.chars().all(|c| c.is_ascii_digit())
}
