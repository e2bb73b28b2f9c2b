//! Structural traversal over a schema tree.
//!
//! [`walk`] visits every subschema exactly once in pre-order, handing the
//! visitor a JSON pointer from the root and a live mutable handle. The
//! visitor steers the walk through its [`WalkAction`] return: descend,
//! skip the node's descendants, or stop the whole walk. Children are read
//! *after* the visitor returns, so a visitor that replaces a schema in
//! place redirects the descent into the replacement:
//!
//! ```
//! use schema_refs::{walk, CancelToken, Cancelled, Schema, WalkAction};
//!
//! let mut schema: Schema = serde_json::from_str(r#"{"items": {"not": true}}"#).unwrap();
//! walk(&mut schema, &CancelToken::none(), |scope, s| {
//!     if scope.pointer == "/items" {
//!         *s = Schema::True;
//!     }
//!     Ok::<_, Cancelled>(WalkAction::Descend)
//! })
//! .unwrap();
//! ```

use crate::cancel::{CancelToken, Cancelled};
use crate::pointer::escape_segment;
use crate::schema::Schema;

/// The visitor's verdict for the schema it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue, descending into this node's subschemas.
    Descend,
    /// Do not descend into this node; continue with its siblings.
    SkipNode,
    /// Stop the whole walk. The walk returns success.
    Stop,
}

/// The visitor's scope: where in the tree the current schema sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// JSON pointer from the walk root. The root itself is `"/"`; map keys
    /// are RFC 6901-escaped, so the pointer always decodes back to the
    /// visited slot.
    pub pointer: String,
}

enum Flow {
    Continue,
    Stop,
}

/// Walks the schema tree rooted at `root`, calling `visitor` for each
/// schema including the root. Subschemas of mapping keywords are visited
/// in no particular order. Cancellation is checked before every descent.
pub fn walk<E, F>(root: &mut Schema, cancel: &CancelToken, mut visitor: F) -> Result<(), E>
where
    F: FnMut(&Scope, &mut Schema) -> Result<WalkAction, E>,
    E: From<Cancelled>,
{
    let scope = Scope {
        pointer: "/".to_string(),
    };
    match visitor(&scope, root)? {
        WalkAction::SkipNode | WalkAction::Stop => return Ok(()),
        WalkAction::Descend => {}
    }
    walk_children(&scope.pointer, root, cancel, &mut visitor).map(|_| ())
}

fn join(parent: &str, segment: &str) -> String {
    if parent == "/" {
        format!("/{segment}")
    } else {
        format!("{parent}/{segment}")
    }
}

fn visit_node<E, F>(
    pointer: String,
    schema: &mut Schema,
    cancel: &CancelToken,
    visitor: &mut F,
) -> Result<Flow, E>
where
    F: FnMut(&Scope, &mut Schema) -> Result<WalkAction, E>,
    E: From<Cancelled>,
{
    let scope = Scope { pointer };
    match visitor(&scope, schema)? {
        WalkAction::Descend => walk_children(&scope.pointer, schema, cancel, visitor),
        WalkAction::SkipNode => Ok(Flow::Continue),
        WalkAction::Stop => Ok(Flow::Stop),
    }
}

fn visit_single<E, F>(
    parent: &str,
    keyword: &str,
    child: Option<&mut Schema>,
    cancel: &CancelToken,
    visitor: &mut F,
) -> Result<Flow, E>
where
    F: FnMut(&Scope, &mut Schema) -> Result<WalkAction, E>,
    E: From<Cancelled>,
{
    match child {
        None => Ok(Flow::Continue),
        Some(schema) => visit_node(join(parent, keyword), schema, cancel, visitor),
    }
}

fn walk_children<E, F>(
    parent: &str,
    schema: &mut Schema,
    cancel: &CancelToken,
    visitor: &mut F,
) -> Result<Flow, E>
where
    F: FnMut(&Scope, &mut Schema) -> Result<WalkAction, E>,
    E: From<Cancelled>,
{
    cancel.check().map_err(E::from)?;

    let Some(obj) = schema.as_object_mut() else {
        return Ok(Flow::Continue);
    };

    if let Flow::Stop = visit_single(parent, "not", obj.not.as_deref_mut(), cancel, visitor)? {
        return Ok(Flow::Stop);
    }
    if let Flow::Stop = visit_single(parent, "if", obj.if_.as_deref_mut(), cancel, visitor)? {
        return Ok(Flow::Stop);
    }
    if let Flow::Stop = visit_single(parent, "then", obj.then.as_deref_mut(), cancel, visitor)? {
        return Ok(Flow::Stop);
    }
    if let Flow::Stop = visit_single(parent, "else", obj.else_.as_deref_mut(), cancel, visitor)? {
        return Ok(Flow::Stop);
    }
    if let Flow::Stop = visit_single(parent, "items", obj.items.as_deref_mut(), cancel, visitor)? {
        return Ok(Flow::Stop);
    }
    if let Flow::Stop = visit_single(
        parent,
        "contains",
        obj.contains.as_deref_mut(),
        cancel,
        visitor,
    )? {
        return Ok(Flow::Stop);
    }
    if let Flow::Stop = visit_single(
        parent,
        "additionalProperties",
        obj.additional_properties.as_deref_mut(),
        cancel,
        visitor,
    )? {
        return Ok(Flow::Stop);
    }
    if let Flow::Stop = visit_single(
        parent,
        "propertyNames",
        obj.property_names.as_deref_mut(),
        cancel,
        visitor,
    )? {
        return Ok(Flow::Stop);
    }
    if let Flow::Stop = visit_single(
        parent,
        "unevaluatedItems",
        obj.unevaluated_items.as_deref_mut(),
        cancel,
        visitor,
    )? {
        return Ok(Flow::Stop);
    }
    if let Flow::Stop = visit_single(
        parent,
        "unevaluatedProperties",
        obj.unevaluated_properties.as_deref_mut(),
        cancel,
        visitor,
    )? {
        return Ok(Flow::Stop);
    }
    if let Flow::Stop = visit_single(
        parent,
        "contentSchema",
        obj.content_schema.as_deref_mut(),
        cancel,
        visitor,
    )? {
        return Ok(Flow::Stop);
    }

    for (keyword, seq) in [
        ("allOf", &mut obj.all_of),
        ("anyOf", &mut obj.any_of),
        ("oneOf", &mut obj.one_of),
        ("prefixItems", &mut obj.prefix_items),
    ] {
        for (i, item) in seq.iter_mut().enumerate() {
            let pointer = join(parent, &format!("{keyword}/{i}"));
            if let Flow::Stop = visit_node(pointer, item, cancel, visitor)? {
                return Ok(Flow::Stop);
            }
        }
    }

    for (keyword, map) in [
        ("$defs", &mut obj.defs),
        ("dependentSchemas", &mut obj.dependent_schemas),
        ("properties", &mut obj.properties),
        ("patternProperties", &mut obj.pattern_properties),
    ] {
        for (key, value) in map.iter_mut() {
            let pointer = join(parent, &format!("{keyword}/{}", escape_segment(key)));
            if let Flow::Stop = visit_node(pointer, value, cancel, visitor)? {
                return Ok(Flow::Stop);
            }
        }
    }

    Ok(Flow::Continue)
}
