//! Identifier computation: the set of URIs under which each subschema of a
//! document is known.
//!
//! A subschema declaring `$id` opens a new *resource* with its own base
//! URI and pointer space; a subschema declaring `$anchor` gains a
//! plain-name URI under its enclosing resource. Everything else is
//! addressable only by pointer and is omitted from the output.

use std::collections::BTreeMap;

use crate::cancel::{CancelToken, Cancelled};
use crate::schema::Schema;
use crate::uri::resolve_uri;
use crate::walk::{walk, WalkAction};

/// The URIs under which a single subschema is addressable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identifiers {
    /// The nearest enclosing `$id`, resolved against the document base.
    pub base_uri: String,
    /// `base_uri + "#" + anchor`, present iff the subschema declares
    /// `$anchor`.
    pub canonical_plain_uri: Option<String>,
    /// `base_uri + "#"` for resource roots, otherwise `base_uri + "#" +
    /// <pointer from the resource root>`.
    pub canonical_pointer_uri: String,
    /// Every other URI addressing this subschema through enclosing
    /// resources, in no particular order.
    pub enclosing_resource_uris: Vec<String>,
}

/// Identifier records keyed by JSON pointer from the document root.
pub type IdentifierMap = BTreeMap<String, Identifiers>;

/// Computes the identifiers of every subschema of `root` that declares
/// `$id` or `$anchor`, keyed by pointer from `root`. The root itself is
/// excluded; callers synthesize a root entry when they need one.
pub fn compute_identifiers(root: &Schema) -> Result<IdentifierMap, Cancelled> {
    compute_identifiers_with(root, &CancelToken::none())
}

/// [`compute_identifiers`] with a cancellation handle, checked on every
/// descent of the underlying walk.
pub fn compute_identifiers_with(
    root: &Schema,
    cancel: &CancelToken,
) -> Result<IdentifierMap, Cancelled> {
    // Normalized so canonical URIs compare equal to resolver output.
    let base = root.id().map(|id| resolve_uri(None, id));
    let mut map = IdentifierMap::new();

    // The walk visits through a throwaway clone: identifier computation
    // never mutates the input document.
    let mut work = root.clone();
    walk(&mut work, cancel, |scope, schema| {
        if scope.pointer == "/" {
            return Ok(WalkAction::Descend);
        }

        let id = schema.id().map(str::to_string);
        let anchor = schema.anchor().map(str::to_string);
        if id.is_none() && anchor.is_none() {
            return Ok(WalkAction::Descend);
        }

        let base_str = base.as_deref().unwrap_or("");
        let mut ids = Identifiers::default();
        let mut action = WalkAction::Descend;

        if let Some(id) = id {
            let resolved = resolve_uri(base.as_deref(), &id);

            // This subschema is a resource root: compute its subtree as if
            // it were a standalone document, then re-home every inner
            // record into the outer pointer space.
            let mut sub = schema.clone();
            if let Some(obj) = sub.as_object_mut() {
                obj.id = Some(resolved.clone());
            }
            let inner = compute_identifiers_with(&sub, cancel)?;
            for (pointer, mut record) in inner {
                record
                    .enclosing_resource_uris
                    .push(format!("{base_str}#{}{pointer}", scope.pointer));
                map.insert(format!("{}{pointer}", scope.pointer), record);
            }

            ids.base_uri = resolved;
            ids.canonical_pointer_uri = format!("{}#", ids.base_uri);
            action = WalkAction::SkipNode;
        } else {
            ids.base_uri = base_str.to_string();
            ids.canonical_pointer_uri = format!("{base_str}#{}", scope.pointer);
        }

        if let Some(anchor) = anchor {
            ids.canonical_plain_uri = Some(format!("{}#{anchor}", ids.base_uri));
        }

        let enclosing = format!("{base_str}#{}", scope.pointer);
        if enclosing != ids.canonical_pointer_uri {
            ids.enclosing_resource_uris.push(enclosing);
        }

        map.insert(scope.pointer.clone(), ids);
        Ok(action)
    })?;

    Ok(map)
}
