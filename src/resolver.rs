//! Reference resolution: dereferencing a `$ref` against a schema tree,
//! crossing embedded resources through the local loader and external ones
//! through the configured [`SchemaLoader`].
//!
//! Resolution is read-only. Input schemas are never mutated; results are
//! detached clones. Reference suppression on the starting node (so that
//! resolving `""` or `"#"` on a node returns the node itself) is a
//! per-frame flag, cleared as soon as a pointer segment is consumed.

use std::rc::Rc;
use std::sync::Arc;

use url::Url;

use crate::cancel::CancelToken;
use crate::error::{LoadError, ResolveError};
use crate::loader::{LocalLoader, SchemaLoader};
use crate::pointer::{escape_segment, unescape};
use crate::schema::Schema;
use crate::uri::{resolve_uri, split_fragment};

/// Configuration for [`resolve_reference`]: a cancellation handle and the
/// external loader consulted for non-embedded resources.
#[derive(Clone, Default)]
pub struct ResolveConfig {
    cancel: CancelToken,
    loader: Option<Arc<dyn SchemaLoader>>,
}

impl ResolveConfig {
    pub fn new() -> Self {
        ResolveConfig::default()
    }

    /// Sets the external loader. Without one, every non-embedded lookup
    /// reports that no loader is configured.
    pub fn loader(mut self, loader: Arc<dyn SchemaLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }
}

struct NotConfigured;

impl SchemaLoader for NotConfigured {
    fn load(&self, _: &CancelToken, _: &str) -> Result<Schema, LoadError> {
        Err(LoadError::NotConfigured)
    }
}

/// The per-resource resolution state. Crossing into a separately loaded
/// document gets a fresh frame so stale identifier maps never leak in.
struct Frame {
    resource: Rc<Schema>,
    resource_uri: Option<String>,
    local: LocalLoader,
    ignore_refs: bool,
    /// `(resource URI, $ref)` pairs already dereferenced on this frame.
    /// A revisited pair ends an alias chain instead of looping.
    seen_refs: Vec<(Option<String>, String)>,
}

impl Frame {
    fn new(
        resource: &Schema,
        uri_hint: Option<&str>,
        loader: &Arc<dyn SchemaLoader>,
        cancel: &CancelToken,
    ) -> Result<Frame, ResolveError> {
        let resource_uri = match resource.id() {
            Some(id) => Some(resolve_uri(uri_hint, id)),
            None => uri_hint.map(str::to_string),
        };
        let local = LocalLoader::build(
            resource,
            resource_uri.as_deref(),
            Some(Arc::clone(loader)),
            cancel,
        )?;
        Ok(Frame {
            resource: Rc::new(resource.clone()),
            resource_uri,
            local,
            ignore_refs: false,
            seen_refs: Vec::new(),
        })
    }
}

/// Resolves `reference` starting from `schema`: the schema the `$ref` was
/// found on, or the document root at top level.
///
/// The reference grammar accepts pure pointers (`""`, `"#"`, `"#/..."`),
/// same-document plain-name anchors (`"#name"`), and relative or absolute
/// URIs with an optional fragment, resolved against the starting schema's
/// resource URI.
pub fn resolve_reference(
    config: &ResolveConfig,
    reference: &str,
    schema: &Schema,
) -> Result<Schema, ResolveError> {
    let loader: Arc<dyn SchemaLoader> = config
        .loader
        .clone()
        .unwrap_or_else(|| Arc::new(NotConfigured));
    let mut frame = Frame::new(schema, None, &loader, &config.cancel)?;
    resolve_in(config, &loader, &mut frame, reference, schema)
}

fn resolve_in(
    config: &ResolveConfig,
    loader: &Arc<dyn SchemaLoader>,
    frame: &mut Frame,
    reference: &str,
    schema: &Schema,
) -> Result<Schema, ResolveError> {
    config.cancel.check()?;

    // The starting schema may open its own resource.
    if let Some(id) = schema.id() {
        let absolute = resolve_uri(frame.resource_uri.as_deref(), id);
        if frame.resource_uri.as_deref() != Some(absolute.as_str()) {
            if frame.local.contains(&absolute) {
                frame.resource = Rc::new(schema.clone());
                frame.resource_uri = Some(absolute);
            } else {
                *frame = Frame::new(schema, Some(&absolute), loader, &config.cancel)?;
            }
        }
    }

    // Pure same-document pointers traverse the current resource directly.
    if reference.is_empty() || reference == "#" || reference == "/" || reference.starts_with("#/") {
        let fragment = reference.strip_prefix('#').unwrap_or(reference);
        let path = unescape(fragment);
        frame.ignore_refs = true;
        let resource = Rc::clone(&frame.resource);
        return traverse(config, loader, frame, &resource, &path, 0);
    }

    let absolute = resolve_uri(frame.resource_uri.as_deref(), reference);

    if frame.local.contains(&absolute) {
        // An embedded resource: serve it from the prefetch table and
        // traverse the residual fragment in its pointer space.
        let mut rewritten = absolute.clone();
        let loaded = frame
            .local
            .load(&config.cancel, &mut rewritten)
            .map_err(|source| match source {
                LoadError::Cancelled(c) => ResolveError::Cancelled(c),
                source => ResolveError::EmbeddedResource { source },
            })?;

        let base = split_fragment(&absolute).0;
        frame.resource = Rc::new(loaded);
        frame.resource_uri = (!base.is_empty()).then(|| base.to_string());
        frame.ignore_refs = true;

        let path = unescape(rewritten.strip_prefix('#').unwrap_or(&rewritten));
        let resource = Rc::clone(&frame.resource);
        return traverse(config, loader, frame, &resource, &path, 0);
    }

    if frame.resource_uri.is_some() || Url::parse(reference).is_ok() {
        // A separately loaded document: delegate to the external loader
        // and resolve the residual fragment in the context of that
        // resource, with a fresh frame.
        let (doc_uri, fragment) = split_fragment(&absolute);
        if Some(doc_uri) == frame.resource_uri.as_deref() {
            // The target names this very document; re-fetching cannot
            // produce the missing fragment.
            return Err(ResolveError::ResourceNotFound {
                id: absolute.clone(),
                source: LoadError::NotFound(absolute.clone()),
            });
        }

        config.cancel.check()?;
        let loaded = loader
            .load(&config.cancel, &absolute)
            .map_err(|source| match source {
                LoadError::Cancelled(c) => ResolveError::Cancelled(c),
                source => ResolveError::ResourceNotFound {
                    id: absolute.clone(),
                    source,
                },
            })?;

        let mut fresh = Frame::new(&loaded, Some(doc_uri), loader, &config.cancel)?;
        let sub_reference = match fragment {
            Some(f) if !f.is_empty() => format!("#{f}"),
            _ => "#".to_string(),
        };
        return resolve_in(config, loader, &mut fresh, &sub_reference, &loaded);
    }

    // No resource URI to resolve against: the reference is an in-tree
    // pointer relative to the starting schema.
    let path = unescape(reference);
    frame.ignore_refs = true;
    traverse(config, loader, frame, schema, &path, 0)
}

fn traverse(
    config: &ResolveConfig,
    loader: &Arc<dyn SchemaLoader>,
    frame: &mut Frame,
    current: &Schema,
    path: &[String],
    pos: usize,
) -> Result<Schema, ResolveError> {
    config.cancel.check()?;

    // Crossing a resource boundary adopts the inner resource. When its
    // URI is embedded in the current identifier map the map is kept;
    // otherwise it is recomputed from the new resource.
    if let Some(id) = current.id() {
        let absolute = resolve_uri(frame.resource_uri.as_deref(), id);
        if frame.resource_uri.as_deref() != Some(absolute.as_str()) {
            frame.resource = Rc::new(current.clone());
            if !frame.local.contains(&absolute) {
                frame.local = LocalLoader::build(
                    current,
                    Some(&absolute),
                    Some(Arc::clone(loader)),
                    &config.cancel,
                )?;
            }
            frame.resource_uri = Some(absolute);
        }
    }

    let suppressed = frame.ignore_refs;

    if pos >= path.len() {
        // The pointer is exhausted: this node is the answer, unless its
        // own reference must be dereferenced to produce it.
        return match current.reference() {
            Some(reference) if !suppressed => {
                follow_reference(config, loader, frame, current, reference, path, pos)
            }
            _ => Ok(current.clone()),
        };
    }

    let segment = path[pos].as_str();
    frame.ignore_refs = false;

    match segment {
        "allOf" | "anyOf" | "oneOf" | "prefixItems" => {
            if path.len() - pos == 1 {
                return Err(ResolveError::MissingArrayIndex {
                    position: position(frame, path, pos + 1),
                });
            }
            let index_segment = path[pos + 1].as_str();
            let index: usize =
                index_segment
                    .parse()
                    .map_err(|source| ResolveError::InvalidArrayIndex {
                        segment: index_segment.to_string(),
                        position: position(frame, path, pos + 1),
                        source,
                    })?;

            let collection = current.as_object().map(|obj| match segment {
                "allOf" => &obj.all_of,
                "anyOf" => &obj.any_of,
                "oneOf" => &obj.one_of,
                _ => &obj.prefix_items,
            });
            match collection {
                Some(col) if index < col.len() => {
                    traverse(config, loader, frame, &col[index], path, pos + 2)
                }
                _ => {
                    let len = collection.map_or(0, Vec::len);
                    let err = ResolveError::IndexOutOfBounds {
                        index,
                        max: len.saturating_sub(1),
                        position: position(frame, path, pos + 1),
                    };
                    dereference_and_retry(config, loader, frame, current, path, pos, suppressed, err)
                }
            }
        }

        "$defs" | "dependentSchemas" | "properties" | "patternProperties" => {
            if path.len() - pos == 1 {
                return Err(ResolveError::MissingKey {
                    position: position(frame, path, pos + 1),
                });
            }
            let key = path[pos + 1].as_str();
            let child = current.as_object().and_then(|obj| {
                let col = match segment {
                    "$defs" => &obj.defs,
                    "dependentSchemas" => &obj.dependent_schemas,
                    "properties" => &obj.properties,
                    _ => &obj.pattern_properties,
                };
                col.get(key)
            });
            match child {
                Some(child) => traverse(config, loader, frame, child, path, pos + 2),
                None => {
                    let err = ResolveError::UnknownKey {
                        key: key.to_string(),
                        position: position(frame, path, pos + 1),
                    };
                    dereference_and_retry(config, loader, frame, current, path, pos, suppressed, err)
                }
            }
        }

        "not" | "if" | "then" | "else" | "items" | "contains" | "additionalProperties"
        | "propertyNames" | "unevaluatedItems" | "unevaluatedProperties" | "contentSchema" => {
            let child = current.as_object().and_then(|obj| match segment {
                "not" => obj.not.as_deref(),
                "if" => obj.if_.as_deref(),
                "then" => obj.then.as_deref(),
                "else" => obj.else_.as_deref(),
                "items" => obj.items.as_deref(),
                "contains" => obj.contains.as_deref(),
                "additionalProperties" => obj.additional_properties.as_deref(),
                "propertyNames" => obj.property_names.as_deref(),
                "unevaluatedItems" => obj.unevaluated_items.as_deref(),
                "unevaluatedProperties" => obj.unevaluated_properties.as_deref(),
                _ => obj.content_schema.as_deref(),
            });
            match child {
                Some(child) => traverse(config, loader, frame, child, path, pos + 1),
                None => {
                    let err = ResolveError::MissingSchema {
                        position: position(frame, path, pos + 1),
                    };
                    dereference_and_retry(config, loader, frame, current, path, pos, suppressed, err)
                }
            }
        }

        _ => Err(ResolveError::UnknownKeyword {
            keyword: segment.to_string(),
            position: position(frame, path, pos),
        }),
    }
}

/// Dereferences the reference of a node whose pointer is exhausted.
fn follow_reference(
    config: &ResolveConfig,
    loader: &Arc<dyn SchemaLoader>,
    frame: &mut Frame,
    current: &Schema,
    reference: &str,
    path: &[String],
    pos: usize,
) -> Result<Schema, ResolveError> {
    let key = (frame.resource_uri.clone(), reference.to_string());
    if frame.seen_refs.contains(&key) {
        // An alias chain has come back around; the node itself is the
        // fixed point.
        return Ok(current.clone());
    }
    frame.seen_refs.push(key);

    let wrap_position = position(frame, path, pos);
    resolve_in(config, loader, frame, reference, current).map_err(|source| {
        ResolveError::RefResolution {
            reference: reference.to_string(),
            position: wrap_position,
            source: Box::new(source),
        }
    })
}

/// Last resort for a segment the current node cannot satisfy: follow the
/// node's own reference, if any, and retry the segment on the target.
#[allow(clippy::too_many_arguments)]
fn dereference_and_retry(
    config: &ResolveConfig,
    loader: &Arc<dyn SchemaLoader>,
    frame: &mut Frame,
    current: &Schema,
    path: &[String],
    pos: usize,
    suppressed: bool,
    otherwise: ResolveError,
) -> Result<Schema, ResolveError> {
    let reference = match current.reference() {
        Some(r) if !suppressed => r.to_string(),
        _ => return Err(otherwise),
    };

    let key = (frame.resource_uri.clone(), reference.clone());
    if frame.seen_refs.contains(&key) {
        return Err(otherwise);
    }
    frame.seen_refs.push(key);

    let wrap_position = position(frame, path, pos);
    let target =
        resolve_in(config, loader, frame, &reference, current).map_err(|source| {
            ResolveError::RefResolution {
                reference: reference.clone(),
                position: wrap_position,
                source: Box::new(source),
            }
        })?;
    traverse(config, loader, frame, &target, path, pos)
}

/// Formats a traversal position as `"<resource-uri>#<pointer>"`, taking
/// the first `end` path segments in their escaped form.
fn position(frame: &Frame, path: &[String], end: usize) -> String {
    let mut pointer = String::new();
    for segment in &path[..end.min(path.len())] {
        pointer.push('/');
        pointer.push_str(&escape_segment(segment));
    }
    format!(
        "{}#{pointer}",
        frame.resource_uri.as_deref().unwrap_or_default()
    )
}
