//! Schema loading: the external loader contract and the local loader that
//! serves embedded resources out of a prefetched document.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use crate::cancel::{CancelToken, Cancelled};
use crate::error::LoadError;
use crate::identifiers::{compute_identifiers_with, IdentifierMap, Identifiers};
use crate::schema::Schema;
use crate::uri::split_fragment;

/// The capability through which the resolver obtains schemas it cannot
/// find in the current document.
///
/// Implementations return [`LoadError::UnsupportedUri`] for URIs they do
/// not handle, which lets a [`LoaderChain`] fall through to the next
/// loader. A loader backed by blocking I/O should observe `cancel` where
/// it can.
pub trait SchemaLoader {
    fn load(&self, cancel: &CancelToken, uri: &str) -> Result<Schema, LoadError>;
}

impl<F> SchemaLoader for F
where
    F: Fn(&CancelToken, &str) -> Result<Schema, LoadError>,
{
    fn load(&self, cancel: &CancelToken, uri: &str) -> Result<Schema, LoadError> {
        self(cancel, uri)
    }
}

/// Tries each loader in order, skipping those that report
/// [`LoadError::UnsupportedUri`].
pub struct LoaderChain {
    loaders: Vec<Arc<dyn SchemaLoader>>,
}

impl LoaderChain {
    pub fn new(loaders: Vec<Arc<dyn SchemaLoader>>) -> Self {
        LoaderChain { loaders }
    }
}

impl SchemaLoader for LoaderChain {
    fn load(&self, cancel: &CancelToken, uri: &str) -> Result<Schema, LoadError> {
        for loader in &self.loaders {
            match loader.load(cancel, uri) {
                Err(LoadError::UnsupportedUri(_)) => continue,
                other => return other,
            }
        }
        Err(LoadError::UnsupportedUri(uri.to_string()))
    }
}

/// A loader that serves `file://` URIs from a directory tree, the
/// embedded-filesystem loader of the external interface contract. Any
/// other scheme is reported as unsupported.
pub struct DirLoader {
    root: PathBuf,
}

impl DirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirLoader { root: root.into() }
    }
}

impl SchemaLoader for DirLoader {
    fn load(&self, cancel: &CancelToken, uri: &str) -> Result<Schema, LoadError> {
        cancel.check()?;

        let url = Url::parse(uri).map_err(|_| LoadError::UnsupportedUri(uri.to_string()))?;
        if url.scheme() != "file" {
            return Err(LoadError::UnsupportedUri(uri.to_string()));
        }

        let path = self.root.join(url.path().trim_start_matches('/'));
        if !path.exists() {
            return Err(LoadError::NotFound(uri.to_string()));
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|source| LoadError::Read { path, source })?;
        serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
    }
}

/// A loader that fetches `http://` and `https://` URIs.
#[cfg(feature = "remote")]
pub struct HttpLoader {
    timeout: std::time::Duration,
}

#[cfg(feature = "remote")]
impl HttpLoader {
    pub fn new() -> Self {
        HttpLoader {
            timeout: std::time::Duration::from_secs(10),
        }
    }

    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        HttpLoader { timeout }
    }
}

#[cfg(feature = "remote")]
impl Default for HttpLoader {
    fn default() -> Self {
        HttpLoader::new()
    }
}

#[cfg(feature = "remote")]
impl SchemaLoader for HttpLoader {
    fn load(&self, cancel: &CancelToken, uri: &str) -> Result<Schema, LoadError> {
        cancel.check()?;

        let url = Url::parse(uri).map_err(|_| LoadError::UnsupportedUri(uri.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(LoadError::UnsupportedUri(uri.to_string()));
        }

        let network = |source| LoadError::Network {
            url: uri.to_string(),
            source,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(network)?;
        let response = client.get(url).send().map_err(network)?;
        let response = response.error_for_status().map_err(network)?;

        cancel.check()?;
        response.json().map_err(network)
    }
}

/// Serves every resource embedded in one root document, keyed by the URIs
/// the identifier engine assigns, before delegating elsewhere.
///
/// Construction prefetches a detached clone of each embedded resource
/// root. Lookup never touches the original document again.
pub struct LocalLoader {
    identifiers: IdentifierMap,
    prefetched: BTreeMap<String, Schema>,
    fallback: Option<Arc<dyn SchemaLoader>>,
}

impl LocalLoader {
    /// Builds a local loader over `root` with no outer loader: URIs not
    /// embedded in `root` report [`LoadError::NotFound`].
    pub fn new(root: &Schema, cancel: &CancelToken) -> Result<Self, Cancelled> {
        LocalLoader::build(root, None, None, cancel)
    }

    /// Builds a local loader that delegates non-embedded URIs to
    /// `fallback`.
    pub fn with_fallback(
        root: &Schema,
        fallback: Arc<dyn SchemaLoader>,
        cancel: &CancelToken,
    ) -> Result<Self, Cancelled> {
        LocalLoader::build(root, None, Some(fallback), cancel)
    }

    pub(crate) fn build(
        root: &Schema,
        base_override: Option<&str>,
        fallback: Option<Arc<dyn SchemaLoader>>,
        cancel: &CancelToken,
    ) -> Result<Self, Cancelled> {
        // Retrieval context can supply the document base (e.g. the URI an
        // external loader fetched it from); inner identifiers resolve
        // against it.
        let mut identifiers = match base_override {
            Some(base) if root.id() != Some(base) => {
                let mut effective = root.clone();
                if let Some(obj) = effective.as_object_mut() {
                    obj.id = Some(base.to_string());
                }
                compute_identifiers_with(&effective, cancel)?
            }
            _ => compute_identifiers_with(root, cancel)?,
        };

        // Synthesize the record for the document root itself. Documents
        // without any base keep an empty one so their plain-name anchors
        // still resolve.
        let root_base = base_override
            .map(str::to_string)
            .or_else(|| root.id().map(|id| crate::uri::resolve_uri(None, id)))
            .unwrap_or_default();
        identifiers.insert(
            "/".to_string(),
            Identifiers {
                base_uri: root_base.clone(),
                canonical_plain_uri: root.anchor().map(|a| format!("{root_base}#{a}")),
                canonical_pointer_uri: format!("{root_base}#"),
                enclosing_resource_uris: Vec::new(),
            },
        );

        let mut prefetched = BTreeMap::new();
        for (pointer, record) in &identifiers {
            if record.canonical_pointer_uri == format!("{}#", record.base_uri) {
                if let Some(resource) = root.at_pointer(pointer) {
                    prefetched.insert(record.base_uri.clone(), resource.clone());
                }
            }
        }

        Ok(LocalLoader {
            identifiers,
            prefetched,
            fallback,
        })
    }

    /// The identifier map this loader serves, including the synthesized
    /// record for the document root at pointer `"/"`.
    pub fn identifiers(&self) -> &IdentifierMap {
        &self.identifiers
    }

    /// Whether `uri` addresses a resource embedded in this document,
    /// either by plain-name anchor or by resource base URI.
    pub fn contains(&self, uri: &str) -> bool {
        let (base, _) = split_fragment(uri);
        self.identifiers.values().any(|record| {
            record.canonical_plain_uri.as_deref() == Some(uri)
                || (record.base_uri == base
                    && record.canonical_pointer_uri == format!("{}#", record.base_uri))
        })
    }

    /// Looks up `uri`.
    ///
    /// On an embedded hit the caller's URI is rewritten in place to the
    /// residual pointer fragment inside the returned resource (empty when
    /// the URI named the resource root itself) and a detached clone of the
    /// prefetched resource is returned. Unknown URIs go to the fallback
    /// loader, or fail with [`LoadError::NotFound`].
    pub fn load(&self, cancel: &CancelToken, uri: &mut String) -> Result<Schema, LoadError> {
        cancel.check()?;

        let mut base: Option<&str> = None;
        let mut residual: Option<String> = None;

        // First pass: plain-name anchors. The residual is the canonical
        // pointer of the anchored subschema within its resource.
        for record in self.identifiers.values() {
            if record.canonical_plain_uri.as_deref() == Some(uri.as_str()) {
                base = Some(&record.base_uri);
                let (_, fragment) = split_fragment(&record.canonical_pointer_uri);
                residual = fragment.map(str::to_string);
                break;
            }
        }

        // Second pass: resource roots by base URI; the query's own
        // fragment is carried as the residual.
        if base.is_none() {
            let (stripped, fragment) = split_fragment(uri);
            for record in self.identifiers.values() {
                if record.base_uri == stripped
                    && record.canonical_pointer_uri == format!("{}#", record.base_uri)
                {
                    base = Some(&record.base_uri);
                    residual = fragment.map(str::to_string);
                    break;
                }
            }
        }

        if let Some(base) = base {
            return match self.prefetched.get(base) {
                Some(schema) => {
                    let schema = schema.clone();
                    *uri = match residual {
                        Some(r) if !r.is_empty() => format!("#{r}"),
                        _ => String::new(),
                    };
                    Ok(schema)
                }
                None => Err(LoadError::NotFound(uri.clone())),
            };
        }

        match &self.fallback {
            Some(loader) => loader.load(cancel, uri),
            None => Err(LoadError::NotFound(uri.clone())),
        }
    }
}
