//! Recursive, cycle-safe merger of a scene's `import` graph into one tree.

use crate::archive::Archive;
use crate::error::CartographError;
use crate::platform::{PlatformService, RequestHandle};
use crate::scene::document::{
    self, deep_merge, get_at_path, get_at_path_mut, take_import_field, Path as CandidatePath, Step,
};
use crate::scene::node::SceneNode;
use crate::scene::SceneOptions;
use crate::url::Url;
use crate::work_pool::WorkerPool;
use bytes::Bytes;
use serde_yaml::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Counters reported alongside the merged tree, purely for logging.
#[derive(Debug, Default, Clone)]
pub struct ImporterMetrics {
    /// Number of documents successfully fetched and parsed.
    pub documents_fetched: u32,
    /// Number of documents that failed to parse or fetch.
    pub parse_errors: u32,
    /// Number of redundant or cyclic import edges skipped.
    pub cycles_skipped: u32,
}

/// Outcome of a full `Importer::load` call.
pub struct ImportResult {
    /// The merged document tree (empty if cancelled or the root failed).
    pub document: Value,
    /// Fetch/parse counters.
    pub metrics: ImporterMetrics,
    /// Per-URL errors encountered while importing.
    pub errors: Vec<(Url, String)>,
    /// True if the load was cancelled before completion.
    pub cancelled: bool,
}

#[derive(Default)]
struct FetchState {
    nodes: HashMap<Url, SceneNode>,
    archives: HashMap<Url, Arc<Archive>>,
    known: HashSet<Url>,
    in_flight: u32,
    errors: Vec<(Url, String)>,
    metrics: ImporterMetrics,
    /// Handles for requests currently in flight, keyed by the url they were
    /// issued for. Drained and cancelled if the load is cancelled before they
    /// complete.
    handles: HashMap<Url, RequestHandle>,
}

struct Shared {
    state: Mutex<FetchState>,
    condvar: Condvar,
    cancel: Arc<AtomicBool>,
}

/// Builds one merged document tree out of a root scene document and its
/// (possibly cyclic, possibly zip-archived) `import` graph.
///
/// Runs its blocking wait loop on whichever thread calls `load` — intended
/// to be the ordered scene worker, never the main thread.
#[derive(Clone)]
pub struct Importer {
    platform: Arc<dyn PlatformService>,
    decode_pool: WorkerPool,
}

impl Importer {
    /// Creates an importer that fetches over `platform` and decodes zip
    /// entries on `decode_pool`.
    pub fn new(platform: Arc<dyn PlatformService>, decode_pool: WorkerPool) -> Self {
        Self {
            platform,
            decode_pool,
        }
    }

    /// Runs the importer to completion. Blocks the calling thread on a
    /// condition variable while fetches are outstanding; wakes on each
    /// completion or when `cancel` is flipped.
    pub fn load(&self, options: &SceneOptions, cancel: Arc<AtomicBool>) -> ImportResult {
        let shared = Arc::new(Shared {
            state: Mutex::new(FetchState::default()),
            condvar: Condvar::new(),
            cancel,
        });

        match options.inline_document.as_deref() {
            Some(text) => self.seed_inline(&shared, &options.root_url, text),
            None => self.enqueue(&shared, options.root_url.clone()),
        }

        {
            let mut guard = shared.state.lock().expect("importer state mutex poisoned");
            while !shared.cancel.load(Ordering::Acquire) && guard.in_flight > 0 {
                guard = shared
                    .condvar
                    .wait(guard)
                    .expect("importer state mutex poisoned");
            }
        }

        let (nodes, errors, metrics, cancelled, handles) = {
            let mut guard = shared.state.lock().expect("importer state mutex poisoned");
            (
                std::mem::take(&mut guard.nodes),
                std::mem::take(&mut guard.errors),
                std::mem::take(&mut guard.metrics),
                shared.cancel.load(Ordering::Acquire),
                std::mem::take(&mut guard.handles),
            )
        };

        if cancelled {
            for handle in handles.into_values() {
                self.platform.cancel_url_request(handle);
            }
            return ImportResult {
                document: Value::Null,
                metrics,
                errors,
                cancelled: true,
            };
        }

        let mut visited = HashSet::new();
        let mut rewrite_sites = HashMap::new();
        let mut metrics = metrics;
        let merged = merge_recursive(
            &options.root_url,
            &nodes,
            &mut visited,
            &mut rewrite_sites,
            &mut metrics.cycles_skipped,
        );
        let merged = resolve_texture_candidates(merged, &rewrite_sites);

        ImportResult {
            document: merged,
            metrics,
            errors,
            cancelled: false,
        }
    }

    fn seed_inline(&self, shared: &Arc<Shared>, root_url: &Url, text: &str) {
        match serde_yaml::from_str::<Value>(text) {
            Ok(mut doc) => {
                let imports = resolve_imports(&mut doc, root_url);
                for import in &imports {
                    self.enqueue(shared, import.clone());
                }
                let node = SceneNode::new(root_url.clone(), doc, imports);
                let mut guard = shared.state.lock().expect("importer state mutex poisoned");
                guard.metrics.documents_fetched += 1;
                guard.nodes.insert(root_url.clone(), node);
            }
            Err(err) => {
                let mut guard = shared.state.lock().expect("importer state mutex poisoned");
                guard.metrics.parse_errors += 1;
                guard.errors.push((root_url.clone(), err.to_string()));
            }
        }
    }

    fn enqueue(&self, shared: &Arc<Shared>, url: Url) {
        {
            let mut guard = shared.state.lock().expect("importer state mutex poisoned");
            if !guard.known.insert(url.clone()) {
                return;
            }
            guard.in_flight += 1;
        }
        self.spawn_fetch(shared.clone(), url);
    }

    fn complete_fetch(
        &self,
        shared: &Arc<Shared>,
        url: Url,
        outcome: Result<(Value, Vec<Url>, Option<Arc<Archive>>), CartographError>,
    ) {
        if let Ok((_, imports, _)) = &outcome {
            for import in imports {
                self.enqueue(shared, import.clone());
            }
        }

        let mut guard = shared.state.lock().expect("importer state mutex poisoned");
        guard.handles.remove(&url);
        match outcome {
            Ok((doc, imports, archive)) => {
                guard.metrics.documents_fetched += 1;
                if let Some(archive) = &archive {
                    guard.archives.insert(url.clone(), archive.clone());
                }
                let mut node = SceneNode::new(url.clone(), doc, imports);
                if let Some(archive) = archive {
                    node = node.with_archive(archive);
                }
                guard.nodes.insert(url.clone(), node);
            }
            Err(err) => {
                guard.metrics.parse_errors += 1;
                log::warn!("scene import of {url} failed: {err}");
                guard.errors.push((url.clone(), err.to_string()));
            }
        }
        guard.in_flight -= 1;
        drop(guard);
        shared.condvar.notify_all();
    }

    fn spawn_fetch(&self, shared: Arc<Shared>, url: Url) {
        if url.scheme() == "zip" {
            let importer = self.clone();
            let decode_pool = self.decode_pool.clone();
            crate::async_runtime::spawn(async move {
                let outcome = fetch_zip_entry(&shared, &decode_pool, &url).await;
                importer.complete_fetch(&shared, url, outcome);
            });
            return;
        }

        if url.is_zip_archive() {
            let importer = self.clone();
            let decode_pool = self.decode_pool.clone();
            let cb_url = url.clone();
            let shared_for_handle = shared.clone();
            let handle = self.platform.start_url_request(
                &url,
                Box::new(move |result| {
                    let cb_importer = importer.clone();
                    let cb_shared = shared.clone();
                    let cb_decode_pool = decode_pool.clone();
                    let cb_url2 = cb_url.clone();
                    crate::async_runtime::spawn(async move {
                        let outcome = match result {
                            Ok(bytes) => open_zip_archive(&cb_decode_pool, cb_url2.clone(), bytes).await,
                            Err(err) => Err(err),
                        };
                        cb_importer.complete_fetch(&cb_shared, cb_url2, outcome);
                    });
                }),
            );
            shared_for_handle
                .state
                .lock()
                .expect("importer state mutex poisoned")
                .handles
                .insert(url, handle);
            return;
        }

        let importer = self.clone();
        let cb_url = url.clone();
        let shared_for_handle = shared.clone();
        let handle = self.platform.start_url_request(
            &url,
            Box::new(move |result| {
                let outcome = result.and_then(|bytes| parse_document(&cb_url, &bytes));
                importer.complete_fetch(&shared, cb_url, outcome);
            }),
        );
        shared_for_handle
            .state
            .lock()
            .expect("importer state mutex poisoned")
            .handles
            .insert(url, handle);
    }
}

async fn open_zip_archive(
    decode_pool: &WorkerPool,
    url: Url,
    bytes: Bytes,
) -> Result<(Value, Vec<Url>, Option<Arc<Archive>>), CartographError> {
    let raw = bytes.to_vec();
    let archive = decode_pool.run(move || Archive::open(raw)).await??;
    let archive = Arc::new(archive);

    let base_entry = archive.base_document().cloned().ok_or_else(|| {
        CartographError::Zip(format!("no base yaml document found in {}", url.string()))
    })?;

    let archive_for_decode = archive.clone();
    let entry_bytes = decode_pool
        .run(move || {
            let mut out = Vec::new();
            archive_for_decode
                .decompress_entry(&base_entry, &mut out)
                .map(|_| out)
        })
        .await??;

    let mut doc: Value = serde_yaml::from_reader(entry_bytes.as_slice())?;
    let archive_root = Url::entry_url_for(&url, "")?;
    let imports = resolve_imports(&mut doc, &archive_root);

    Ok((doc, imports, Some(archive)))
}

async fn fetch_zip_entry(
    shared: &Arc<Shared>,
    decode_pool: &WorkerPool,
    url: &Url,
) -> Result<(Value, Vec<Url>, Option<Arc<Archive>>), CartographError> {
    let archive_url = url.archive_url_for_entry()?;
    let archive = {
        let guard = shared.state.lock().expect("importer state mutex poisoned");
        guard.archives.get(&archive_url).cloned()
    }
    .ok_or_else(|| CartographError::Zip(format!("archive {archive_url} not open yet")))?;

    let entry_path = url.entry_path()?;
    let entry = archive
        .find_entry(&entry_path)
        .cloned()
        .ok_or(CartographError::NotFound)?;

    let archive_for_decode = archive.clone();
    let entry_bytes = decode_pool
        .run(move || {
            let mut out = Vec::new();
            archive_for_decode.decompress_entry(&entry, &mut out).map(|_| out)
        })
        .await??;

    let mut doc: Value = serde_yaml::from_reader(entry_bytes.as_slice())?;
    let archive_root = Url::entry_url_for(&archive_url, "")?;
    let imports = resolve_imports(&mut doc, &archive_root);

    Ok((doc, imports, Some(archive)))
}

fn parse_document(
    url: &Url,
    bytes: &Bytes,
) -> Result<(Value, Vec<Url>, Option<Arc<Archive>>), CartographError> {
    let mut doc: Value = serde_yaml::from_reader(bytes.as_ref())?;
    let imports = resolve_imports(&mut doc, url);
    Ok((doc, imports, None))
}

fn resolve_imports(doc: &mut Value, base: &Url) -> Vec<Url> {
    take_import_field(doc)
        .into_iter()
        .filter_map(|raw| match base.resolve(&raw) {
            Ok(url) => Some(url),
            Err(err) => {
                log::warn!("failed to resolve import {raw:?} against {base}: {err}");
                None
            }
        })
        .collect()
}

/// Depth-first post-order merge: children merge first, then the node's own
/// document overlays on top (parent-overwrites-child), matching
/// deep-merge([..., furthest ancestor first, ..., root last]).
fn merge_recursive(
    url: &Url,
    nodes: &HashMap<Url, SceneNode>,
    visited: &mut HashSet<Url>,
    rewrite_sites: &mut HashMap<CandidatePath, Url>,
    cycles_skipped: &mut u32,
) -> Value {
    if visited.contains(url) {
        *cycles_skipped += 1;
        return Value::Null;
    }
    visited.insert(url.clone());

    let Some(node) = nodes.get(url) else {
        return Value::Null;
    };

    let mut acc = Value::Null;
    for child in &node.imports {
        let child_merged = merge_recursive(child, nodes, visited, rewrite_sites, cycles_skipped);
        acc = deep_merge(acc, child_merged);
    }

    for path in &node.texture_candidates {
        rewrite_sites.insert(path.clone(), node.url.clone());
    }

    deep_merge(acc, node.document.clone())
}

fn resolve_texture_candidates(mut doc: Value, rewrite_sites: &HashMap<CandidatePath, Url>) -> Value {
    let texture_names: HashSet<String> =
        match get_at_path(&doc, &[Step::Key("textures".into())]) {
            Some(Value::Mapping(map)) => map
                .keys()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect(),
            _ => HashSet::new(),
        };

    for (path, base_url) in rewrite_sites {
        let Some(current) = get_at_path(&doc, path) else {
            continue;
        };
        let Some(scalar) = current.as_str() else {
            continue;
        };
        if texture_names.contains(scalar) {
            continue;
        }
        if !document::is_texture_candidate_scalar(current) {
            continue;
        }

        if let Ok(resolved) = base_url.resolve(scalar) {
            if let Some(slot) = get_at_path_mut(&mut doc, path) {
                *slot = Value::String(resolved.string());
            }
        }
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{RequestHandle, UrlRequestCallback};
    use std::collections::HashMap as StdHashMap;

    struct FakePlatform {
        documents: StdHashMap<String, String>,
    }

    impl PlatformService for FakePlatform {
        fn start_url_request(&self, url: &Url, callback: UrlRequestCallback) -> RequestHandle {
            let handle = RequestHandle::next();
            let result = match self.documents.get(&url.string()) {
                Some(body) => Ok(Bytes::from(body.clone())),
                None => Err(CartographError::NotFound),
            };
            callback(result);
            handle
        }

        fn cancel_url_request(&self, _handle: RequestHandle) {}
        fn request_render(&self) {}
        fn set_continuous_rendering(&self, _continuous: bool) {}
        fn shutdown(&self) {}
    }

    fn importer_with(docs: &[(&str, &str)]) -> Importer {
        let documents = docs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let platform = Arc::new(FakePlatform { documents });
        Importer::new(platform, WorkerPool::new(2))
    }

    fn load(importer: &Importer, root: &str) -> ImportResult {
        let options = SceneOptions::new(Url::parse(root).unwrap());
        importer.load(&options, Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn linear_chain_merges_in_import_order() {
        let importer = importer_with(&[
            ("https://example.com/root.yaml", "import: a.yaml\nroot_only: true"),
            ("https://example.com/a.yaml", "import: b.yaml\na_only: true\nshared: a"),
            ("https://example.com/b.yaml", "b_only: true\nshared: b"),
        ]);

        let result = load(&importer, "https://example.com/root.yaml");
        assert_eq!(result.errors.len(), 0);
        assert_eq!(result.document["root_only"], Value::Bool(true));
        assert_eq!(result.document["a_only"], Value::Bool(true));
        assert_eq!(result.document["b_only"], Value::Bool(true));
        assert_eq!(result.document["shared"], Value::String("a".into()));
    }

    #[test]
    fn diamond_import_is_merged_once() {
        let importer = importer_with(&[
            ("https://example.com/root.yaml", "import: [a.yaml, b.yaml]"),
            ("https://example.com/a.yaml", "import: c.yaml\nvia: a"),
            ("https://example.com/b.yaml", "import: c.yaml\nvia: b"),
            ("https://example.com/c.yaml", "only_in_c: true"),
        ]);

        let result = load(&importer, "https://example.com/root.yaml");
        assert_eq!(result.document["only_in_c"], Value::Bool(true));
        assert_eq!(result.document["via"], Value::String("b".into()));
        assert_eq!(result.metrics.documents_fetched, 4);
    }

    #[test]
    fn cyclic_import_terminates() {
        let importer = importer_with(&[
            ("https://example.com/root.yaml", "import: a.yaml\nroot_val: 1"),
            ("https://example.com/a.yaml", "import: root.yaml\na_val: 2"),
        ]);

        let result = load(&importer, "https://example.com/root.yaml");
        assert_eq!(result.document["root_val"], Value::from(1));
        assert_eq!(result.document["a_val"], Value::from(2));
    }

    #[test]
    fn named_texture_reference_is_left_unchanged() {
        let importer = importer_with(&[(
            "https://example.com/root.yaml",
            r#"
            textures:
              pois:
                url: "icons/poi.png"
            styles:
              markers:
                texture: pois
            "#,
        )]);

        let result = load(&importer, "https://example.com/root.yaml");
        assert_eq!(
            result.document["styles"]["markers"]["texture"],
            Value::String("pois".into())
        );
    }

    #[test]
    fn unnamed_texture_scalar_is_rewritten_to_absolute_url() {
        let importer = importer_with(&[(
            "https://example.com/styles/root.yaml",
            r#"
            styles:
              buildings:
                texture: "../img/wall.png"
            "#,
        )]);

        let result = load(&importer, "https://example.com/styles/root.yaml");
        assert_eq!(
            result.document["styles"]["buildings"]["texture"],
            Value::String("https://example.com/img/wall.png".into())
        );
    }
}
