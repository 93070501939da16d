//! An import-graph node: one fetched-and-parsed scene document, plus the
//! bookkeeping the importer needs to merge it into the root tree.

use crate::archive::Archive;
use crate::scene::document::Path as CandidatePath;
use crate::url::Url;
use serde_yaml::Value;
use std::sync::Arc;

/// One node of the import graph.
///
/// Created empty (a placeholder) the moment its URL is first enqueued, so
/// duplicate fetches of the same URL are never scheduled; populated once its
/// bytes arrive and parse.
pub struct SceneNode {
    /// The URL this node was fetched from.
    pub url: Url,
    /// The parsed document tree, with its `import` field already removed.
    pub document: Value,
    /// Resolved, absolute URLs of this document's imports, in document order.
    pub imports: Vec<Url>,
    /// Paths (within `document`) of scalars that are texture-reference
    /// candidates.
    pub texture_candidates: Vec<CandidatePath>,
    /// If this document's URL (or the archive it was resolved from) is a
    /// zip archive, the opened archive — kept alive so later `zip://` entry
    /// fetches for textures resolve without re-downloading.
    pub archive: Option<Arc<Archive>>,
}

impl SceneNode {
    /// Builds a node from an already-parsed document.
    pub fn new(url: Url, document: Value, imports: Vec<Url>) -> Self {
        let texture_candidates = crate::scene::document::collect_texture_candidates(&document);
        Self {
            url,
            document,
            imports,
            texture_candidates,
            archive: None,
        }
    }

    /// Attaches the archive this document was read from, if any.
    pub fn with_archive(mut self, archive: Arc<Archive>) -> Self {
        self.archive = Some(archive);
        self
    }
}
