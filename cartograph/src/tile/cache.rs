//! Bounded, reference-counted tile cache.
//!
//! A weighted `Cache` evicts by its own CLOCK-like policy and has no hook to
//! veto evicting a particular key — but the pinning invariant here needs
//! exactly that: a tile held by an outside `Arc` must never be evicted, even
//! past the caps. So this cache is a small hand-rolled recency list instead:
//! byte accounting plus an `Arc::strong_count` pin check, without a
//! weighted-cache API's "evict unconditionally" assumption.

use crate::tile::id::TileId;
use crate::tile::tile::Tile;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Key a tile is cached under: which source it belongs to, plus its
/// coordinate.
pub type TileKey = (String, TileId);

/// Capacity policy for a [`TileCache`]. Both caps are enforced independently
/// on every insert; least-recently-used, unpinned tiles are evicted until
/// both hold, or until every remaining tile is pinned.
#[derive(Debug, Clone, Copy)]
pub struct TileCacheLimits {
    /// Maximum number of tiles held at once.
    pub max_tiles: usize,
    /// Maximum combined [`Tile::memory_usage`] of all held tiles, in bytes.
    pub max_bytes: usize,
}

impl Default for TileCacheLimits {
    fn default() -> Self {
        Self {
            max_tiles: 512,
            max_bytes: 256 * 1024 * 1024,
        }
    }
}

struct Inner {
    recency: Vec<TileKey>,
    entries: HashMap<TileKey, Arc<Tile>>,
    bytes: usize,
}

/// A bounded LRU cache of decoded tiles, keyed by `(source id, TileID)`.
pub struct TileCache {
    limits: TileCacheLimits,
    inner: Mutex<Inner>,
}

impl TileCache {
    /// Creates an empty cache bounded by `limits`.
    pub fn new(limits: TileCacheLimits) -> Self {
        Self {
            limits,
            inner: Mutex::new(Inner {
                recency: Vec::new(),
                entries: HashMap::new(),
                bytes: 0,
            }),
        }
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    pub fn get(&self, key: &TileKey) -> Option<Arc<Tile>> {
        let mut inner = self.inner.lock();
        let tile = inner.entries.get(key).cloned()?;
        touch_recency(&mut inner.recency, key);
        Some(tile)
    }

    /// Inserts `tile` under `key`, evicting unpinned least-recently-used
    /// entries until both caps hold (or no unpinned entry remains).
    pub fn put(&self, key: TileKey, tile: Arc<Tile>) {
        let mut inner = self.inner.lock();
        if let Some(previous) = inner.entries.remove(&key) {
            inner.bytes = inner.bytes.saturating_sub(previous.memory_usage());
            inner.recency.retain(|k| k != &key);
        }

        inner.bytes += tile.memory_usage();
        inner.entries.insert(key.clone(), tile);
        inner.recency.push(key);

        self.evict_to_fit(&mut inner);
    }

    /// Drops all unpinned tiles. If `drop_pinned` is true, pinned tiles are
    /// dropped too (their last `Arc` is still held by whoever pinned them).
    pub fn clear(&self, drop_pinned: bool) {
        let mut inner = self.inner.lock();
        if drop_pinned {
            inner.entries.clear();
            inner.recency.clear();
            inner.bytes = 0;
            return;
        }

        let keys: Vec<TileKey> = inner.recency.clone();
        for key in keys {
            let Some(tile) = inner.entries.get(&key) else {
                continue;
            };
            if is_pinned(tile) {
                continue;
            }
            let tile = inner.entries.remove(&key).expect("just checked present");
            inner.bytes = inner.bytes.saturating_sub(tile.memory_usage());
            inner.recency.retain(|k| k != &key);
        }
    }

    /// Number of tiles currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// True if the cache holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_to_fit(&self, inner: &mut Inner) {
        let mut i = 0;
        while (inner.entries.len() > self.limits.max_tiles || inner.bytes > self.limits.max_bytes)
            && i < inner.recency.len()
        {
            let key = inner.recency[i].clone();
            let Some(tile) = inner.entries.get(&key) else {
                inner.recency.remove(i);
                continue;
            };

            if is_pinned(tile) {
                i += 1;
                continue;
            }

            let tile = inner.entries.remove(&key).expect("just checked present");
            inner.bytes = inner.bytes.saturating_sub(tile.memory_usage());
            inner.recency.remove(i);
            log::trace!(
                "evicted tile {:?}/{:?} from cache (count={}, bytes={})",
                tile.source_id,
                tile.id,
                inner.entries.len(),
                inner.bytes
            );
        }
    }
}

fn touch_recency(recency: &mut Vec<TileKey>, key: &TileKey) {
    if let Some(pos) = recency.iter().position(|k| k == key) {
        let key = recency.remove(pos);
        recency.push(key);
    }
}

/// A tile is pinned if something outside the cache (the tile manager's
/// active set, an in-flight render) holds a strong reference: the cache's
/// own map entry accounts for exactly one.
fn is_pinned(tile: &Arc<Tile>) -> bool {
    Arc::strong_count(tile) > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::tile::TileGeometry;
    use crate::decoded_image::DecodedImage;

    fn tile(id: TileId, bytes: usize) -> Arc<Tile> {
        Arc::new(Tile::new(
            "src",
            id,
            TileGeometry::Raster(Arc::new(DecodedImage::from_raw(vec![0u8; bytes], 1, 1))),
            0,
        ))
    }

    #[test]
    fn evicts_least_recently_used_past_tile_count_cap() {
        let cache = TileCache::new(TileCacheLimits {
            max_tiles: 2,
            max_bytes: usize::MAX,
        });

        cache.put(("src".into(), TileId::new(0, 0, 0)), tile(TileId::new(0, 0, 0), 16));
        cache.put(("src".into(), TileId::new(0, 1, 0)), tile(TileId::new(0, 1, 0), 16));
        cache.put(("src".into(), TileId::new(0, 2, 0)), tile(TileId::new(0, 2, 0), 16));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&("src".into(), TileId::new(0, 0, 0))).is_none());
        assert!(cache.get(&("src".into(), TileId::new(0, 2, 0))).is_some());
    }

    #[test]
    fn never_evicts_a_pinned_tile() {
        let cache = TileCache::new(TileCacheLimits {
            max_tiles: 1,
            max_bytes: usize::MAX,
        });

        let pinned = tile(TileId::new(0, 0, 0), 16);
        cache.put(("src".into(), TileId::new(0, 0, 0)), pinned.clone());
        cache.put(("src".into(), TileId::new(0, 1, 0)), tile(TileId::new(0, 1, 0), 16));

        assert!(cache.get(&("src".into(), TileId::new(0, 0, 0))).is_some());
        assert_eq!(cache.len(), 2, "pinned tile must survive past the cap");
        drop(pinned);
    }

    #[test]
    fn clear_without_drop_pinned_keeps_pinned_entries() {
        let cache = TileCache::new(TileCacheLimits::default());
        let pinned = tile(TileId::new(0, 0, 0), 16);
        cache.put(("src".into(), TileId::new(0, 0, 0)), pinned.clone());
        cache.put(("src".into(), TileId::new(0, 1, 0)), tile(TileId::new(0, 1, 0), 16));

        cache.clear(false);
        assert_eq!(cache.len(), 1);

        cache.clear(true);
        assert_eq!(cache.len(), 0);
        drop(pinned);
    }

    #[test]
    fn respects_byte_cap_independently_of_tile_count_cap() {
        let cache = TileCache::new(TileCacheLimits {
            max_tiles: 100,
            max_bytes: 32,
        });
        cache.put(("src".into(), TileId::new(0, 0, 0)), tile(TileId::new(0, 0, 0), 16));
        cache.put(("src".into(), TileId::new(0, 1, 0)), tile(TileId::new(0, 1, 0), 16));
        cache.put(("src".into(), TileId::new(0, 2, 0)), tile(TileId::new(0, 2, 0), 16));

        assert!(cache.len() <= 2);
    }
}
