//! The decoded, ready-to-draw payload of one tile.

use crate::decoded_image::DecodedImage;
use crate::tile::id::TileId;
use cartograph_mvt::MvtTile;
use geojson::GeoJson;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Decoded payload, tagged by the format it came from. Dispatch on the tag
/// replaces the inheritance hierarchy a virtual-dispatch `TileSource`
/// variant set would use in an OO source.
#[derive(Debug, Clone)]
pub enum TileGeometry {
    /// Mapbox Vector Tile layers.
    Mvt(Arc<MvtTile>),
    /// Parsed GeoJSON document.
    GeoJson(Arc<GeoJson>),
    /// Decoded raster image.
    Raster(Arc<DecodedImage>),
}

impl TileGeometry {
    /// Approximate resident size in bytes, used by the tile cache's byte cap.
    pub fn memory_usage(&self) -> usize {
        match self {
            TileGeometry::Mvt(tile) => tile
                .layers
                .iter()
                .map(|layer| layer.features.len() * 256 + layer.name.len())
                .sum::<usize>()
                .max(1024),
            TileGeometry::GeoJson(doc) => doc.to_string().len().max(1024),
            TileGeometry::Raster(image) => image.bytes().len(),
        }
    }
}

/// A decoded tile, shared between the [`super::cache::TileCache`] and the
/// tile manager's active set. Shared ownership (`Arc`) outside the cache is
/// exactly the "pinned" condition the cache's eviction policy checks for.
#[derive(Debug)]
pub struct Tile {
    /// The source this tile was decoded for.
    pub source_id: String,
    /// This tile's coordinate.
    pub id: TileId,
    /// Decoded geometry.
    pub geometry: TileGeometry,
    last_used_frame: AtomicU64,
}

impl Tile {
    /// Builds a tile, marking it used as of `frame`.
    pub fn new(source_id: impl Into<String>, id: TileId, geometry: TileGeometry, frame: u64) -> Self {
        Self {
            source_id: source_id.into(),
            id,
            geometry,
            last_used_frame: AtomicU64::new(frame),
        }
    }

    /// Approximate resident size in bytes.
    pub fn memory_usage(&self) -> usize {
        self.geometry.memory_usage()
    }

    /// The frame counter this tile was last marked visible or used as a
    /// proxy at.
    pub fn last_used_frame(&self) -> u64 {
        self.last_used_frame.load(Ordering::Relaxed)
    }

    /// Marks this tile used as of `frame`, for LRU promotion.
    pub fn touch(&self, frame: u64) {
        self.last_used_frame.fetch_max(frame, Ordering::Relaxed);
    }
}
