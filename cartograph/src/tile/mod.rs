//! The tile pipeline: addressing, decoded payloads, the shared cache, and
//! the scheduler that drives them from the camera.

pub mod cache;
pub mod id;
pub mod manager;
pub mod source;
pub mod tile;

pub use cache::{TileCache, TileCacheLimits, TileKey};
pub use id::TileId;
pub use manager::{ClientTileSource, TileManager, TileManagerConfig};
pub use source::{TileFormat, TileSource, TileSourceConfig, UrlTileSource};
pub use tile::{Tile, TileGeometry};
