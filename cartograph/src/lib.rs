//! Cartograph is the scene-assembly and tile-pipeline core of a vector map
//! rendering engine: it ingests a declarative, multi-document scene
//! description, coordinates concurrent fetching/decoding/caching of tiled
//! vector data against a live camera view, and hands ready-to-draw tile
//! geometry to an external renderer.
//!
//! # Quick start
//!
//! ```no_run
//! use cartograph::{Map, TileManagerConfig};
//! use cartograph::platform::PlatformServiceImpl;
//! use cartograph::scene::SceneOptions;
//! use cartograph::tile::TileCache;
//! use cartograph::url::Url;
//! use cartograph::view::View;
//! use cartograph_types::cartesian::{NewCartesianPoint2d, Point2d, Size};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let view = View::new(Point2d::new(0.0, 0.0), 2.0, Size::new(1024.0, 768.0));
//! let platform = Arc::new(PlatformServiceImpl::new());
//! let cache = Arc::new(TileCache::new(Default::default()));
//! let mut map = Map::new(view, platform, cache, TileManagerConfig::default(), None);
//!
//! map.load_scene(SceneOptions::new(Url::parse("https://example.com/scene.yaml")?), true);
//! map.update(Duration::from_millis(16));
//! map.render();
//! # Ok(())
//! # }
//! ```
//!
//! # Main components
//!
//! * [`Map`] is the single public entry point: it owns the camera [`view::View`]
//!   and a [`scene::lifecycle::SceneLifecycle`], and sequences `update`/`render` ticks.
//! * A [`scene::Scene`] is the assembled, ready-to-render state of one
//!   stylesheet: its [`scene::importer::Importer`] merges a multi-document
//!   scene description into one tree, from which the scene's
//!   [`tile::TileSource`]s and [`tile::TileManager`] are built.
//! * The [`tile::TileManager`] is the camera-driven scheduler that computes
//!   the visible tile set for each source, drives loads, fills gaps with
//!   proxy tiles, and retires stale entries every frame.
//! * The [`tile::TileCache`] is the bounded, reference-counted cache shared
//!   by every scene built through one [`Map`].
//! * [`platform::PlatformService`] is the abstract URL-transport/render
//!   contract the core consumes; [`platform::native::NativePlatformService`]
//!   is the `reqwest`-backed implementation used outside of tests.
//!
//! Rendering primitives, GPU state management, gesture handling, platform
//! windowing, glyph rasterization, and declarative-style-to-shader code
//! generation are external collaborators, out of scope for this crate.

pub(crate) mod async_runtime;
pub mod archive;
pub mod debug_flags;
pub mod decoded_image;
pub mod error;
pub mod map;
pub mod messenger;
pub mod platform;
pub mod scene;
pub mod tile;
pub mod url;
pub mod view;
pub mod work_pool;

// Reexport cartograph_types so downstream crates don't need a separate
// dependency just to name `Point2d`/`Size`/`Crs` in their own signatures.
pub use cartograph_types;

pub use error::CartographError;
pub use map::{Map, MapState, PickResult};
pub use messenger::{DummyMessenger, Messenger};
pub use scene::{Scene, SceneError, SceneId, SceneOptions};
pub use tile::{Tile, TileCache, TileCacheLimits, TileId, TileManager, TileManagerConfig, TileSource};
pub use view::View;
