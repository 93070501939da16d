//! Per-layer tile fetching: maps a [`TileId`] to a URL, issues the platform
//! request, decodes the payload on the decode pool, and hands the result
//! back through a callback.

use crate::decoded_image::DecodedImage;
use crate::error::CartographError;
use crate::platform::{PlatformService, RequestHandle};
use crate::tile::id::TileId;
use crate::tile::tile::{Tile, TileGeometry};
use crate::url::Url;
use crate::work_pool::WorkerPool;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use strfmt::strfmt;

/// The wire format a tile source's payloads are decoded from.
///
/// Variant names match the `type` tokens spec'd for a scene document's
/// `sources` entries verbatim (`MVT`, `TopoJSON`, `GeoJSON`, `Raster`) rather
/// than a blanket case transform, since neither all-uppercase nor title-case
/// matches all four consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TileFormat {
    /// Mapbox Vector Tile protobuf.
    #[serde(rename = "MVT")]
    Mvt,
    /// TopoJSON. No decoder ships in this build (no corpus dependency
    /// resolves topology arcs); recognized for configuration compatibility,
    /// decode always fails with [`CartographError::Decoding`].
    #[serde(rename = "TopoJSON")]
    TopoJson,
    /// Plain GeoJSON.
    #[serde(rename = "GeoJSON")]
    GeoJson,
    /// PNG/JPEG raster tile.
    #[serde(rename = "Raster")]
    Raster,
}

/// Declarative configuration for one [`UrlTileSource`], as read from a
/// scene document's `sources` map.
#[derive(Debug, Clone, Deserialize)]
pub struct TileSourceConfig {
    /// Unique id of this source within the scene.
    pub id: String,
    /// Payload format.
    #[serde(rename = "type")]
    pub format: TileFormat,
    /// URL template containing `{z}`, `{x}`, `{y}` and optionally entries of
    /// `url_params`.
    pub url: String,
    /// Additional substitution tokens merged alongside `z`/`x`/`y`.
    #[serde(default)]
    pub url_params: HashMap<String, String>,
    /// Highest zoom level this source serves; higher camera zooms reuse the
    /// tile at `max_zoom` as a proxy.
    pub max_zoom: u32,
}

/// Outcome delivered once per `load_tile` call.
pub type LoadTileResult = Result<Arc<Tile>, CartographError>;

/// A callback invoked once with the decoded tile or the error that
/// prevented it.
pub type LoadTileCallback = Box<dyn FnOnce(LoadTileResult) + Send>;

/// Per-logical-layer tile fetcher.
pub trait TileSource: Send + Sync {
    /// This source's unique id.
    fn id(&self) -> &str;

    /// Highest zoom level this source serves.
    fn max_zoom(&self) -> u32;

    /// Resolves `tile`'s URL, issues the platform request, decodes the
    /// response on the decode pool, and delivers exactly one outcome to
    /// `callback`. At most one fetch per `TileId` is ever in flight:
    /// calling this again for a `TileId` already loading is a no-op other
    /// than registering `callback` to also receive the eventual outcome.
    fn load_tile(&self, tile: TileId, callback: LoadTileCallback);

    /// Cancels the in-flight fetch for `tile`, if any. The platform's
    /// cancellation is advisory; a callback may still fire afterwards.
    fn cancel_tile(&self, tile: TileId);

    /// Drops all source-side bookkeeping (in-flight registrations). Does
    /// not touch the shared tile cache.
    fn clear_data(&self);
}

enum LoadState {
    Loading {
        handle: Option<RequestHandle>,
        waiters: Vec<LoadTileCallback>,
    },
}

/// State shared between `UrlTileSource` and the closures its fetches spawn.
/// Split out from `UrlTileSource` itself so a fetch's continuation can hold
/// an `Arc` to exactly what it needs instead of borrowing the source.
struct SourceState {
    config: TileSourceConfig,
    platform: Arc<dyn PlatformService>,
    decode_pool: WorkerPool,
    in_flight: Mutex<HashMap<TileId, LoadState>>,
}

impl SourceState {
    fn resolve_url(&self, tile: TileId) -> Result<Url, CartographError> {
        let mut vars: HashMap<String, String> = self.config.url_params.clone();
        vars.insert("z".to_string(), tile.z.to_string());
        vars.insert("x".to_string(), tile.x.to_string());
        vars.insert("y".to_string(), tile.y.to_string());

        let resolved = strfmt(&self.config.url, &vars)
            .map_err(|err| CartographError::InvalidUrl(format!("{}: {err}", self.config.url)))?;
        Url::parse(&resolved)
    }

    fn finish(&self, tile: TileId, outcome: LoadTileResult) {
        let waiters = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.remove(&tile) {
                Some(LoadState::Loading { waiters, .. }) => waiters,
                None => Vec::new(),
            }
        };

        for waiter in waiters {
            let cloned = match &outcome {
                Ok(tile) => Ok(tile.clone()),
                Err(err) => Err(clone_error(err)),
            };
            waiter(cloned);
        }
    }
}

fn clone_error(err: &CartographError) -> CartographError {
    CartographError::Generic(err.to_string())
}

/// [`TileSource`] backed by a URL template, fetched through a
/// [`PlatformService`] and decoded on a [`WorkerPool`].
pub struct UrlTileSource {
    state: Arc<SourceState>,
}

impl UrlTileSource {
    /// Creates a source fetching over `platform` and decoding on
    /// `decode_pool`.
    pub fn new(config: TileSourceConfig, platform: Arc<dyn PlatformService>, decode_pool: WorkerPool) -> Self {
        Self {
            state: Arc::new(SourceState {
                config,
                platform,
                decode_pool,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl TileSource for UrlTileSource {
    fn id(&self) -> &str {
        &self.state.config.id
    }

    fn max_zoom(&self) -> u32 {
        self.state.config.max_zoom
    }

    fn load_tile(&self, tile: TileId, callback: LoadTileCallback) {
        {
            let mut in_flight = self.state.in_flight.lock();
            if let Some(LoadState::Loading { waiters, .. }) = in_flight.get_mut(&tile) {
                waiters.push(callback);
                return;
            }
            in_flight.insert(
                tile,
                LoadState::Loading {
                    handle: None,
                    waiters: vec![callback],
                },
            );
        }

        let url = match self.state.resolve_url(tile) {
            Ok(url) => url,
            Err(err) => {
                self.state.finish(tile, Err(err));
                return;
            }
        };

        let format = self.state.config.format;
        let source_id = self.state.config.id.clone();
        let state = self.state.clone();

        let handle = self.state.platform.start_url_request(
            &url,
            Box::new(move |result| {
                let state = state.clone();
                let source_id = source_id.clone();
                crate::async_runtime::spawn(async move {
                    let outcome = match result {
                        Ok(bytes) => decode_payload(&state.decode_pool, &source_id, tile, format, bytes).await,
                        Err(err) => Err(err),
                    };
                    state.finish(tile, outcome);
                });
            }),
        );

        if let Some(LoadState::Loading { handle: slot, .. }) = self.state.in_flight.lock().get_mut(&tile) {
            *slot = Some(handle);
        }
    }

    fn cancel_tile(&self, tile: TileId) {
        let handle = {
            let in_flight = self.state.in_flight.lock();
            match in_flight.get(&tile) {
                Some(LoadState::Loading { handle, .. }) => *handle,
                None => None,
            }
        };
        if let Some(handle) = handle {
            self.state.platform.cancel_url_request(handle);
        }
    }

    fn clear_data(&self) {
        self.state.in_flight.lock().clear();
    }
}

async fn decode_payload(
    decode_pool: &WorkerPool,
    source_id: &str,
    tile: TileId,
    format: TileFormat,
    bytes: Bytes,
) -> LoadTileResult {
    let source_id = source_id.to_string();
    let geometry = decode_pool
        .run(move || decode_geometry(format, &bytes))
        .await??;
    Ok(Arc::new(Tile::new(source_id, tile, geometry, 0)))
}

fn decode_geometry(format: TileFormat, bytes: &Bytes) -> Result<TileGeometry, CartographError> {
    match format {
        TileFormat::Mvt => {
            let mvt = cartograph_mvt::MvtTile::decode(bytes.clone(), true)?;
            Ok(TileGeometry::Mvt(Arc::new(mvt)))
        }
        TileFormat::GeoJson => {
            let text = std::str::from_utf8(bytes)
                .map_err(|err| CartographError::Generic(format!("invalid utf-8 geojson: {err}")))?;
            let doc: geojson::GeoJson = text
                .parse()
                .map_err(|err| CartographError::Generic(format!("invalid geojson: {err}")))?;
            Ok(TileGeometry::GeoJson(Arc::new(doc)))
        }
        TileFormat::Raster => {
            let image = DecodedImage::new(bytes)?;
            Ok(TileGeometry::Raster(Arc::new(image)))
        }
        TileFormat::TopoJson => Err(CartographError::Generic(
            "topojson decoding is not implemented".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::UrlRequestCallback;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc;

    struct FakePlatform {
        requests_started: AtomicU32,
        body: Bytes,
        last_url: Mutex<Option<String>>,
    }

    impl PlatformService for FakePlatform {
        fn start_url_request(&self, url: &Url, callback: UrlRequestCallback) -> RequestHandle {
            self.requests_started.fetch_add(1, Ordering::SeqCst);
            *self.last_url.lock() = Some(url.string());
            let body = self.body.clone();
            callback(Ok(body));
            RequestHandle::next()
        }
        fn cancel_url_request(&self, _handle: RequestHandle) {}
        fn request_render(&self) {}
        fn set_continuous_rendering(&self, _continuous: bool) {}
        fn shutdown(&self) {}
    }

    fn geojson_bytes() -> Bytes {
        Bytes::from_static(br#"{"type":"FeatureCollection","features":[]}"#)
    }

    fn source_with(platform: Arc<FakePlatform>) -> UrlTileSource {
        UrlTileSource::new(
            TileSourceConfig {
                id: "vector".into(),
                format: TileFormat::GeoJson,
                url: "https://example.com/{z}/{x}/{y}.geojson".into(),
                url_params: HashMap::new(),
                max_zoom: 18,
            },
            platform,
            WorkerPool::new(2),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_loads_for_same_tile_share_one_fetch() {
        let platform = Arc::new(FakePlatform {
            requests_started: AtomicU32::new(0),
            body: geojson_bytes(),
            last_url: Mutex::new(None),
        });
        let source = Arc::new(source_with(platform.clone()));
        let (tx, rx) = mpsc::channel();

        for _ in 0..3 {
            let tx = tx.clone();
            source.load_tile(TileId::new(0, 0, 0), Box::new(move |result| {
                let _ = tx.send(result.is_ok());
            }));
        }

        for _ in 0..3 {
            assert!(rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap());
        }

        assert_eq!(platform.requests_started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn url_template_substitutes_coordinates_and_extra_params() {
        let platform = Arc::new(FakePlatform {
            requests_started: AtomicU32::new(0),
            body: geojson_bytes(),
            last_url: Mutex::new(None),
        });
        let mut url_params = HashMap::new();
        url_params.insert("style".to_string(), "dark".to_string());

        let source = UrlTileSource::new(
            TileSourceConfig {
                id: "vector".into(),
                format: TileFormat::GeoJson,
                url: "https://example.com/{style}/{z}/{x}/{y}.geojson".into(),
                url_params,
                max_zoom: 18,
            },
            platform.clone(),
            WorkerPool::new(2),
        );

        let (tx, rx) = mpsc::channel();
        source.load_tile(TileId::new(4, 3, 2), Box::new(move |result| {
            let _ = tx.send(result.is_ok());
        }));
        assert!(rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap());

        assert_eq!(
            platform.last_url.lock().clone().unwrap(),
            "https://example.com/dark/4/3/2.geojson"
        );
    }

    #[tokio::test]
    async fn unsupported_topojson_format_returns_an_error() {
        let platform = Arc::new(FakePlatform {
            requests_started: AtomicU32::new(0),
            body: Bytes::from_static(b"{}"),
            last_url: Mutex::new(None),
        });
        let source = UrlTileSource::new(
            TileSourceConfig {
                id: "topo".into(),
                format: TileFormat::TopoJson,
                url: "https://example.com/{z}/{x}/{y}.json".into(),
                url_params: HashMap::new(),
                max_zoom: 18,
            },
            platform,
            WorkerPool::new(2),
        );

        let (tx, rx) = mpsc::channel();
        source.load_tile(TileId::new(0, 0, 0), Box::new(move |result| {
            let _ = tx.send(result.is_ok());
        }));
        assert!(!rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap());
    }
}
