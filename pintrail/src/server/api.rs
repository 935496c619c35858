//! api.rs — Rutas HTTP: /health, /status, /pins, /trail, /render y /reload

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, services::ServeDir};
use tracing::{info, warn};

use crate::models::types::Viewport;
use crate::render::{GeoJsonRenderer, RenderRequest, Renderer};
use crate::store::{PinCollection, PinStore};
use crate::trail::TrailGeometry;

/// Estado servido: el último snapshot y su geometría
#[derive(Clone, Debug)]
pub struct ServeState {
    pub pins: PinCollection,
    pub geometry: TrailGeometry,
    pub loaded_ts_utc: String,
}

impl ServeState {
    pub fn new(pins: PinCollection) -> Self {
        let geometry = TrailGeometry::from_pins(&pins);
        Self { pins, geometry, loaded_ts_utc: chrono::Utc::now().to_rfc3339() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub pins: usize,
    pub length_m: f64,
    pub loaded_ts_utc: String,
}

#[derive(Clone)]
pub struct ApiState {
    pub data: Arc<RwLock<ServeState>>,
    pub store: Arc<PinStore>,
    pub snapshot_path: String,
    pub default_viewport: Viewport,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/status", get(get_status))
        .route("/pins", get(get_pins))
        .route("/trail", get(get_trail_geojson))
        .route("/render", get(get_render))
        .route("/reload", post(reload))
        .fallback_service(ServeDir::new("web"))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
}

async fn get_status(State(st): State<ApiState>) -> Json<Status> {
    let d = st.data.read().await;
    Json(Status {
        pins: d.pins.len(),
        length_m: d.geometry.length_m,
        loaded_ts_utc: d.loaded_ts_utc.clone(),
    })
}

async fn get_pins(State(st): State<ApiState>) -> Json<PinCollection> {
    let d = st.data.read().await;
    Json(d.pins.clone())
}

/// GeoJSON del recorrido; 204 si todavía no hay pines
async fn get_trail_geojson(State(st): State<ApiState>) -> Response {
    let d = st.data.read().await;
    if d.pins.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    let req = RenderRequest::build(&d.pins, &d.geometry, st.default_viewport);
    match GeoJsonRenderer.render(&req) {
        Ok(out) => ([(CONTENT_TYPE, out.content_type)], Body::from(out.bytes)).into_response(),
        Err(e) => {
            warn!("trail geojson: {e:?}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Query de /render: `w` y `h` en píxeles (si faltan, el viewport por defecto)
#[derive(Debug, Deserialize)]
pub struct RenderQuery {
    pub w: Option<u32>,
    pub h: Option<u32>,
}

async fn get_render(State(st): State<ApiState>, Query(q): Query<RenderQuery>) -> Json<RenderRequest> {
    let viewport = Viewport {
        width: q.w.filter(|w| *w > 0).unwrap_or(st.default_viewport.width),
        height: q.h.filter(|h| *h > 0).unwrap_or(st.default_viewport.height),
    };
    let d = st.data.read().await;
    Json(RenderRequest::build(&d.pins, &d.geometry, viewport))
}

/// Vuelve a leer el snapshot de disco (tras una corrida de `geocode`)
async fn reload(State(st): State<ApiState>) -> Response {
    match st.store.load_snapshot(&st.snapshot_path) {
        Ok(pins) => {
            let n = pins.len();
            *st.data.write().await = ServeState::new(pins);
            info!("Snapshot recargado: {n} pines");
            (StatusCode::OK, format!("{n}")).into_response()
        }
        Err(e) => {
            warn!("reload: {e:?}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::IconRules;
    use crate::models::types::{Coordinate, IconTag, Pin};
    use crate::store::save_snapshot;

    fn state(pins: PinCollection, snapshot_path: &str) -> ApiState {
        ApiState {
            data: Arc::new(RwLock::new(ServeState::new(pins))),
            store: Arc::new(PinStore::new(IconRules::default())),
            snapshot_path: snapshot_path.into(),
            default_viewport: Viewport { width: 1920, height: 1080 },
        }
    }

    fn one_pin() -> PinCollection {
        PinStore::new(IconRules::default()).collect(vec![Pin {
            identity: "smith".into(),
            address: "100 Main St".into(),
            display_name: "Smith".into(),
            notes: String::new(),
            icon: IconTag::Default,
            location: Coordinate::new(25.74, -80.30),
        }])
    }

    #[tokio::test]
    async fn render_uses_query_viewport_or_default() {
        let st = state(one_pin(), "unused.json");
        let Json(req) = get_render(State(st.clone()), Query(RenderQuery { w: Some(1080), h: Some(1350) })).await;
        assert_eq!(req.viewport, Viewport { width: 1080, height: 1350 });
        assert_eq!(req.pins.len(), 1);
        assert!(req.bounds.is_some());

        let Json(req) = get_render(State(st), Query(RenderQuery { w: None, h: Some(0) })).await;
        assert_eq!(req.viewport, Viewport { width: 1920, height: 1080 });
    }

    #[tokio::test]
    async fn trail_is_no_content_when_empty() {
        let resp = get_trail_geojson(State(state(PinCollection::new(), "unused.json"))).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = get_trail_geojson(State(state(one_pin(), "unused.json"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/geo+json; charset=utf-8");
    }

    #[tokio::test]
    async fn reload_picks_up_new_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pins.json");
        let st = state(PinCollection::new(), path.to_str().unwrap());
        save_snapshot(&path, &one_pin()).unwrap();

        let Json(before) = get_status(State(st.clone())).await;
        assert_eq!(before.pins, 0);
        assert_eq!(before.length_m, 0.0);

        let resp = reload(State(st.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let Json(pins) = get_pins(State(st.clone())).await;
        assert_eq!(pins, one_pin());

        let Json(after) = get_status(State(st)).await;
        assert_eq!(after.pins, 1);
        assert!(!after.loaded_ts_utc.is_empty());
        assert!(after.loaded_ts_utc >= before.loaded_ts_utc);
    }
}
