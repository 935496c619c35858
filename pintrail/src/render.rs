//! render.rs
//!
//! Frontera con los renderizadores.
//!
//! - `RenderRequest`: único dato que recibe un renderizador (pines + polilínea + viewport).
//!   Aquí no hay red ni geocodificación.
//! - `glyph()`: etiqueta -> emoji. Sólo se usa en esta capa.
//! - `Renderer`: GeoJSON (para la web/API) y un HTML Leaflet mínimo.
//!   La captura a imagen queda fuera (lo hace un navegador headless externo).

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::types::{BoundingRegion, Coordinate, IconTag, Viewport};
use crate::store::PinCollection;
use crate::trail::TrailGeometry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPin {
    pub identity: String,
    pub display_name: String,
    pub address: String,
    pub icon: IconTag,
    pub location: Coordinate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub viewport: Viewport,
    pub pins: Vec<RenderPin>,
    /// (lon, lat) en el orden del recorrido
    pub polyline: Vec<[f64; 2]>,
    pub bounds: Option<BoundingRegion>,
}

impl RenderRequest {
    pub fn build(pins: &PinCollection, geometry: &TrailGeometry, viewport: Viewport) -> Self {
        let pins = pins
            .iter()
            .map(|p| RenderPin {
                identity: p.identity.clone(),
                display_name: p.display_name.clone(),
                address: p.address.clone(),
                icon: p.icon,
                location: p.location,
            })
            .collect();
        Self { viewport, pins, polyline: geometry.polyline(), bounds: geometry.bounds }
    }
}

pub fn glyph(tag: IconTag) -> &'static str {
    match tag {
        IconTag::Ghost => "👻",
        IconTag::Witch => "🧙",
        IconTag::Cat => "🐈‍⬛",
        IconTag::Bat => "🦇",
        IconTag::Spider => "🕷️",
        IconTag::Zombie => "🧟",
        IconTag::Skeleton => "💀",
        IconTag::Candy => "🍬",
        IconTag::Bird => "🐦",
        IconTag::Monster => "👹",
        IconTag::Cabin => "🏚️",
        IconTag::Snake => "🐍",
        IconTag::Blue => "💙",
        IconTag::WhiteHouse => "🏛️",
        IconTag::Sparkle => "✨",
        IconTag::Default => "🎃",
    }
}

pub struct Rendered {
    pub content_type: &'static str,
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

pub trait Renderer {
    fn render(&self, req: &RenderRequest) -> Result<Rendered>;
}

// -------------------------------------------------------
// GeoJSON: un Point por pin + LineString del recorrido
// -------------------------------------------------------
pub struct GeoJsonRenderer;

fn props(v: serde_json::Value) -> Option<JsonObject> {
    match v {
        serde_json::Value::Object(m) => Some(m),
        _ => None,
    }
}

pub fn to_feature_collection(req: &RenderRequest) -> FeatureCollection {
    let mut features: Vec<Feature> = req
        .pins
        .iter()
        .enumerate()
        .map(|(i, p)| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(p.location.lon_lat().to_vec()))),
            id: None,
            properties: props(json!({
                "kind": "pin",
                "order": i,
                "identity": p.identity,
                "displayName": p.display_name,
                "address": p.address,
                "icon": p.icon,
                "glyph": glyph(p.icon),
            })),
            foreign_members: None,
        })
        .collect();

    if req.polyline.len() >= 2 {
        let line = req.polyline.iter().map(|c| c.to_vec()).collect();
        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(line))),
            id: None,
            properties: props(json!({
                "kind": "trail",
                "style": { "stroke": "#ff6a00", "stroke-width": 3, "stroke-opacity": 0.9, "dashArray": "6 6" }
            })),
            foreign_members: None,
        });
    }

    FeatureCollection {
        bbox: req.bounds.map(|b| vec![b.min_lon, b.min_lat, b.max_lon, b.max_lat]),
        features,
        foreign_members: props(json!({
            "name": "pintrail",
            "ts_utc": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        })),
    }
}

impl Renderer for GeoJsonRenderer {
    fn render(&self, req: &RenderRequest) -> Result<Rendered> {
        let gj = GeoJson::from(to_feature_collection(req));
        Ok(Rendered {
            content_type: "application/geo+json; charset=utf-8",
            extension: "geojson",
            bytes: gj.to_string().into_bytes(),
        })
    }
}

// -------------------------------------------------------
// HTML Leaflet (mapa interactivo autocontenido)
// -------------------------------------------------------
pub struct LeafletHtmlRenderer {
    pub title: String,
    pub tiles_url: String,
}

impl Default for LeafletHtmlRenderer {
    fn default() -> Self {
        Self {
            title: "Trick-or-Treat Trail".into(),
            tiles_url: "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png".into(),
        }
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

impl Renderer for LeafletHtmlRenderer {
    fn render(&self, req: &RenderRequest) -> Result<Rendered> {
        // "</" dentro de un <script> cerraría la etiqueta
        let data = serde_json::to_string(req)?.replace("</", "<\\/");
        let glyphs: serde_json::Map<String, serde_json::Value> =
            IconTag::ALL.iter().map(|t| (t.to_string(), json!(glyph(*t)))).collect();
        let glyphs = serde_json::to_string(&glyphs)?;
        let Viewport { width, height } = req.viewport;

        let html = format!(
            r#"<!doctype html><html><head><meta charset="utf-8"/>
<meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>{title}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css"/>
<style>html,body{{margin:0;background:#0a0c18}}#map{{width:{width}px;height:{height}px}}.pin{{font-size:22px;filter:drop-shadow(0 1px 2px rgba(0,0,0,.6))}}</style>
</head><body><div id="map"></div>
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script>
const req={data};
const glyphs={glyphs};
const map=L.map('map',{{zoomControl:false,attributionControl:false}});
L.tileLayer('{tiles}',{{maxZoom:19}}).addTo(map);
const esc=s=>String(s).replace(/[&<>"]/g,c=>({{'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;'}}[c]));
req.pins.forEach(p=>L.marker([p.location.latitude,p.location.longitude],{{icon:L.divIcon({{className:'pin',html:glyphs[p.icon]||glyphs.DEFAULT}})}}).addTo(map).bindPopup(`<b>${{esc(p.displayName)}}</b><br/>${{esc(p.address)}}`));
if(req.polyline.length>1)L.polyline(req.polyline.map(c=>[c[1],c[0]]),{{color:'#ff6a00',weight:3,opacity:.9,dashArray:'6 6'}}).addTo(map);
if(req.bounds)map.fitBounds([[req.bounds.minLat,req.bounds.minLon],[req.bounds.maxLat,req.bounds.maxLon]]);else map.setView([0,0],2);
</script></body></html>
"#,
            title = html_escape(&self.title),
            tiles = self.tiles_url,
        );
        Ok(Rendered { content_type: "text/html; charset=utf-8", extension: "html", bytes: html.into_bytes() })
    }
}
