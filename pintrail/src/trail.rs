//! trail.rs
//! Geometría del recorrido: polilínea en el orden de la colección,
//! bbox con margen para encuadrar el mapa y longitud aproximada

use geo::{BoundingRect, HaversineLength, LineString};
use serde::Serialize;

use crate::models::types::{BoundingRegion, Coordinate};
use crate::store::PinCollection;

/// Margen por lado, como fracción del tamaño del bbox
pub const PAD_FRACTION: f64 = 0.1;
/// Semiextensión mínima (grados) para que un único pin no dé un bbox de área 0
pub const MIN_HALF_EXTENT_DEG: f64 = 0.0005;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailGeometry {
    pub points: Vec<Coordinate>,
    /// Ausente si no hay puntos
    pub bounds: Option<BoundingRegion>,
    pub length_m: f64,
}

impl TrailGeometry {
    pub fn from_pins(pins: &PinCollection) -> Self {
        let points: Vec<Coordinate> = pins.iter().map(|p| p.location).collect();
        let line: LineString<f64> = points.iter().map(|c| (c.longitude, c.latitude)).collect();

        let bounds = line.bounding_rect().map(|r| {
            let (min_lat, max_lat) = widen(r.min().y, r.max().y);
            let (min_lon, max_lon) = widen(r.min().x, r.max().x);
            BoundingRegion { min_lat, max_lat, min_lon, max_lon }
        });
        let length_m = if points.len() < 2 { 0.0 } else { line.haversine_length() };

        Self { points, bounds, length_m }
    }

    /// Polilínea en orden (lon, lat) para GeoJSON
    pub fn polyline(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|c| c.lon_lat()).collect()
    }
}

/// Asegura la extensión mínima y aplica el margen
#[inline]
fn widen(min: f64, max: f64) -> (f64, f64) {
    let mid = (min + max) / 2.0;
    let half = ((max - min) / 2.0).max(MIN_HALF_EXTENT_DEG);
    let pad = 2.0 * half * PAD_FRACTION;
    (mid - half - pad, mid + half + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::IconRules;
    use crate::models::types::{IconTag, Pin};
    use crate::store::PinStore;

    fn pins(coords: &[(f64, f64)]) -> PinCollection {
        let store = PinStore::new(IconRules::default());
        store.collect(coords.iter().enumerate().map(|(i, (lat, lon))| Pin {
            identity: format!("p{i}"),
            address: format!("{i} Elm St"),
            display_name: "House".into(),
            notes: String::new(),
            icon: IconTag::Default,
            location: Coordinate::new(*lat, *lon),
        }))
    }

    #[test]
    fn empty_collection_has_no_bounds() {
        let g = TrailGeometry::from_pins(&PinCollection::new());
        assert!(g.points.is_empty());
        assert_eq!(g.bounds, None);
        assert_eq!(g.length_m, 0.0);
    }

    #[test]
    fn single_pin_gets_non_degenerate_bounds() {
        let g = TrailGeometry::from_pins(&pins(&[(25.74, -80.30)]));
        let b = g.bounds.unwrap();
        assert!(b.max_lat > b.min_lat);
        assert!(b.max_lon > b.min_lon);
        assert!(b.contains(&Coordinate::new(25.74, -80.30)));
        assert_eq!(g.length_m, 0.0);
    }

    #[test]
    fn bounds_are_padded_and_points_keep_order() {
        let g = TrailGeometry::from_pins(&pins(&[(25.74, -80.30), (25.73, -80.29), (25.75, -80.31)]));
        assert_eq!(g.points[1], Coordinate::new(25.73, -80.29));
        assert_eq!(g.polyline()[0], [-80.30, 25.74]);

        let b = g.bounds.unwrap();
        // span lat = 0.02 -> 0.002 de margen por lado
        assert!((b.min_lat - 25.728).abs() < 1e-9);
        assert!((b.max_lat - 25.752).abs() < 1e-9);
        assert!((b.min_lon - -80.312).abs() < 1e-9);
        assert!((b.max_lon - -80.288).abs() < 1e-9);
    }

    #[test]
    fn length_is_haversine_along_the_path() {
        // 0.01º de latitud ~ 1.11 km
        let g = TrailGeometry::from_pins(&pins(&[(25.74, -80.30), (25.75, -80.30)]));
        assert!((g.length_m - 1112.0).abs() < 5.0, "{}", g.length_m);
    }
}
