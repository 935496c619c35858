//! types.rs
//! Modelos compartidos por el pipeline: filas del roster, coordenadas,
//! pines renderizables y la configuración de la corrida

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

use crate::icons::IconRules;

/// Fila normalizada del roster (una casa participante)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Índice de la fila en el fichero original (0 = primera fila de datos)
    pub row: usize,
    pub raw_address: String,
    pub household_name: String,
    pub theme_label: String,
    pub notes: String,
}

impl AddressRecord {
    /// `themeLabel` si existe, si no el hogar, si no "House"
    pub fn display_name(&self) -> String {
        first_non_empty(&[self.theme_label.as_str(), self.household_name.as_str()]).unwrap_or("House").to_string()
    }

    /// Clave de merge: hogar normalizado, o la dirección normalizada si no hay hogar
    pub fn identity(&self) -> String {
        let household = normalize_key(&self.household_name);
        if household.is_empty() { normalize_key(&self.raw_address) } else { household }
    }
}

fn first_non_empty<'a>(values: &[&'a str]) -> Option<&'a str> {
    values.iter().map(|v| v.trim()).find(|v| !v.is_empty())
}

/// minúsculas + espacios colapsados
pub fn normalize_key(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self { Self { latitude, longitude } }

    /// Par (lon, lat) como lo esperan GeoJSON y `geo`
    pub fn lon_lat(&self) -> [f64; 2] { [self.longitude, self.latitude] }
}

/// Rectángulo cerrado [min_lat,max_lat] x [min_lon,max_lon]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingRegion {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingRegion {
    pub fn contains(&self, c: &Coordinate) -> bool {
        c.latitude.is_finite()
            && c.longitude.is_finite()
            && c.latitude >= self.min_lat
            && c.latitude <= self.max_lat
            && c.longitude >= self.min_lon
            && c.longitude <= self.max_lon
    }

    /// viewbox de Nominatim: "minLon,maxLat,maxLon,minLat"
    pub fn viewbox(&self) -> String {
        format!("{},{},{},{}", self.min_lon, self.max_lat, self.max_lon, self.min_lat)
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new((self.min_lat + self.max_lat) / 2.0, (self.min_lon + self.max_lon) / 2.0)
    }
}

/// Formato "minLat,maxLat,minLon,maxLon"
impl FromStr for BoundingRegion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()?;
        let &[min_lat, max_lat, min_lon, max_lon] = parts.as_slice() else {
            anyhow::bail!("se esperaban 4 valores (minLat,maxLat,minLon,maxLon), llegaron {}", parts.len());
        };
        if min_lat > max_lat || min_lon > max_lon {
            anyhow::bail!("región invertida: {s}");
        }
        Ok(Self { min_lat, max_lat, min_lon, max_lon })
    }
}

/// Taxonomía fija de iconos. El glifo se decide en la capa de render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IconTag {
    Ghost,
    Witch,
    Cat,
    Bat,
    Spider,
    Zombie,
    Skeleton,
    Candy,
    Bird,
    Monster,
    Cabin,
    Snake,
    Blue,
    WhiteHouse,
    Sparkle,
    Default,
}

impl IconTag {
    pub const ALL: [IconTag; 16] = [
        IconTag::Ghost, IconTag::Witch, IconTag::Cat, IconTag::Bat,
        IconTag::Spider, IconTag::Zombie, IconTag::Skeleton, IconTag::Candy,
        IconTag::Bird, IconTag::Monster, IconTag::Cabin, IconTag::Snake,
        IconTag::Blue, IconTag::WhiteHouse, IconTag::Sparkle, IconTag::Default,
    ];
}

impl fmt::Display for IconTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IconTag::Ghost => "GHOST",
            IconTag::Witch => "WITCH",
            IconTag::Cat => "CAT",
            IconTag::Bat => "BAT",
            IconTag::Spider => "SPIDER",
            IconTag::Zombie => "ZOMBIE",
            IconTag::Skeleton => "SKELETON",
            IconTag::Candy => "CANDY",
            IconTag::Bird => "BIRD",
            IconTag::Monster => "MONSTER",
            IconTag::Cabin => "CABIN",
            IconTag::Snake => "SNAKE",
            IconTag::Blue => "BLUE",
            IconTag::WhiteHouse => "WHITE_HOUSE",
            IconTag::Sparkle => "SPARKLE",
            IconTag::Default => "DEFAULT",
        };
        f.write_str(s)
    }
}

/// Unidad canónica del mapa. Se serializa tal cual en el snapshot:
/// `{identity, address, displayName, notes?, icon, latitude, longitude}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub identity: String,
    pub address: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    pub icon: IconTag,
    #[serde(flatten)]
    pub location: Coordinate,
}

impl Pin {
    pub fn from_record(rec: &AddressRecord, location: Coordinate, rules: &IconRules) -> Self {
        let display_name = rec.display_name();
        let icon = rules.classify(&display_name, &rec.notes);
        Self {
            identity: rec.identity(),
            address: rec.raw_address.trim().to_string(),
            display_name,
            notes: rec.notes.trim().to_string(),
            icon,
            location,
        }
    }
}

/// Tamaño en píxeles de un artefacto de salida
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug)]
pub struct ViewportPreset {
    pub name: String,
    pub viewport: Viewport,
}

#[derive(Clone, Debug)]
pub struct TrailCfg {
    /// CSV exportado del formulario
    pub roster_path: String,
    /// Snapshot JSON de pines (entrada y salida de cada corrida)
    pub snapshot_path: String,
    /// Carpeta para GeoJSON / RenderRequest / HTML
    pub out_dir: String,

    /// Sufijo de localidad para desambiguar direcciones cortas
    pub locality_suffix: String,
    /// Región válida para los resultados del geocoder
    pub bounds: BoundingRegion,
    /// Reglas ordenadas de iconos
    pub icon_rules: IconRules,

    /// Intervalo mínimo entre peticiones al proveedor
    pub min_interval: Duration,
    /// Timeout de cada petición
    pub request_timeout: Duration,
    pub geocoder_url: String,
    /// `bounded=1`: sólo resultados dentro del viewbox
    pub geocoder_bounded: bool,
    /// Nominatim exige un User-Agent identificable
    pub user_agent: String,

    pub viewports: Vec<ViewportPreset>,

    /// Dirección/puerto del servidor HTTP (Axum)
    pub bind: String,
}

impl Default for TrailCfg {
    fn default() -> Self {
        Self {
            roster_path: "data/roster.csv".into(),
            snapshot_path: "export/pins.json".into(),
            out_dir: "assets/maps".into(),
            locality_suffix: "Miami, FL 33155".into(),
            // Red Bird (SW Miami)
            bounds: BoundingRegion { min_lat: 25.7280, max_lat: 25.7520, min_lon: -80.3155, max_lon: -80.2895 },
            icon_rules: IconRules::default(),
            min_interval: Duration::from_millis(1200),
            request_timeout: Duration::from_secs(10),
            geocoder_url: "https://nominatim.openstreetmap.org/search".into(),
            geocoder_bounded: true,
            user_agent: "pintrail/0.1 (trick-or-treat trail map)".into(),
            viewports: vec![
                ViewportPreset { name: "desktop".into(), viewport: Viewport { width: 1920, height: 1080 } },
                ViewportPreset { name: "mobile".into(), viewport: Viewport { width: 1080, height: 1920 } },
                ViewportPreset { name: "social".into(), viewport: Viewport { width: 1080, height: 1350 } },
            ],
            bind: "0.0.0.0:8080".into(),
        }
    }
}
