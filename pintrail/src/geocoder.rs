//! geocoder.rs
//!
//! Dirección -> coordenada.
//!
//! - `Geocoder`: proveedor externo (Nominatim en producción, stubs en tests).
//!   Una llamada = como mucho una petición de red.
//! - `Resolver`: añade el sufijo de localidad, llama al proveedor y valida el
//!   resultado contra la región. Nunca propaga errores: devuelve `GeocodeFailure`.
//! - `Pacer`: límite de ritmo del lado del llamante (intervalo mínimo entre peticiones).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep_until, Instant};

use crate::models::types::{BoundingRegion, Coordinate, TrailCfg};

#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum FailureReason {
    #[error("sin resultados")]
    NoMatch,
    #[error("resultado fuera de la región")]
    OutOfBounds,
    #[error("error del proveedor: {0}")]
    ProviderError(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("no se pudo geocodificar: {reason}")]
pub struct GeocodeFailure {
    pub reason: FailureReason,
}

impl From<FailureReason> for GeocodeFailure {
    fn from(reason: FailureReason) -> Self { Self { reason } }
}

/// Proveedor de geocodificación. `Ok(None)` = el proveedor respondió sin coincidencias.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn lookup(&self, query: &str, bias: &BoundingRegion) -> Result<Option<Coordinate>>;
}

#[async_trait]
impl<G: Geocoder + ?Sized> Geocoder for std::sync::Arc<G> {
    async fn lookup(&self, query: &str, bias: &BoundingRegion) -> Result<Option<Coordinate>> {
        (**self).lookup(query, bias).await
    }
}

// --------------------------------------
// Nominatim (OSM)
// --------------------------------------

/// Cliente de la API `search` de Nominatim
pub struct NominatimClient {
    pub(crate) http: Client,
    /// Endpoint, p.ej. "https://nominatim.openstreetmap.org/search"
    pub base_url: String,
    /// Restringe la búsqueda al viewbox (`bounded=1`)
    pub bounded: bool,
}

impl NominatimClient {
    pub fn new(cfg: &TrailCfg) -> Result<Self> {
        let http = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .gzip(true)
            .build()
            .context("No se pudo construir el cliente HTTP")?;
        Ok(Self { http, base_url: cfg.geocoder_url.clone(), bounded: cfg.geocoder_bounded })
    }
}

impl NominatimClient {
    /// Parámetros de `search`: una sola coincidencia, sesgada al viewbox
    pub(crate) fn search_params(&self, query: &str, bias: &BoundingRegion) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("format", "json".into()),
            ("limit", "1".into()),
            ("viewbox", bias.viewbox()),
        ];
        if self.bounded { params.push(("bounded", "1".into())); }
        params
    }
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// Primera coincidencia de una respuesta JSON de Nominatim (lat/lon llegan como texto)
pub(crate) fn parse_hits(body: &str) -> Result<Option<Coordinate>> {
    let hits: Vec<NominatimHit> = serde_json::from_str(body).context("JSON inválido de Nominatim")?;
    let Some(hit) = hits.into_iter().next() else { return Ok(None) };
    let lat: f64 = hit.lat.trim().parse().with_context(|| format!("lat inválida: {:?}", hit.lat))?;
    let lon: f64 = hit.lon.trim().parse().with_context(|| format!("lon inválida: {:?}", hit.lon))?;
    tracing::debug!("nominatim -> {} ({lat}, {lon})", hit.display_name);
    Ok(Some(Coordinate::new(lat, lon)))
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn lookup(&self, query: &str, bias: &BoundingRegion) -> Result<Option<Coordinate>> {
        let params = self.search_params(query, bias);
        let resp = self.http.get(&self.base_url).query(&params).send().await?;
        match resp.status() {
            StatusCode::OK => {
                let body = resp.text().await?;
                parse_hits(&body)
            }
            s => anyhow::bail!("HTTP {} en {}", s, self.base_url),
        }
    }
}

// --------------------------------------
// Resolver
// --------------------------------------

/// Añade el sufijo salvo que la dirección ya nombre la localidad
/// (se compara el primer componente del sufijo, p.ej. "Miami").
pub fn build_query(address: &str, locality_suffix: &str) -> String {
    let address = address.trim();
    let suffix = locality_suffix.trim();
    let locality = suffix.split(',').next().unwrap_or("").trim().to_lowercase();
    if suffix.is_empty() || (!locality.is_empty() && address.to_lowercase().contains(&locality)) {
        address.to_string()
    } else {
        format!("{address}, {suffix}")
    }
}

pub struct Resolver {
    geocoder: Box<dyn Geocoder>,
    locality_suffix: String,
}

impl Resolver {
    pub fn new(geocoder: Box<dyn Geocoder>, locality_suffix: impl Into<String>) -> Self {
        Self { geocoder, locality_suffix: locality_suffix.into() }
    }

    pub async fn resolve(&self, address: &str, bias: &BoundingRegion) -> Result<Coordinate, GeocodeFailure> {
        let query = build_query(address, &self.locality_suffix);
        match self.geocoder.lookup(&query, bias).await {
            Ok(Some(c)) if bias.contains(&c) => Ok(c),
            Ok(Some(c)) => {
                tracing::debug!("{query}: ({}, {}) fuera de región", c.latitude, c.longitude);
                Err(FailureReason::OutOfBounds.into())
            }
            Ok(None) => Err(FailureReason::NoMatch.into()),
            Err(e) => Err(FailureReason::ProviderError(format!("{e:#}")).into()),
        }
    }
}

// --------------------------------------
// Ritmo de peticiones
// --------------------------------------

/// Garantiza `min_interval` entre dos `wait()` consecutivos
pub struct Pacer {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self { Self { min_interval, last: None } }

    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let next = last + self.min_interval;
            if Instant::now() < next { sleep_until(next).await; }
        }
        self.last = Some(Instant::now());
    }
}
