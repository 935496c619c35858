//! pipeline.rs
//! Orquestador de una corrida: roster -> geocoder -> iconos -> merge con el
//! snapshot -> geometría -> peticiones de render.
//! Secuencial: una petición al proveedor cada vez, con el ritmo de `TrailCfg::min_interval`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::{Path, PathBuf}};
use tracing::{info, warn};

use crate::data::roster;
use crate::geocoder::{FailureReason, Pacer, Resolver};
use crate::models::types::{AddressRecord, Pin, TrailCfg};
use crate::render::{GeoJsonRenderer, LeafletHtmlRenderer, RenderRequest, Renderer};
use crate::store::{save_snapshot, PinCollection, PinStore};
use crate::trail::TrailGeometry;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FailedRecord {
    pub address: String,
    pub reason: FailureReason,
}

/// Resultado de geocodificar un roster: pines válidos + fallos por dirección
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    pub pins: PinCollection,
    pub failures: Vec<FailedRecord>,
    /// Registros que llegaron al geocoder
    pub total: usize,
}

impl RunReport {
    pub fn succeeded(&self) -> usize { self.total - self.failures.len() }

    pub fn summary(&self) -> String {
        let mut s = format!("{} de {} registros geocodificados", self.succeeded(), self.total);
        for f in &self.failures {
            s.push_str(&format!("\n  - {}: {}", f.address, f.reason));
        }
        s
    }
}

pub struct Pipeline<'a> {
    cfg: &'a TrailCfg,
    resolver: Resolver,
    store: PinStore,
}

impl<'a> Pipeline<'a> {
    pub fn new(cfg: &'a TrailCfg, resolver: Resolver) -> Self {
        Self { cfg, resolver, store: PinStore::new(cfg.icon_rules.clone()) }
    }

    pub fn store(&self) -> &PinStore { &self.store }

    /// Geocodifica en orden de fila. Un fallo sólo excluye su registro.
    pub async fn geocode_records(&self, records: &[AddressRecord]) -> RunReport {
        let mut pacer = Pacer::new(self.cfg.min_interval);
        let mut report = RunReport::default();
        let mut pins: Vec<Pin> = Vec::with_capacity(records.len());

        for rec in records {
            if rec.raw_address.trim().is_empty() { continue; }
            report.total += 1;
            pacer.wait().await;
            match self.resolver.resolve(&rec.raw_address, &self.cfg.bounds).await {
                Ok(loc) => {
                    info!("  [OK] {} -> {:.6}, {:.6}", rec.raw_address, loc.latitude, loc.longitude);
                    pins.push(Pin::from_record(rec, loc, self.store.rules()));
                }
                Err(e) => {
                    warn!("  [X] {}: {}", rec.raw_address, e.reason);
                    report.failures.push(FailedRecord { address: rec.raw_address.clone(), reason: e.reason });
                }
            }
        }

        report.pins = self.store.collect(pins);
        report
    }

    /// Corrida completa sobre los ficheros de `cfg`. Devuelve el informe de esta
    /// corrida y la colección fusionada que queda en el snapshot.
    pub async fn run(&self) -> Result<(RunReport, PinCollection)> {
        // Errores fatales antes de cualquier petición de red
        let records = roster::load_roster(&self.cfg.roster_path)
            .with_context(|| format!("roster {}", self.cfg.roster_path))?;
        let base = self.store.load_snapshot(&self.cfg.snapshot_path)?;
        info!("Geocodificando {} direcciones ({} pines previos)", records.len(), base.len());

        let report = self.geocode_records(&records).await;
        info!("{}", report.summary());

        let merged = self.store.merge(&base, &report.pins);
        save_snapshot(&self.cfg.snapshot_path, &merged)?;
        info!("Snapshot: {} pines en {}", merged.len(), self.cfg.snapshot_path);
        Ok((report, merged))
    }
}

/// Escribe por cada viewport el RenderRequest (JSON) y el HTML, más un GeoJSON común
pub fn write_render_outputs(cfg: &TrailCfg, pins: &PinCollection) -> Result<Vec<PathBuf>> {
    let out_dir = Path::new(&cfg.out_dir);
    fs::create_dir_all(out_dir).with_context(|| format!("creando {}", out_dir.display()))?;

    let geometry = TrailGeometry::from_pins(pins);
    let html = LeafletHtmlRenderer::default();
    let mut written = Vec::new();

    for (i, preset) in cfg.viewports.iter().enumerate() {
        let req = RenderRequest::build(pins, &geometry, preset.viewport);

        let p = out_dir.join(format!("trail_{}.json", preset.name));
        fs::write(&p, serde_json::to_string_pretty(&req)?)?;
        written.push(p);

        let page = html.render(&req)?;
        let p = out_dir.join(format!("map_{}.{}", preset.name, page.extension));
        fs::write(&p, &page.bytes)?;
        written.push(p);

        // El GeoJSON no depende del viewport
        if i == 0 {
            let gj = GeoJsonRenderer.render(&req)?;
            let p = out_dir.join(format!("trail.{}", gj.extension));
            fs::write(&p, &gj.bytes)?;
            written.push(p);
        }
    }
    info!("Render: {} ficheros en {} (recorrido {:.0} m)", written.len(), out_dir.display(), geometry.length_m);
    Ok(written)
}
