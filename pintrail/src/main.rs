//! main.rs — roster -> geocoder -> snapshot -> mapas (configuración por ENV)
//!
//! Comandos:
//!   pintrail geocode   (por defecto) geocodifica el roster, fusiona con el snapshot y renderiza
//!   pintrail render    renderiza desde el snapshot, sin red
//!   pintrail serve     API HTTP sobre el snapshot

use anyhow::{Context, Result};
use std::{env, str::FromStr, sync::Arc, time::Duration};
use tokio::{signal, sync::RwLock};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pintrail::geocoder::{NominatimClient, Resolver};
use pintrail::models::types::{BoundingRegion, TrailCfg, Viewport};
use pintrail::pipeline::{write_render_outputs, Pipeline};
use pintrail::server::api::{self, ApiState, ServeState};
use pintrail::store::PinStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = app_cfg_from_env();
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        None | Some("geocode") => run_geocode(&cfg).await,
        Some("render") => run_render(&cfg),
        Some("serve") => run_serve(&cfg).await,
        Some("help") | Some("--help") | Some("-h") => {
            print_help();
            Ok(())
        }
        Some(other) => {
            print_help();
            anyhow::bail!("comando desconocido: {other}")
        }
    }
}

async fn run_geocode(cfg: &TrailCfg) -> Result<()> {
    let client = NominatimClient::new(cfg)?;
    let pipeline = Pipeline::new(cfg, Resolver::new(Box::new(client), cfg.locality_suffix.clone()));
    let (report, merged) = pipeline.run().await?;
    if !report.failures.is_empty() {
        warn!("{} direcciones sin geocodificar", report.failures.len());
    }
    write_render_outputs(cfg, &merged)?;
    Ok(())
}

fn run_render(cfg: &TrailCfg) -> Result<()> {
    let store = PinStore::new(cfg.icon_rules.clone());
    let pins = store.load_snapshot(&cfg.snapshot_path)?;
    if pins.is_empty() {
        warn!("Snapshot vacío o inexistente: {}", cfg.snapshot_path);
    }
    write_render_outputs(cfg, &pins)?;
    Ok(())
}

async fn run_serve(cfg: &TrailCfg) -> Result<()> {
    let store = Arc::new(PinStore::new(cfg.icon_rules.clone()));
    let pins = store.load_snapshot(&cfg.snapshot_path)?;
    info!("Sirviendo {} pines de {}", pins.len(), cfg.snapshot_path);

    let state = ApiState {
        data: Arc::new(RwLock::new(ServeState::new(pins))),
        store,
        snapshot_path: cfg.snapshot_path.clone(),
        default_viewport: cfg.viewports.first().map(|v| v.viewport).unwrap_or(Viewport { width: 1920, height: 1080 }),
    };
    let app = api::router(state);
    info!("Escuchando en http://{}", cfg.bind);
    let listener = tokio::net::TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("bind {}", cfg.bind))?;
    let serve = axum::serve(listener, app);
    tokio::select! {
        r = serve => { r?; },
        _ = signal::ctrl_c() => { info!("Señal de salida recibida"); }
    }
    Ok(())
}

fn app_cfg_from_env() -> TrailCfg {
    let mut c = TrailCfg::default();
    if let Ok(v) = env::var("PINTRAIL_ROSTER") { c.roster_path = v; }
    if let Ok(v) = env::var("PINTRAIL_SNAPSHOT") { c.snapshot_path = v; }
    if let Ok(v) = env::var("PINTRAIL_OUT_DIR") { c.out_dir = v; }
    if let Ok(v) = env::var("PINTRAIL_LOCALITY") { c.locality_suffix = v; }
    if let Ok(v) = env::var("PINTRAIL_GEOCODER_URL") { c.geocoder_url = v; }
    if let Ok(v) = env::var("PINTRAIL_USER_AGENT") { c.user_agent = v; }
    if let Ok(v) = env::var("PINTRAIL_BIND") { c.bind = v; }
    if let Some(b) = parsed::<BoundingRegion>("PINTRAIL_BOUNDS") { c.bounds = b; }
    if let Some(ms) = parsed::<u64>("PINTRAIL_MIN_INTERVAL_MS") { c.min_interval = Duration::from_millis(ms); }
    if let Some(s) = parsed::<u64>("PINTRAIL_TIMEOUT_S") { c.request_timeout = Duration::from_secs(s); }
    if let Some(b) = parsed::<bool>("PINTRAIL_BOUNDED") { c.geocoder_bounded = b; }
    c
}

/// Valor de ENV parseado; si no parsea se avisa y se mantiene el default
fn parsed<T: FromStr>(key: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("{key}={raw:?} ignorado: {e}");
            None
        }
    }
}

fn print_help() {
    println!("uso: pintrail [geocode|render|serve]");
    println!("  ENV: PINTRAIL_ROSTER, PINTRAIL_SNAPSHOT, PINTRAIL_OUT_DIR, PINTRAIL_LOCALITY,");
    println!("       PINTRAIL_BOUNDS=minLat,maxLat,minLon,maxLon, PINTRAIL_MIN_INTERVAL_MS,");
    println!("       PINTRAIL_TIMEOUT_S, PINTRAIL_BOUNDED=true|false, PINTRAIL_GEOCODER_URL,");
    println!("       PINTRAIL_USER_AGENT, PINTRAIL_BIND");
}
