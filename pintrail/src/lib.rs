//! pintrail — del roster de direcciones al trazado de pines del mapa

pub mod data;
pub mod geocoder;
pub mod icons;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod server;
pub mod store;
pub mod trail;
