//! roster.rs
//!
//! Parser del roster (CSV exportado del formulario de inscripción).
//!
//! - Las columnas se localizan por subcadena sin distinguir mayúsculas:
//!   dirección = primera que contenga "address"; hogar = "household";
//!   tema = "fun" (o "name" si no hay otra); notas = "notes".
//! - Filas con dirección vacía se descartan (no es error).
//! - Sin columna de dirección -> `SchemaError` (fatal, antes de cualquier red).

use std::{fs::File, io::Read, path::Path};
use thiserror::Error;
use tracing::debug;

use crate::models::types::AddressRecord;

#[derive(Debug, Error)]
#[error("el roster no tiene columna de dirección (cabeceras: {headers:?})")]
pub struct SchemaError {
    pub headers: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("CSV inválido: {0}")]
    Csv(#[from] csv::Error),
    #[error("no se pudo abrir el roster: {0}")]
    Io(#[from] std::io::Error),
}

/// Índices de columna resueltos a partir de las cabeceras
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub address: usize,
    pub household: Option<usize>,
    pub theme: Option<usize>,
    pub notes: Option<usize>,
}

impl Columns {
    pub fn detect(headers: &[String]) -> Result<Self, SchemaError> {
        let lower: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let find = |pred: &dyn Fn(usize, &str) -> bool| {
            lower.iter().enumerate().find(|(i, h)| pred(*i, h.as_str())).map(|(i, _)| i)
        };

        let address = find(&|_, h| h.contains("address"))
            .ok_or_else(|| SchemaError { headers: headers.to_vec() })?;
        let household = find(&|i, h| i != address && h.contains("household"));
        let taken = |i: usize| i == address || Some(i) == household;
        let theme = find(&|i, h| !taken(i) && h.contains("fun"))
            .or_else(|| find(&|i, h| !taken(i) && h.contains("name")));
        let notes = find(&|i, h| !taken(i) && Some(i) != theme && h.contains("notes"));

        Ok(Self { address, household, theme, notes })
    }
}

pub fn load_roster(path: impl AsRef<Path>) -> Result<Vec<AddressRecord>, RosterError> {
    let f = File::open(path.as_ref())?;
    parse_roster(f)
}

pub fn parse_roster<R: Read>(input: R) -> Result<Vec<AddressRecord>, RosterError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    // El export trae BOM y cabeceras con espacios ("Address ")
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let cols = Columns::detect(&headers)?;
    debug!("columnas roster: {cols:?}");

    let mut out = Vec::new();
    for (row, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| rec.get(i)).map(|v| v.trim().to_string()).unwrap_or_default()
        };
        let raw_address = cell(Some(cols.address));
        if raw_address.is_empty() {
            debug!("fila {row}: sin dirección, se descarta");
            continue;
        }
        out.push(AddressRecord {
            row,
            raw_address,
            household_name: cell(cols.household),
            theme_label: cell(cols.theme),
            notes: cell(cols.notes),
        });
    }
    Ok(out)
}
