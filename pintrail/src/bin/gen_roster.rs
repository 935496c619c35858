//! gen_roster.rs
//! Escribe data/roster_sample.csv con el mismo formato que el export del
//! formulario, para probar el pipeline en local sin el fichero real.
//! Uso: cargo run --bin gen_roster

use std::fs;

fn main() -> anyhow::Result<()> {
    // Casas de Red Bird (SW Miami); algunas sin nombre temático y una sin dirección
    let rows = [
        ("2025-10-01 18:02", "Fisher Family", "6199 SW 38 St", "Haunted House", ""),
        ("2025-10-01 18:40", "Cachonegrete", "5965 SW 38 St", "Sweet & Spooky Stop", "full-size bars"),
        ("2025-10-01 19:15", "Caamano-Gonzalez", "3736 SW 60th Ave", "Casa Sandsnake", ""),
        ("2025-10-02 08:30", "Permuy Family", "3715 SW 60th Place", "Blues Boooooo House", ""),
        ("2025-10-02 09:12", "The Wood family", "3800 SW 58 Ave", "Cabin in the Woods", "fog machine after 7pm"),
        ("2025-10-02 10:05", "Illueca", "3601 SW 58 Ave", "Spiderweb Cottage", ""),
        ("2025-10-03 12:44", "Carter-Goldberg Family", "6275 SW 39th St", "", ""),
        ("2025-10-03 13:20", "Campoamor Family", "3715 sw 58 ct Miami Fl 33155", "The Spooky-Rizzlers", ""),
        ("2025-10-04 17:00", "Grape Family", "", "", "dirección pendiente"),
    ];

    fs::create_dir_all("data")?;
    let mut w = csv::Writer::from_path("data/roster_sample.csv")?;
    w.write_record([
        "Timestamp",
        "Household Name",
        "Address ",
        "Would you like to give your house a fun \"Trick-or-Treat Name\" for the map?",
        "Notes",
    ])?;
    for (ts, household, address, fun, notes) in rows {
        w.write_record([ts, household, address, fun, notes])?;
    }
    w.flush()?;
    println!("OK -> data/roster_sample.csv ({} filas)", rows.len());
    Ok(())
}
