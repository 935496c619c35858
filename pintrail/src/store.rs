//! store.rs
//!
//! Colección canónica de pines y merge entre corridas.
//!
//! - `identity` es única dentro de una colección.
//! - merge(base, incoming): orden de `base` y, al final, las identidades nuevas
//!   en el orden de `incoming`. Campo a campo, un valor no vacío de `incoming`
//!   pisa al de `base`. El icono se recalcula con el texto resultante.
//! - merge(X, X) == X y merge(merge(A, B), B) == merge(A, B).
//!
//! - Todo pin que entra en una colección lleva el icono que dan las reglas
//!   actuales, así que un icono guardado a mano o con otra tabla no sobrevive.
//!
//! El snapshot en disco es un array JSON de `Pin` (se lee y se sobrescribe entero).
//! Una colección sólo se construye con `PinStore`, nunca deserializándola.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{collections::HashMap, fs, path::Path};

use crate::icons::IconRules;
use crate::models::types::Pin;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PinCollection {
    pins: Vec<Pin>,
}

impl PinCollection {
    pub fn new() -> Self { Self::default() }

    pub fn pins(&self) -> &[Pin] { &self.pins }
    pub fn len(&self) -> usize { self.pins.len() }
    pub fn is_empty(&self) -> bool { self.pins.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &Pin> { self.pins.iter() }

    pub fn get(&self, identity: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.identity == identity)
    }
}

impl<'a> IntoIterator for &'a PinCollection {
    type Item = &'a Pin;
    type IntoIter = std::slice::Iter<'a, Pin>;
    fn into_iter(self) -> Self::IntoIter { self.pins.iter() }
}

#[inline]
fn pick(incoming: &str, base: &str) -> String {
    if incoming.trim().is_empty() { base.to_string() } else { incoming.to_string() }
}

/// Merge de pines con la misma identidad (último escritor gana, por campo)
pub fn merge_pin(base: &Pin, incoming: &Pin, rules: &IconRules) -> Pin {
    let display_name = pick(&incoming.display_name, &base.display_name);
    let notes = pick(&incoming.notes, &base.notes);
    let icon = rules.classify(&display_name, &notes);
    Pin {
        identity: base.identity.clone(),
        address: pick(&incoming.address, &base.address),
        display_name,
        notes,
        icon,
        location: incoming.location,
    }
}

pub struct PinStore {
    rules: IconRules,
}

impl PinStore {
    pub fn new(rules: IconRules) -> Self { Self { rules } }

    pub fn rules(&self) -> &IconRules { &self.rules }

    pub fn merge(&self, base: &PinCollection, incoming: &PinCollection) -> PinCollection {
        let mut out = base.clone();
        self.absorb(&mut out, incoming.pins.iter().cloned());
        out
    }

    /// Construye una colección con identidades únicas a partir de pines sueltos
    /// (duplicados: el primero conserva la posición, los siguientes se fusionan en él)
    pub fn collect(&self, pins: impl IntoIterator<Item = Pin>) -> PinCollection {
        let mut out = PinCollection::new();
        self.absorb(&mut out, pins);
        out
    }

    fn absorb(&self, into: &mut PinCollection, pins: impl IntoIterator<Item = Pin>) {
        let mut index: HashMap<String, usize> = into
            .pins
            .iter()
            .enumerate()
            .map(|(i, p)| (p.identity.clone(), i))
            .collect();
        for mut pin in pins {
            match index.get(&pin.identity).copied() {
                Some(i) => {
                    let merged = merge_pin(&into.pins[i], &pin, &self.rules);
                    into.pins[i] = merged;
                }
                None => {
                    pin.icon = self.rules.classify(&pin.display_name, &pin.notes);
                    index.insert(pin.identity.clone(), into.pins.len());
                    into.pins.push(pin);
                }
            }
        }
    }

    /// Snapshot en disco; si no existe se parte de una colección vacía
    pub fn load_snapshot(&self, path: impl AsRef<Path>) -> Result<PinCollection> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(PinCollection::new());
        }
        let text = fs::read_to_string(path).with_context(|| format!("leyendo {}", path.display()))?;
        let pins: Vec<Pin> = serde_json::from_str(&text).with_context(|| format!("snapshot inválido: {}", path.display()))?;
        Ok(self.collect(pins))
    }
}

/// Escribe el snapshot (tmp + rename para no dejar ficheros a medias)
pub fn save_snapshot(path: impl AsRef<Path>, pins: &PinCollection) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creando {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(pins)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("escribiendo {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("renombrando a {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::{Coordinate, IconTag};

    fn pin(id: &str, name: &str, lat: f64) -> Pin {
        let rules = IconRules::default();
        Pin {
            identity: id.into(),
            address: format!("{id} street"),
            display_name: name.into(),
            notes: String::new(),
            icon: rules.classify(name, ""),
            location: Coordinate::new(lat, -80.3),
        }
    }

    fn coll(pins: Vec<Pin>) -> PinCollection { PinStore::new(IconRules::default()).collect(pins) }

    #[test]
    fn incoming_non_empty_fields_win_and_icon_is_recomputed() {
        let store = PinStore::new(IconRules::default());
        let mut base_pin = pin("A", "", 1.0);
        base_pin.location = Coordinate::new(1.0, 1.0);
        assert_eq!(base_pin.icon, IconTag::Default);
        let mut inc_pin = pin("A", "Spooky House", 1.0);
        inc_pin.location = Coordinate::new(1.0, 1.0);
        inc_pin.address = String::new();
        inc_pin.icon = IconTag::Default; // se ignora: se recalcula

        let out = store.merge(&coll(vec![base_pin]), &coll(vec![inc_pin]));
        assert_eq!(out.len(), 1);
        let p = &out.pins()[0];
        assert_eq!(p.display_name, "Spooky House");
        assert_eq!(p.icon, IconTag::Ghost);
        assert_eq!(p.address, "A street");
        assert_eq!(p.location, Coordinate::new(1.0, 1.0));
    }

    #[test]
    fn new_identities_are_appended_in_incoming_order() {
        let store = PinStore::new(IconRules::default());
        let a = coll(vec![pin("A", "a", 1.0), pin("B", "b", 2.0)]);
        let b = coll(vec![pin("D", "d", 4.0), pin("B", "bee", 2.5), pin("C", "c", 3.0)]);
        let out = store.merge(&a, &b);
        let ids: Vec<_> = out.iter().map(|p| p.identity.as_str()).collect();
        assert_eq!(ids, ["A", "B", "D", "C"]);
        assert_eq!(out.get("B").unwrap().display_name, "bee");
        assert_eq!(out.get("B").unwrap().location.latitude, 2.5);
    }

    #[test]
    fn merge_is_idempotent() {
        let store = PinStore::new(IconRules::default());
        let a = coll(vec![pin("A", "Witch Way", 1.0), pin("B", "", 2.0)]);
        let mut b_only = pin("B", "Bat Cave", 2.1);
        b_only.notes = "fog".into();
        let b = coll(vec![b_only, pin("C", "", 3.0)]);

        assert_eq!(store.merge(&a, &a), a);
        let ab = store.merge(&a, &b);
        assert_eq!(store.merge(&ab, &b), ab);
        assert_eq!(store.merge(&ab, &ab), ab);
    }

    #[test]
    fn collect_folds_duplicates_into_first_slot() {
        let out = coll(vec![pin("A", "first", 1.0), pin("B", "b", 2.0), pin("A", "", 9.0)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out.pins()[0].identity, "A");
        assert_eq!(out.pins()[0].display_name, "first");
        assert_eq!(out.pins()[0].location.latitude, 9.0);
    }

    #[test]
    fn snapshot_roundtrip_and_self_merge_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export").join("pins.json");
        let store = PinStore::new(IconRules::default());

        assert!(store.load_snapshot(&path).unwrap().is_empty());

        let a = coll(vec![pin("A", "Haunted", 1.0), pin("B", "Candy Land", 2.0)]);
        save_snapshot(&path, &a).unwrap();
        let back = store.load_snapshot(&path).unwrap();
        assert_eq!(back, a);
        assert_eq!(store.merge(&back, &back), a);

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["identity"], "A");
        assert_eq!(raw[0]["icon"], "GHOST");
        assert!(raw[0]["latitude"].is_number());
    }

    #[test]
    fn stored_icon_is_normalised_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pins.json");
        fs::write(
            &path,
            r#"[{"identity":"grape family","address":"1 Vine St","displayName":"Grape Family","icon":"CANDY","latitude":25.74,"longitude":-80.3}]"#,
        )
        .unwrap();
        let store = PinStore::new(IconRules::default());

        let x = store.load_snapshot(&path).unwrap();
        assert_eq!(x.pins()[0].icon, IconTag::Default);
        assert_eq!(store.merge(&x, &x), x);
    }

    #[test]
    fn merge_twice_with_stale_icon_is_stable() {
        let store = PinStore::new(IconRules::default());
        let a = coll(vec![pin("A", "Witch Way", 1.0)]);
        let mut stale = pin("smith", "Smith", 2.0);
        stale.icon = IconTag::Cabin;
        let b = store.collect(vec![stale]);
        assert_eq!(b.pins()[0].icon, IconTag::Default);

        let ab = store.merge(&a, &b);
        assert_eq!(ab.get("smith").unwrap().icon, IconTag::Default);
        assert_eq!(store.merge(&ab, &b), ab);
    }

    #[test]
    fn duplicated_identity_in_snapshot_collapses_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pins.json");
        fs::write(
            &path,
            r#"[{"identity":"a","address":"1 A St","displayName":"Bat Cave","icon":"BAT","latitude":25.74,"longitude":-80.3},
                {"identity":"a","address":"","displayName":"","icon":"DEFAULT","latitude":25.75,"longitude":-80.31}]"#,
        )
        .unwrap();
        let x = PinStore::new(IconRules::default()).load_snapshot(&path).unwrap();
        assert_eq!(x.len(), 1);
        assert_eq!(x.pins()[0].display_name, "Bat Cave");
        assert_eq!(x.pins()[0].icon, IconTag::Bat);
        assert_eq!(x.pins()[0].location, Coordinate::new(25.75, -80.31));
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pins.json");
        fs::write(&path, "{not json").unwrap();
        assert!(PinStore::new(IconRules::default()).load_snapshot(&path).is_err());
    }
}
