//! icons.rs
//!
//! Clasificador de iconos temáticos.
//!
//! - Lista ORDENADA de reglas (palabras clave -> `IconTag`); gana la primera que case.
//! - Se evalúa sobre `label + " " + notes` en minúsculas.
//! - Total: si ninguna regla casa se devuelve `IconTag::Default`.
//!
//! El clasificador emite la etiqueta, nunca el glifo (ver `render::glyph`).

use serde::{Deserialize, Serialize};

use crate::models::types::IconTag;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IconRule {
    pub tag: IconTag,
    /// Casa si el texto contiene cualquiera de estas palabras (ya en minúsculas)
    pub keywords: Vec<String>,
}

impl IconRule {
    pub fn new(tag: IconTag, keywords: &[&str]) -> Self {
        Self { tag, keywords: keywords.iter().map(|k| k.to_lowercase()).collect() }
    }

    #[inline]
    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| !k.is_empty() && text.contains(k.as_str()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IconRules {
    pub rules: Vec<IconRule>,
}

impl IconRules {
    pub fn new(rules: Vec<IconRule>) -> Self { Self { rules } }

    pub fn classify(&self, label: &str, notes: &str) -> IconTag {
        let text = format!("{label} {notes}").to_lowercase();
        self.rules
            .iter()
            .find(|r| r.matches(&text))
            .map(|r| r.tag)
            .unwrap_or(IconTag::Default)
    }
}

impl Default for IconRules {
    fn default() -> Self {
        use IconTag::*;
        // "haunt" antes que "monster"/"house"; "white house" es más específico que "blue"/"boo"
        Self::new(vec![
            IconRule::new(Ghost, &["haunt", "ghost", "spooky"]),
            IconRule::new(Witch, &["witch", "magic"]),
            IconRule::new(Cat, &["cat"]),
            IconRule::new(Bat, &["bat", "vampire"]),
            IconRule::new(Spider, &["spider", "web"]),
            IconRule::new(Zombie, &["zombie", "dead"]),
            IconRule::new(Skeleton, &["skeleton", "bones", "skull"]),
            IconRule::new(Candy, &["candy", "sweet", "treat"]),
            IconRule::new(Bird, &["bird", "cardinal"]),
            IconRule::new(Monster, &["monster"]),
            IconRule::new(Cabin, &["cabin", "woods"]),
            IconRule::new(Snake, &["snake"]),
            IconRule::new(WhiteHouse, &["white house"]),
            IconRule::new(Blue, &["blue", "boo"]),
            IconRule::new(Sparkle, &["rizzler", "sparkle"]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        let rules = IconRules::default();
        assert_eq!(rules.classify("Haunted Monster House", ""), IconTag::Ghost);
        assert_eq!(rules.classify("The monster house", ""), IconTag::Monster);
        assert_eq!(rules.classify("The haunted White House", ""), IconTag::Ghost);
        assert_eq!(rules.classify("The White House", ""), IconTag::WhiteHouse);
        assert_eq!(rules.classify("Spooky House", ""), IconTag::Ghost);
    }

    #[test]
    fn notes_participate_and_case_is_ignored() {
        let rules = IconRules::default();
        assert_eq!(rules.classify("Number 12", "Full-size CANDY bars"), IconTag::Candy);
        assert_eq!(rules.classify("Spiderweb Cottage", ""), IconTag::Spider);
        assert_eq!(rules.classify("Casa Sandsnake", ""), IconTag::Snake);
        assert_eq!(rules.classify("Cabin in the Woods", ""), IconTag::Cabin);
        assert_eq!(rules.classify("The Spooky-Rizzlers", ""), IconTag::Ghost);
        assert_eq!(rules.classify("Rizzler HQ", ""), IconTag::Sparkle);
    }

    #[test]
    fn classify_is_total() {
        let rules = IconRules::default();
        assert_eq!(rules.classify("", ""), IconTag::Default);
        assert_eq!(rules.classify("Smith", ""), IconTag::Default);
        assert_eq!(rules.classify("House", ""), IconTag::Default);
        // sin reglas todo cae en Default
        assert_eq!(IconRules::new(vec![]).classify("ghost", "bat"), IconTag::Default);
    }

    #[test]
    fn every_tag_is_reachable() {
        let rules = IconRules::default();
        for tag in IconTag::ALL {
            if tag == IconTag::Default { continue; }
            let rule = rules.rules.iter().find(|r| r.tag == tag).expect("regla para cada tag");
            // la primera palabra de su propia regla no debe quedar tapada por una regla anterior
            assert_eq!(rules.classify(&rule.keywords[0], ""), tag, "{tag}");
        }
    }

    #[test]
    fn custom_order_changes_result() {
        let rules = IconRules::new(vec![
            IconRule::new(IconTag::Monster, &["monster"]),
            IconRule::new(IconTag::Ghost, &["haunted"]),
        ]);
        assert_eq!(rules.classify("Haunted Monster House", ""), IconTag::Monster);
    }
}
