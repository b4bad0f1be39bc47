//! # ERP Vocabulary
//!
//! Translation of the ERP's uppercase Portuguese labels to local enums.
//!
//! ```text
//! "camiseta" ─► uppercase ─► "CAMISETA" ─► table lookup ─► Category::TShirt
//! "TUNICA"   ─►    ...    ─► no entry   ─► fallback     ─► Category::TShirt
//! missing    ────────────────────────────► fallback
//! ```
//!
//! Lookups never fail; every table has a fallback.

use stockbridge_core::{AgeBracket, Category, Gender, InventoryStatus, Season};

const CATEGORIES: &[(&str, Category)] = &[
    ("CAMISETA", Category::TShirt),
    ("CALCA", Category::Pants),
    ("SHORT", Category::Shorts),
    ("VESTIDO", Category::Dress),
    ("BLUSA", Category::Blouse),
    ("JAQUETA", Category::Jacket),
    ("CASACO", Category::Coat),
    ("SAIA", Category::Skirt),
    ("BERMUDA", Category::Bermuda),
    ("MACACAO", Category::Jumpsuit),
    ("CONJUNTO", Category::Set),
    ("ACESSORIOS", Category::Accessories),
];

const SEASONS: &[(&str, Season)] = &[
    ("VERAO", Season::Summer),
    ("INVERNO", Season::Winter),
    ("OUTONO", Season::Autumn),
    ("PRIMAVERA", Season::Spring),
    ("ANO_TODO", Season::YearRound),
];

const GENDERS: &[(&str, Gender)] = &[
    ("MASCULINO", Gender::Male),
    ("FEMININO", Gender::Female),
    ("INFANTIL", Gender::Kids),
    ("UNISSEX", Gender::Unisex),
];

const AGE_BRACKETS: &[(&str, AgeBracket)] = &[
    ("BEBE", AgeBracket::Baby),
    ("INFANTIL", AgeBracket::Child),
    ("JUVENIL", AgeBracket::Teen),
    ("ADULTO", AgeBracket::Adult),
];

const STATUSES: &[(&str, InventoryStatus)] = &[
    ("DISPONIVEL", InventoryStatus::Available),
    ("RESERVADO", InventoryStatus::Reserved),
    ("QUARENTENA", InventoryStatus::Quarantine),
    ("DANIFICADO", InventoryStatus::Damaged),
    ("EM_TRANSITO", InventoryStatus::InTransit),
];

fn lookup<T: Copy>(table: &[(&str, T)], raw: Option<&str>, fallback: T) -> T {
    let Some(raw) = raw else {
        return fallback;
    };
    let key = raw.trim().to_uppercase();
    table
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, value)| *value)
        .unwrap_or(fallback)
}

pub fn category(raw: Option<&str>) -> Category {
    lookup(CATEGORIES, raw, Category::TShirt)
}

pub fn season(raw: Option<&str>) -> Season {
    lookup(SEASONS, raw, Season::YearRound)
}

pub fn gender(raw: Option<&str>) -> Gender {
    lookup(GENDERS, raw, Gender::Unisex)
}

pub fn age_bracket(raw: Option<&str>) -> AgeBracket {
    lookup(AGE_BRACKETS, raw, AgeBracket::Adult)
}

pub fn inventory_status(raw: Option<&str>) -> InventoryStatus {
    lookup(STATUSES, raw, InventoryStatus::Available)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels() {
        assert_eq!(category(Some("MACACAO")), Category::Jumpsuit);
        assert_eq!(season(Some("ANO_TODO")), Season::YearRound);
        assert_eq!(gender(Some("FEMININO")), Gender::Female);
        assert_eq!(age_bracket(Some("JUVENIL")), AgeBracket::Teen);
        assert_eq!(inventory_status(Some("EM_TRANSITO")), InventoryStatus::InTransit);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(category(Some("calca")), Category::Pants);
        assert_eq!(season(Some(" Inverno ")), Season::Winter);
        assert_eq!(inventory_status(Some("quarentena")), InventoryStatus::Quarantine);
    }

    #[test]
    fn test_unknown_or_missing_falls_back() {
        assert_eq!(category(Some("TUNICA")), Category::TShirt);
        assert_eq!(category(None), Category::TShirt);
        assert_eq!(season(Some("MONCAO")), Season::YearRound);
        assert_eq!(gender(None), Gender::Unisex);
        assert_eq!(age_bracket(Some("")), AgeBracket::Adult);
        assert_eq!(inventory_status(Some("VENDIDO")), InventoryStatus::Available);
    }

    #[test]
    fn test_infantil_means_different_things_per_field() {
        assert_eq!(gender(Some("INFANTIL")), Gender::Kids);
        assert_eq!(age_bracket(Some("INFANTIL")), AgeBracket::Child);
    }
}
