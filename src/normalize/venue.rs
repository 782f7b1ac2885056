//! Venue-name cleanup.
//!
//! Publishers spell the same course differently ("Kempton", "KEMPTON PARK",
//! "Kempton  Park (AW)"). Adapters keep the display name they were given;
//! matching always goes through [`venue_key`].

use std::sync::LazyLock;

use regex::Regex;

static PARENTHESISED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*").expect("static regex"));

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// Common variations mapped to the display name used for matching.
const VENUE_ALIASES: &[(&str, &str)] = &[
    ("BANGOR ON DEE", "Bangor-on-Dee"),
    ("CATTERICK BRIDGE", "Catterick"),
    ("CHELMSFORD CITY", "Chelmsford"),
    ("EPSOM DOWNS", "Epsom"),
    ("FONTWELL", "Fontwell Park"),
    ("HAYDOCK", "Haydock Park"),
    ("KEMPTON", "Kempton Park"),
    ("LINGFIELD", "Lingfield Park"),
    ("SANDOWN", "Sandown Park"),
    ("STRATFORD", "Stratford-on-Avon"),
    ("STRATFORD ON AVON", "Stratford-on-Avon"),
    ("YARMOUTH", "Great Yarmouth"),
    ("THE CURRAGH", "Curragh"),
];

/// Trim and collapse internal whitespace. Empty input yields `None`.
pub fn clean_text(text: &str) -> Option<String> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Normalize a venue to its display form: aliases resolved, otherwise title case.
pub fn normalize_venue_name(name: &str) -> Option<String> {
    let cleaned = clean_text(&PARENTHESISED.replace_all(name, " "))?;
    let lookup = cleaned.to_ascii_uppercase().replace('-', " ");

    if let Some((_, canonical)) = VENUE_ALIASES.iter().find(|(alias, _)| *alias == lookup) {
        return Some((*canonical).to_string());
    }
    Some(title_case(&cleaned))
}

/// Matching key for a venue: normalized, lowercased, punctuation folded to `_`.
pub fn venue_key(name: &str) -> String {
    let display = normalize_venue_name(name).unwrap_or_default();
    NON_ALNUM
        .replace_all(&display.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Ascot \t  Heath "), Some("Ascot Heath".into()));
        assert_eq!(clean_text("   "), None);
    }

    #[test]
    fn aliases_resolve() {
        assert_eq!(normalize_venue_name("KEMPTON"), Some("Kempton Park".into()));
        assert_eq!(normalize_venue_name("kempton"), Some("Kempton Park".into()));
        assert_eq!(
            normalize_venue_name("Stratford-on-Avon"),
            Some("Stratford-on-Avon".into())
        );
    }

    #[test]
    fn unknown_venues_are_title_cased() {
        assert_eq!(normalize_venue_name("CHURCHILL DOWNS"), Some("Churchill Downs".into()));
        assert_eq!(normalize_venue_name("santa anita"), Some("Santa Anita".into()));
    }

    #[test]
    fn parenthesised_suffix_is_dropped() {
        assert_eq!(normalize_venue_name("Kempton (AW)"), Some("Kempton Park".into()));
    }

    #[test]
    fn venue_key_matches_across_spellings() {
        assert_eq!(venue_key("Kempton"), "kempton_park");
        assert_eq!(venue_key("KEMPTON PARK"), "kempton_park");
        assert_eq!(venue_key(" kempton  (AW) "), "kempton_park");
        assert_eq!(venue_key("Bangor-on-Dee"), "bangor_on_dee");
        assert_eq!(venue_key("BANGOR ON DEE"), "bangor_on_dee");
    }
}
