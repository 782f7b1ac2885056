//! Conversion of every accepted odds notation to canonical decimal odds.
//!
//! Accepted inputs:
//! - decimal: `"3.5"`, `"2"`
//! - fractional: `"5/2"`, `"5-2"` → `1 + 5/2`
//! - words: `"EVS"`, `"EVENS"`, `"EVEN"` → `2.0`
//! - non-prices: `"SP"`, `"SCR"`, `"SCRATCHED"`, `"NR"`, `""` → no odds
//!
//! Anything unparseable, and any result below 1.0, is treated as no odds.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

static FRACTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)\s*[/\-]\s*(\d+(?:\.\d+)?)$").expect("static regex")
});

const EVENS: &[&str] = &["EVS", "EVENS", "EVEN", "EVN"];
const NO_PRICE: &[&str] = &["", "SP", "SCR", "SCRATCHED", "NR", "N/A", "-"];

/// Parse a textual odds representation into decimal odds ≥ 1.0.
pub fn parse_odds(raw: &str) -> Option<Decimal> {
    let text = raw.trim().to_ascii_uppercase();

    if NO_PRICE.contains(&text.as_str()) {
        return None;
    }
    if EVENS.contains(&text.as_str()) {
        return Some(Decimal::TWO);
    }

    let value = if let Some(caps) = FRACTIONAL.captures(&text) {
        let num = Decimal::from_str(&caps[1]).ok()?;
        let den = Decimal::from_str(&caps[2]).ok()?;
        if den.is_zero() {
            return None;
        }
        Decimal::ONE.checked_add(num.checked_div(den)?)?
    } else {
        Decimal::from_str(&text).ok()?
    };

    validate(value)
}

/// Accept an already-numeric price.
pub fn decimal_odds(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok().and_then(validate)
}

/// Accept a price from a JSON document, either as a number or as text.
pub fn odds_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().and_then(decimal_odds),
        serde_json::Value::String(s) => parse_odds(s),
        _ => None,
    }
}

/// Reject prices that cannot be decimal odds.
pub fn validate(value: Decimal) -> Option<Decimal> {
    (value >= Decimal::ONE).then(|| value.normalize())
}
