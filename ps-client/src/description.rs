//! Decoder for the analytical metadata packed into a project's `Description`.
//!
//! The upload tooling writes descriptions such as
//! `Strategic Objective: Digital Transformation | Status: In Progress | Health: YELLOW | ROI: 145% | Budget: $2.5M | Alignment: 92%`.
//! Decoding never fails: unknown keys are skipped and malformed numbers become 0.

use serde::Serialize;

/// Fields recovered from a project description. `None` means the key was absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategic_objective: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment_score: Option<f64>,
}

impl DescriptionFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

const BUDGET_MULTIPLIER: f64 = 1_000_000.0;

/// Decode a pipe-delimited description into its known fields.
pub fn decode(text: Option<&str>) -> DescriptionFields {
    let mut fields = DescriptionFields::default();
    let Some(text) = text else {
        return fields;
    };

    for segment in text.split('|') {
        let Some((raw_key, raw_value)) = segment.split_once(':') else {
            continue;
        };
        let key = normalize_key(raw_key);
        let value = raw_value.trim();

        match key.as_str() {
            "strategicobjective" => fields.strategic_objective = Some(value.to_string()),
            "status" => fields.status = Some(value.to_string()),
            "health" => fields.health = Some(value.to_lowercase()),
            "roi" => fields.roi = Some(parse_leading_float(value).unwrap_or(0.0)),
            "budget" => fields.budget = Some(parse_budget(value)),
            "alignment" => fields.alignment_score = Some(parse_leading_float(value).unwrap_or(0.0)),
            _ => {}
        }
    }

    fields
}

fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// `$2.5M` -> 2_500_000, `$1,200` -> 1200, garbage -> 0.
fn parse_budget(value: &str) -> f64 {
    let cleaned: String = value.chars().filter(|c| *c != '$' && *c != ',').collect();
    let cleaned = cleaned.trim();
    let (number, millions) = match cleaned.strip_suffix(['M', 'm']) {
        Some(rest) => (rest.trim_end(), true),
        None => (cleaned, false),
    };

    match parse_leading_float(number) {
        Some(n) if millions => n * BUDGET_MULTIPLIER,
        Some(n) => n,
        None => 0.0,
    }
}

/// Parse the longest numeric prefix of `s` (`"145%"` -> 145, `"abc"` -> None).
pub(crate) fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}
