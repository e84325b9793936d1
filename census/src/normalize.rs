//! District names from the composite labels of the population table.
//!
//! Labels look like `"종로구 청운효자동(1111051500)"` or, in the national
//! export, `"서울특별시 종로구 청운효자동(1111051500)"`. The boundary data only
//! carries the 행정동 name, so the label is cut down to its last token.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("label {0:?} has no space separating district and subdivision")]
    MissingSeparator(String),
    #[error("label {0:?} has no subdivision name")]
    EmptyName(String),
}

/// The pieces of a population label used as join keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedName {
    /// Token right before the short name, usually the parent 구/시/군.
    pub district: Option<String>,
    pub full_name: String,
    pub short_name: String,
}

fn strip_code_suffix(label: &str) -> &str {
    match label.rfind('(') {
        Some(idx) => &label[..idx],
        None => label,
    }
}

/// Everything after the first space and before the `(code)` suffix.
pub fn extract_full_name(raw_label: &str) -> Result<String, NormalizeError> {
    let (_, rest) = raw_label
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(|| NormalizeError::MissingSeparator(raw_label.to_string()))?;
    let full = strip_code_suffix(rest).trim();
    if full.is_empty() {
        return Err(NormalizeError::EmptyName(raw_label.to_string()));
    }
    Ok(full.to_string())
}

/// Last whitespace-delimited token of a full name.
///
/// Multi-word subdivision names lose their leading words here; that is the
/// accepted heuristic.
pub fn extract_short_name(full_name: &str) -> Result<String, NormalizeError> {
    full_name
        .split_whitespace()
        .last()
        .map(str::to_string)
        .ok_or_else(|| NormalizeError::EmptyName(full_name.to_string()))
}

pub fn normalize_label(raw_label: &str) -> Result<NormalizedName, NormalizeError> {
    let full_name = extract_full_name(raw_label)?;
    let short_name = extract_short_name(&full_name)?;

    let tokens: Vec<&str> = strip_code_suffix(raw_label).split_whitespace().collect();
    let district = match tokens.len() {
        0 | 1 => None,
        n => Some(tokens[n - 2].to_string()),
    };

    Ok(NormalizedName {
        district,
        full_name,
        short_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_drops_code_suffix() {
        assert_eq!(
            extract_full_name("종로구 청운효자동(1111051500)").unwrap(),
            "청운효자동"
        );
    }

    #[test]
    fn full_name_without_parenthesis_is_remainder() {
        assert_eq!(extract_full_name("종로구 사직동").unwrap(), "사직동");
    }

    #[test]
    fn full_name_keeps_inner_words() {
        assert_eq!(
            extract_full_name("서울특별시 종로구 청운효자동(1111051500)").unwrap(),
            "종로구 청운효자동"
        );
    }

    #[test]
    fn no_space_is_an_error() {
        assert_eq!(
            extract_full_name("청운효자동(1111051500)"),
            Err(NormalizeError::MissingSeparator(
                "청운효자동(1111051500)".to_string()
            ))
        );
    }

    #[test]
    fn city_total_row_has_no_name() {
        // The national export has rows like this for the 시/도 total.
        assert!(matches!(
            extract_full_name("서울특별시  (1100000000)"),
            Err(NormalizeError::EmptyName(_))
        ));
    }

    #[test]
    fn short_name_is_last_token() {
        assert_eq!(extract_short_name("종로구 청운효자동").unwrap(), "청운효자동");
        assert_eq!(extract_short_name("청운효자동").unwrap(), "청운효자동");
        assert!(extract_short_name("   ").is_err());
    }

    #[test]
    fn normalize_finds_parent_district() {
        let name = normalize_label("서울특별시 강남구 신사동(1168051000)").unwrap();
        assert_eq!(name.district.as_deref(), Some("강남구"));
        assert_eq!(name.full_name, "강남구 신사동");
        assert_eq!(name.short_name, "신사동");

        let name = normalize_label("은평구 신사동").unwrap();
        assert_eq!(name.district.as_deref(), Some("은평구"));
    }
}
