
use serde::Serialize;
use strum_macros::EnumString;

/// The case convention a source project applies to the marker prefix of its sample identifiers.
/// Pf8 publishes the prefix upper-cased while GenRe Mekong lower-cases it; encoding the rule
/// per source lets new sources join without touching the normalization logic.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum_macros::Display, EnumString, Serialize, clap::ValueEnum)]
pub enum CaseRule {
    /// The marker prefix is published upper-case
    #[default]
    #[strum(ascii_case_insensitive, serialize = "upper")]
    #[clap(name = "upper")]
    Upper,
    /// The marker prefix is published lower-case
    #[strum(ascii_case_insensitive, serialize = "lower")]
    #[clap(name = "lower")]
    Lower
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum IdentifierFormatError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier {raw:?} does not match the <letters><digits> layout")]
    Layout { raw: String },
    #[error("identifier {raw:?} does not follow the {rule} prefix convention")]
    CaseConvention { raw: String, rule: CaseRule }
}

/// Canonicalizes a raw sample identifier into the shared key format.
/// Identifiers are an alphabetic marker prefix followed by digits; the canonical form
/// upper-cases the prefix. Already-canonical input is accepted under either rule, so
/// the function is idempotent.
/// # Arguments
/// * `raw_id` - the identifier as it appears in the source table
/// * `rule` - the case convention declared for the originating source
/// # Errors
/// * if the identifier is empty or does not split into a letter prefix and a digit suffix
/// * if the prefix casing matches neither the source convention nor the canonical form
pub fn normalize_sample_key(raw_id: &str, rule: CaseRule) -> Result<String, IdentifierFormatError> {
    let trimmed = raw_id.trim();
    if trimmed.is_empty() {
        return Err(IdentifierFormatError::Empty);
    }

    let digit_start = trimmed.find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| IdentifierFormatError::Layout { raw: trimmed.to_string() })?;
    let (prefix, digits) = trimmed.split_at(digit_start);

    // prefix must be all letters, suffix all digits, and neither can be empty
    if prefix.is_empty() ||
        !prefix.chars().all(|c| c.is_ascii_alphabetic()) ||
        !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(IdentifierFormatError::Layout { raw: trimmed.to_string() });
    }

    let is_upper = prefix.chars().all(|c| c.is_ascii_uppercase());
    let is_lower = prefix.chars().all(|c| c.is_ascii_lowercase());
    let convention_ok = match rule {
        // upper-case sources only ever present the canonical form
        CaseRule::Upper => is_upper,
        // lower-case sources present their own convention OR an already-canonical key
        CaseRule::Lower => is_lower || is_upper
    };
    if !convention_ok {
        return Err(IdentifierFormatError::CaseConvention { raw: trimmed.to_string(), rule });
    }

    Ok(format!("{}{digits}", prefix.to_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_key_across_conventions() {
        // the same sample published under the two conventions must land on one key
        let from_wgs = normalize_sample_key("ABC123", CaseRule::Upper).unwrap();
        let from_amplicon = normalize_sample_key("abc123", CaseRule::Lower).unwrap();
        assert_eq!(from_wgs, "ABC123");
        assert_eq!(from_wgs, from_amplicon);
    }

    #[test]
    fn test_idempotent() {
        for rule in [CaseRule::Upper, CaseRule::Lower] {
            let canonical = normalize_sample_key("RCN13568", rule).unwrap();
            assert_eq!(canonical, "RCN13568");
            assert_eq!(normalize_sample_key(&canonical, rule).unwrap(), canonical);
        }
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(normalize_sample_key(" rcn13560\t", CaseRule::Lower).unwrap(), "RCN13560");
    }

    #[test]
    fn test_layout_errors() {
        assert_eq!(normalize_sample_key("", CaseRule::Upper), Err(IdentifierFormatError::Empty));
        assert_eq!(
            normalize_sample_key("12345", CaseRule::Upper),
            Err(IdentifierFormatError::Layout { raw: "12345".to_string() })
        );
        assert_eq!(
            normalize_sample_key("RCN", CaseRule::Upper),
            Err(IdentifierFormatError::Layout { raw: "RCN".to_string() })
        );
        assert_eq!(
            normalize_sample_key("RCN12A3", CaseRule::Upper),
            Err(IdentifierFormatError::Layout { raw: "RCN12A3".to_string() })
        );
    }

    #[test]
    fn test_case_convention_errors() {
        // an upper source never presents a lower-case prefix
        assert_eq!(
            normalize_sample_key("abc123", CaseRule::Upper),
            Err(IdentifierFormatError::CaseConvention { raw: "abc123".to_string(), rule: CaseRule::Upper })
        );
        // mixed-case prefixes are malformed under either rule
        assert_eq!(
            normalize_sample_key("AbC123", CaseRule::Lower),
            Err(IdentifierFormatError::CaseConvention { raw: "AbC123".to_string(), rule: CaseRule::Lower })
        );
    }
}
