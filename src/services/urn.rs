//! URN encoding: the external handle for an uploaded object is its object id
//! in standard base64 with the `=` padding stripped.

use base64::{
    Engine as _,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::STANDARD},
};
use thiserror::Error;

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrnError {
    #[error("urn is not valid base64: {0}")]
    Encoding(String),
    #[error("urn does not decode to UTF-8 text")]
    NotUtf8,
}

/// Encode an object id as a URN.
pub fn urnify(object_id: &str) -> String {
    let mut encoded = STANDARD.encode(object_id);
    let trimmed = encoded.trim_end_matches('=').len();
    encoded.truncate(trimmed);
    encoded
}

/// Recover the object id from a URN, padded or not.
///
/// URL-safe input (`-`, `_`) is accepted as well since viewers commonly
/// re-encode URNs that way.
pub fn deurnify(urn: &str) -> Result<String, UrnError> {
    let bytes = STANDARD_LENIENT
        .decode(urn)
        .or_else(|_| URL_SAFE_LENIENT.decode(urn))
        .map_err(|err| UrnError::Encoding(err.to_string()))?;
    String::from_utf8(bytes).map_err(|_| UrnError::NotUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(urn: &str) -> String {
        let missing = (4 - urn.len() % 4) % 4;
        format!("{}{}", urn, "=".repeat(missing))
    }

    #[test]
    fn known_object_id() {
        let id = "urn:adsk.objects:os.object:abc-basic-app/box.obj";
        let urn = urnify(id);
        assert_eq!(
            urn,
            "dXJuOmFkc2sub2JqZWN0czpvcy5vYmplY3Q6YWJjLWJhc2ljLWFwcC9ib3gub2Jq"
        );
        assert_eq!(deurnify(&urn).unwrap(), id);
    }

    #[test]
    fn padding_is_stripped_and_recovered() {
        for id in ["a", "ab", "abc", "abcd", "urn:x/y.zip", "", "ünïcødé/模型.rvt"] {
            let urn = urnify(id);
            assert!(!urn.contains('='), "{urn} still padded");
            assert_eq!(deurnify(&urn).unwrap(), id);
            assert_eq!(deurnify(&padded(&urn)).unwrap(), id);
        }
    }

    #[test]
    fn url_safe_input_is_accepted() {
        let id = "urn:adsk.objects:os.object:b/??>>.obj";
        let urn = urnify(id);
        let url_safe = urn.replace('+', "-").replace('/', "_");
        assert_eq!(deurnify(&url_safe).unwrap(), id);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(deurnify("not base64!"), Err(UrnError::Encoding(_))));
        assert_eq!(deurnify(&STANDARD.encode([0xff, 0xfe])), Err(UrnError::NotUtf8));
    }
}
