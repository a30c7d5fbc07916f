//! Recognising TPMS beacons by their advertised name.

use crate::advertising::{AdField, AdType};

/// Substring a complete local name must contain for the device to count as a
/// tire pressure sensor. Matching is case-sensitive.
pub const TPMS_NAME_PATTERN: &[u8] = b"TPMS";

/// Names are cut to this many bytes before matching.
pub const MAX_NAME_LENGTH: usize = 15;

/// The (possibly truncated) name of a recognised beacon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconName(pub String);

impl BeaconName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BeaconName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check whether `field` is a complete local name naming a TPMS beacon.
///
/// Returns the truncated name on a match. Fields of any other type, and names
/// without the pattern, give `None`. Non-UTF-8 bytes are matched as raw bytes
/// and replaced in the returned name.
pub fn match_beacon(field: &AdField<'_>) -> Option<BeaconName> {
    if field.ad_type != AdType::COMPLETE_LOCAL_NAME {
        return None;
    }

    let name = &field.value[..field.value.len().min(MAX_NAME_LENGTH)];
    if !contains(name, TPMS_NAME_PATTERN) {
        return None;
    }

    Some(BeaconName(String::from_utf8_lossy(name).into_owned()))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_field(value: &[u8]) -> AdField<'_> {
        AdField {
            ad_type: AdType::COMPLETE_LOCAL_NAME,
            value,
        }
    }

    #[test]
    fn test_matches_substring_anywhere() {
        assert_eq!(
            match_beacon(&name_field(b"MY-TPMS-42")),
            Some(BeaconName("MY-TPMS-42".to_string()))
        );
        assert!(match_beacon(&name_field(b"MYTPMS")).is_some());
        assert!(match_beacon(&name_field(b"TPMS")).is_some());
    }

    #[test]
    fn test_match_is_case_sensitive() {
        assert_eq!(match_beacon(&name_field(b"tpms")), None);
        assert_eq!(match_beacon(&name_field(b"Tpms-FL")), None);
    }

    #[test]
    fn test_no_pattern_no_match() {
        assert_eq!(match_beacon(&name_field(b"SmartBulb")), None);
        assert_eq!(match_beacon(&name_field(b"TPM")), None);
        assert_eq!(match_beacon(&name_field(b"")), None);
    }

    #[test]
    fn test_other_field_types_ignored() {
        let shortened = AdField {
            ad_type: AdType::SHORTENED_LOCAL_NAME,
            value: b"TPMS",
        };
        assert_eq!(match_beacon(&shortened), None);

        let manufacturer = AdField {
            ad_type: AdType::MANUFACTURER_SPECIFIC_DATA,
            value: b"TPMS",
        };
        assert_eq!(match_beacon(&manufacturer), None);
    }

    #[test]
    fn test_long_name_truncated_before_matching() {
        let matched = match_beacon(&name_field(b"ABCDEFGHIJKTPMS-EXTRA")).unwrap();
        assert_eq!(matched.as_str(), "ABCDEFGHIJKTPMS");
        assert_eq!(matched.as_str().len(), MAX_NAME_LENGTH);

        // Pattern straddles the cut and is lost.
        assert_eq!(match_beacon(&name_field(b"ABCDEFGHIJKLTPMS")), None);
    }

    #[test]
    fn test_truncation_stays_within_field() {
        // The value is a sub-slice of a larger buffer; truncation must only
        // see the field's own bytes even though more follow in memory.
        let buffer = b"xxTPMyyyyyyyyyyyyyyyyS";
        let field = name_field(&buffer[2..5]);
        assert_eq!(match_beacon(&field), None);

        let field = name_field(&buffer[..5]);
        assert_eq!(match_beacon(&field), None);
    }

    #[test]
    fn test_non_utf8_name() {
        let matched = match_beacon(&name_field(&[0xFF, b'T', b'P', b'M', b'S'])).unwrap();
        assert_eq!(matched.as_str(), "\u{FFFD}TPMS");
    }
}
