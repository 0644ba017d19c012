//! Serde adapters for base64-encoded byte fields.
//!
//! The wire uses standard base64 with padding. Apply with
//! `#[serde(with = "b64")]` for required fields, `b64::opt` for nullable
//! fields, and `b64::seq_opt` for arrays of nullable entries.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

/// Serialize bytes as a base64 string.
pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

/// Deserialize a base64 string into bytes.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(D::Error::custom)
}

/// Adapter for `Option<Vec<u8>>`: base64 string or `null`.
pub mod opt {
    use super::*;

    /// Serialize optional bytes as base64 or `null`.
    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize base64 or `null` into optional bytes.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD.decode(encoded).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

/// Adapter for `Vec<Option<Vec<u8>>>`: an array of base64-or-`null`
/// entries (the public-key snapshot in a welcome).
pub mod seq_opt {
    use super::*;
    use serde::ser::SerializeSeq;

    /// Serialize a nullable byte-string array.
    pub fn serialize<S: Serializer>(
        entries: &[Option<Vec<u8>>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(entries.len()))?;
        for entry in entries {
            seq.serialize_element(&entry.as_deref().map(|bytes| STANDARD.encode(bytes)))?;
        }
        seq.end()
    }

    /// Deserialize a nullable byte-string array.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Option<Vec<u8>>>, D::Error> {
        let encoded = Vec::<Option<String>>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|entry| {
                entry.map(|encoded| STANDARD.decode(encoded).map_err(D::Error::custom)).transpose()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "crate::b64")]
        required: Vec<u8>,
        #[serde(with = "crate::b64::opt")]
        nullable: Option<Vec<u8>>,
        #[serde(with = "crate::b64::seq_opt")]
        snapshot: Vec<Option<Vec<u8>>>,
    }

    #[test]
    fn round_trip_all_adapters() {
        let holder = Holder {
            required: vec![1, 2, 3],
            nullable: None,
            snapshot: vec![Some(vec![0xFF]), None, Some(vec![])],
        };

        let json = serde_json::to_string(&holder).unwrap();
        let decoded: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(holder, decoded);
    }

    #[test]
    fn wire_shape_is_padded_base64() {
        let holder = Holder {
            required: vec![0xDE, 0xAD, 0xBE, 0xEF],
            nullable: Some(vec![0x00]),
            snapshot: vec![],
        };
        let json = serde_json::to_string(&holder).unwrap();
        assert!(json.contains("\"3q2+7w==\""));
        assert!(json.contains("\"AA==\""));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let result: Result<Holder, _> = serde_json::from_str(
            r#"{"required":"not base64!!","nullable":null,"snapshot":[]}"#,
        );
        assert!(result.is_err());
    }
}
