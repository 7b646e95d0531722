//! Content encodings accepted at the bridge boundary.
//!
//! Exactly two encodings exist. The string form is parsed once, at the
//! edge, before any native call is made; everything past the boundary
//! works with the closed enum.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{FileError, Result};

/// The two supported content encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[serde(rename = "utf-8")]
    Utf8,
    Binary,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Binary => "binary",
        }
    }
}

impl FromStr for Encoding {
    type Err = FileError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "utf-8" => Ok(Encoding::Utf8),
            "binary" => Ok(Encoding::Binary),
            other => Err(FileError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// A read result or write payload: decoded text or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl FileContent {
    /// Decode raw bytes per `encoding`. UTF-8 decode failure is an error;
    /// binary is identity.
    pub fn decode(bytes: Vec<u8>, encoding: Encoding) -> Result<FileContent> {
        match encoding {
            Encoding::Utf8 => Ok(FileContent::Text(String::from_utf8(bytes)?)),
            Encoding::Binary => Ok(FileContent::Bytes(bytes)),
        }
    }

    /// Check that the payload matches the declared encoding: utf-8
    /// carries text, binary carries raw bytes. A mismatch is a caller
    /// error, rejected before any native call.
    pub fn check_encoding(&self, encoding: Encoding) -> Result<()> {
        match (self, encoding) {
            (FileContent::Text(_), Encoding::Utf8) => Ok(()),
            (FileContent::Bytes(_), Encoding::Binary) => Ok(()),
            (FileContent::Text(_), Encoding::Binary) => Err(FileError::UnsupportedEncoding(
                "binary declared for a text payload".to_string(),
            )),
            (FileContent::Bytes(_), Encoding::Utf8) => Err(FileError::UnsupportedEncoding(
                "utf-8 declared for a byte payload".to_string(),
            )),
        }
    }

    /// The byte representation written to the native layer. Text is
    /// UTF-8 by construction, so this is an encode for both variants.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(s) => s.as_bytes(),
            FileContent::Bytes(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_encodings() {
        assert_eq!("utf-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("binary".parse::<Encoding>().unwrap(), Encoding::Binary);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "rot13".parse::<Encoding>().unwrap_err();
        assert!(matches!(err, FileError::UnsupportedEncoding(ref s) if s == "rot13"));
        // Case matters: the enumeration is exactly {"utf-8", "binary"}.
        assert!("UTF-8".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = FileContent::decode(vec![0xff, 0xfe, 0x01], Encoding::Utf8).unwrap_err();
        assert!(matches!(err, FileError::Decode(_)));
    }

    #[test]
    fn test_check_encoding_rejects_mismatched_payload() {
        let text = FileContent::Text("hi".to_string());
        let bytes = FileContent::Bytes(vec![1, 2]);

        text.check_encoding(Encoding::Utf8).unwrap();
        bytes.check_encoding(Encoding::Binary).unwrap();

        assert!(matches!(
            text.check_encoding(Encoding::Binary).unwrap_err(),
            FileError::UnsupportedEncoding(_)
        ));
        assert!(matches!(
            bytes.check_encoding(Encoding::Utf8).unwrap_err(),
            FileError::UnsupportedEncoding(_)
        ));
    }

    #[test]
    fn test_decode_binary_is_identity() {
        let bytes = vec![0xff, 0x00, 0x7f];
        let content = FileContent::decode(bytes.clone(), Encoding::Binary).unwrap();
        assert_eq!(content, FileContent::Bytes(bytes));
    }
}
