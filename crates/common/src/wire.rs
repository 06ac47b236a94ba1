//! Text encoding for binary fields in wire records.
//!
//! Ciphertexts, wrapped keys and signatures travel as standard base64 with
//! padding.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// A binary field in a wire record was not valid base64
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field `{field}` is not valid base64")]
pub struct EncodingError {
    pub field: &'static str,
}

pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 field, naming it in the error
pub fn decode(encoded: &str, field: &'static str) -> Result<Vec<u8>, EncodingError> {
    STANDARD.decode(encoded).map_err(|_| EncodingError { field })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_names_field() {
        let err = decode("not base64!", "ciphertext").unwrap_err();
        assert_eq!(err.field, "ciphertext");
        assert_eq!(err.to_string(), "field `ciphertext` is not valid base64");
    }

    #[test]
    fn test_standard_alphabet_with_padding() {
        assert_eq!(encode([0xfbu8, 0xff]), "+/8=");
        assert_eq!(decode("+/8=", "x").unwrap(), vec![0xfb, 0xff]);
    }
}
