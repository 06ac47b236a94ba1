use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{from_bytes, to_bytes, VersionedRecord};
use crate::error::SchemaError;

/// First layout: title, note and payload
pub const CONTENT_FORMAT_V1: u16 = 1;
/// Adds custom fields
pub const CONTENT_FORMAT_V2: u16 = 2;
pub const CURRENT_CONTENT_FORMAT_VERSION: u16 = CONTENT_FORMAT_V2;

const REDACTED: &str = "[REDACTED]";

/// Decrypted item content
///
/// Wiped from memory on drop. `Debug` hides the note and every secret field.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ItemContent {
    pub title: String,
    pub note: String,
    pub payload: ItemPayload,
    pub custom_fields: Vec<CustomField>,
}

/// The typed part of an item. One variant per item kind.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
pub enum ItemPayload {
    Note,
    Login {
        username: String,
        password: String,
        urls: Vec<String>,
        totp_uri: Option<String>,
    },
    Alias {
        email: String,
    },
    CreditCard {
        cardholder_name: String,
        number: String,
        expiration_date: String,
        verification_number: String,
        pin: String,
    },
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
pub struct CustomField {
    pub name: String,
    pub value: CustomFieldValue,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
pub enum CustomFieldValue {
    Text(String),
    Hidden(String),
    Totp(String),
}

#[derive(Serialize, Deserialize)]
struct ItemContentV1 {
    title: String,
    note: String,
    payload: ItemPayload,
}

impl ItemContent {
    pub fn note(title: impl Into<String>, note: impl Into<String>) -> Self {
        ItemContent {
            title: title.into(),
            note: note.into(),
            payload: ItemPayload::Note,
            custom_fields: Vec::new(),
        }
    }

    pub fn login(
        title: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        urls: Vec<String>,
    ) -> Self {
        ItemContent {
            title: title.into(),
            note: String::new(),
            payload: ItemPayload::Login {
                username: username.into(),
                password: password.into(),
                urls,
                totp_uri: None,
            },
            custom_fields: Vec::new(),
        }
    }

    pub fn with_custom_field(mut self, name: impl Into<String>, value: CustomFieldValue) -> Self {
        self.custom_fields.push(CustomField {
            name: name.into(),
            value,
        });
        self
    }

    /// Short label for the payload kind, safe to log
    pub fn kind(&self) -> &'static str {
        match self.payload {
            ItemPayload::Note => "note",
            ItemPayload::Login { .. } => "login",
            ItemPayload::Alias { .. } => "alias",
            ItemPayload::CreditCard { .. } => "credit_card",
        }
    }
}

impl VersionedRecord for ItemContent {
    const CURRENT_VERSION: u16 = CURRENT_CONTENT_FORMAT_VERSION;
    const RECORD: &'static str = "item content";

    fn encode(&self) -> Result<Zeroizing<Vec<u8>>, SchemaError> {
        to_bytes(self, Self::RECORD)
    }

    fn decode(bytes: &[u8], version: u16) -> Result<Self, SchemaError> {
        match version {
            CONTENT_FORMAT_V1 => {
                let v1: ItemContentV1 = from_bytes(bytes, Self::RECORD)?;
                Ok(ItemContent {
                    title: v1.title,
                    note: v1.note,
                    payload: v1.payload,
                    custom_fields: Vec::new(),
                })
            }
            CONTENT_FORMAT_V2 => from_bytes(bytes, Self::RECORD),
            version => Err(SchemaError::UnsupportedContentVersion { version }),
        }
    }
}

impl fmt::Debug for ItemContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemContent")
            .field("title", &self.title)
            .field("note", &REDACTED)
            .field("payload", &self.payload)
            .field("custom_fields", &self.custom_fields)
            .finish()
    }
}

impl fmt::Debug for ItemPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemPayload::Note => f.write_str("Note"),
            ItemPayload::Login { username, urls, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &REDACTED)
                .field("urls", urls)
                .field("totp_uri", &REDACTED)
                .finish(),
            ItemPayload::Alias { email } => f.debug_struct("Alias").field("email", email).finish(),
            ItemPayload::CreditCard {
                cardholder_name, ..
            } => f
                .debug_struct("CreditCard")
                .field("cardholder_name", cardholder_name)
                .field("number", &REDACTED)
                .finish_non_exhaustive(),
        }
    }
}

impl fmt::Debug for CustomField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match &self.value {
            CustomFieldValue::Text(text) => text.as_str(),
            CustomFieldValue::Hidden(_) | CustomFieldValue::Totp(_) => REDACTED,
        };
        f.debug_struct("CustomField")
            .field("name", &self.name)
            .field("value", &value)
            .finish()
    }
}

impl fmt::Debug for CustomFieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomFieldValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            CustomFieldValue::Hidden(_) => f.debug_tuple("Hidden").field(&REDACTED).finish(),
            CustomFieldValue::Totp(_) => f.debug_tuple("Totp").field(&REDACTED).finish(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn login() -> ItemContent {
        ItemContent::login(
            "bank",
            "alice",
            "correct horse battery staple",
            vec!["https://bank.example".to_string()],
        )
        .with_custom_field("pin", CustomFieldValue::Hidden("0000".to_string()))
    }

    #[test]
    fn test_roundtrip_current_version() {
        let content = login();
        let bytes = content.encode().unwrap();
        let decoded = ItemContent::decode(&bytes, CURRENT_CONTENT_FORMAT_VERSION).unwrap();
        assert_eq!(content, decoded);
    }

    #[test]
    fn test_reencode_is_byte_exact() {
        let bytes = login().encode().unwrap();
        let decoded = ItemContent::decode(&bytes, CONTENT_FORMAT_V2).unwrap();
        assert_eq!(*decoded.encode().unwrap(), *bytes);
    }

    #[test]
    fn test_decode_v1_has_no_custom_fields() {
        let v1 = ItemContentV1 {
            title: "T".to_string(),
            note: "N".to_string(),
            payload: ItemPayload::Note,
        };
        let bytes = to_bytes(&v1, "test").unwrap();
        let decoded = ItemContent::decode(&bytes, CONTENT_FORMAT_V1).unwrap();
        assert_eq!(decoded, ItemContent::note("T", "N"));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let bytes = ItemContent::note("T", "N").encode().unwrap();
        assert_eq!(
            ItemContent::decode(&bytes, 3),
            Err(SchemaError::UnsupportedContentVersion { version: 3 })
        );
        assert_eq!(
            ItemContent::decode(&bytes, 0),
            Err(SchemaError::UnsupportedContentVersion { version: 0 })
        );
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = ItemContent::note("T", "N").encode().unwrap().to_vec();
        bytes.push(0);
        assert!(matches!(
            ItemContent::decode(&bytes, CONTENT_FORMAT_V2),
            Err(SchemaError::MalformedContent { .. })
        ));
    }

    #[test]
    fn test_v2_bytes_are_not_read_as_v1() {
        let bytes = login().encode().unwrap();
        assert!(ItemContent::decode(&bytes, CONTENT_FORMAT_V1).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", login());
        assert!(debug.contains("alice"));
        assert!(!debug.contains("correct horse"));
        assert!(!debug.contains("0000"));
    }

    #[test]
    fn test_kind() {
        assert_eq!(ItemContent::note("a", "b").kind(), "note");
        assert_eq!(login().kind(), "login");
    }
}
