//! Encrypted volumes layered over an existing bdev.

use crate::fieldmask::FieldMask;
use crate::{BridgeError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Supported data-encryption ciphers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionType {
    #[default]
    #[serde(rename = "AES_XTS_128")]
    AesXts128,
    #[serde(rename = "AES_XTS_256")]
    AesXts256,
}

impl EncryptionType {
    /// Total key length in bytes. XTS keys are two equal halves.
    pub fn key_len(&self) -> usize {
        match self {
            EncryptionType::AesXts128 => 32,
            EncryptionType::AesXts256 => 64,
        }
    }

    /// Cipher name passed to `accel_crypto_key_create`.
    pub fn as_spdk(&self) -> &'static str {
        "AES_XTS"
    }
}

/// Key bytes. Accepted as hex on input, never serialized back out.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split into the two XTS halves, hex encoded.
    pub fn xts_halves(&self) -> (String, String) {
        let (first, second) = self.0.split_at(self.0.len() / 2);
        (hex::encode(first), hex::encode(second))
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyMaterial(<{} bytes redacted>)", self.0.len())
    }
}

impl<'de> Deserialize<'de> for KeyMaterial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text.trim())
            .map(KeyMaterial)
            .map_err(|e| serde::de::Error::custom(format!("key must be hex encoded: {}", e)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedVolume {
    #[serde(default)]
    pub name: String,
    /// Name of the bdev being encrypted.
    #[serde(default)]
    pub volume_name_ref: String,
    #[serde(default, skip_serializing)]
    pub key: KeyMaterial,
    #[serde(default)]
    pub cipher: EncryptionType,
}

impl EncryptedVolume {
    pub const UPDATABLE_FIELDS: &'static [&'static str] = &["volume_name_ref", "key", "cipher"];

    /// Check that the key fits the cipher.
    pub fn validate_key(&self) -> Result<()> {
        let expected = self.cipher.key_len();
        if self.key.len() != expected {
            return Err(BridgeError::invalid_argument(format!(
                "expected key size {}b, provided size {}b",
                expected * 8,
                self.key.len() * 8
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEncryptedVolumeRequest {
    #[serde(default)]
    pub encrypted_volume_id: String,
    #[serde(default)]
    pub encrypted_volume: Option<EncryptedVolume>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEncryptedVolumeRequest {
    #[serde(default)]
    pub encrypted_volume: Option<EncryptedVolume>,
    #[serde(default)]
    pub update_mask: FieldMask,
    #[serde(default)]
    pub allow_missing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListEncryptedVolumesRequest {
    #[serde(default)]
    pub page_size: i32,
    #[serde(default)]
    pub page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEncryptedVolumesResponse {
    pub encrypted_volumes: Vec<EncryptedVolume>,
    pub next_page_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn volume(key_hex: &str, cipher: &str) -> EncryptedVolume {
        serde_json::from_value(json!({
            "volume_name_ref": "Malloc0",
            "key": key_hex,
            "cipher": cipher
        }))
        .unwrap()
    }

    #[test]
    fn test_key_is_never_serialized() {
        let vol = volume(&"ab".repeat(32), "AES_XTS_128");
        let out = serde_json::to_value(&vol).unwrap();
        assert!(out.get("key").is_none());
        assert_eq!(out["cipher"], "AES_XTS_128");
        assert!(!format!("{:?}", vol).contains("abab"));
    }

    #[test]
    fn test_key_length_must_match_cipher() {
        assert!(volume(&"00".repeat(32), "AES_XTS_128").validate_key().is_ok());
        assert!(volume(&"00".repeat(64), "AES_XTS_256").validate_key().is_ok());

        let err = volume(&"00".repeat(16), "AES_XTS_256")
            .validate_key()
            .unwrap_err();
        assert_eq!(err.to_string(), "expected key size 512b, provided size 128b");
    }

    #[test]
    fn test_xts_halves() {
        let key = KeyMaterial::new(vec![0x11, 0x22, 0x33, 0x44]);
        assert_eq!(key.xts_halves(), ("1122".to_string(), "3344".to_string()));
    }

    #[test]
    fn test_non_hex_key_is_rejected() {
        let result: std::result::Result<EncryptedVolume, _> =
            serde_json::from_value(json!({"key": "not-hex"}));
        assert!(result.is_err());
    }
}
