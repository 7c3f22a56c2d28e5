//! Credential vault: encrypts third-party API secrets at rest.
//!
//! Each encryption draws a fresh 64-byte salt and 16-byte IV, derives a
//! 32-byte key with PBKDF2-HMAC-SHA256 (100 000 rounds) over the process-wide
//! master secret and the salt, seals with AES-256-GCM, and serialises
//! `salt ‖ iv ‖ auth_tag ‖ ciphertext` as one base64 blob. The derived key is
//! never persisted; decryption re-derives it from the embedded salt.

use std::env;

use aes_gcm::aead::Aead;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, KeyInit};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

const SALT_LEN: usize = 64;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;
const KDF_ROUNDS: u32 = 100_000;
const HEADER_LEN: usize = SALT_LEN + IV_LEN + TAG_LEN;

// AES-256-GCM driven with the stored 16-byte IV as nonce.
type VaultCipher = AesGcm<Aes256, U16>;

/// Process-wide secret used to derive per-credential keys.
///
/// A missing or empty secret is a startup-time configuration error; the
/// process refuses to boot rather than failing per call.
#[derive(Clone)]
pub struct MasterSecret(Zeroizing<String>);

/// Configuration failure constructing a [`MasterSecret`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MasterSecretError {
    /// Environment variable is not set.
    #[error("master secret environment variable {0} is not set")]
    Missing(String),
    /// Configured value is blank.
    #[error("master secret must not be empty")]
    Empty,
}

impl MasterSecret {
    /// Wrap a raw secret, rejecting blank input.
    pub fn new(raw: impl Into<String>) -> Result<Self, MasterSecretError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(MasterSecretError::Empty);
        }
        Ok(Self(Zeroizing::new(raw)))
    }

    /// Load the secret from an environment variable.
    pub fn from_env(var: &str) -> Result<Self, MasterSecretError> {
        let raw = env::var(var).map_err(|_| MasterSecretError::Missing(var.to_owned()))?;
        Self::new(raw)
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterSecret(..)")
    }
}

/// Opaque encrypted credential blob stored on a brand account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedCredential(String);

impl EncryptedCredential {
    /// Wrap an already-encrypted blob loaded from storage.
    pub fn new(blob: impl Into<String>) -> Self {
        Self(blob.into())
    }

    /// Borrow the base64 blob.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Failure sealing a credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncryptionError {
    /// The cipher rejected the plaintext buffer.
    #[error("credential encryption failed")]
    Crypto,
}

/// Failure opening a credential blob.
///
/// Callers must treat a failed decryption as an absent credential, not a
/// crash: the brand's integration is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptionError {
    /// Blob is not valid base64.
    #[error("credential blob is not valid base64")]
    Decode,
    /// Blob is shorter than the salt/iv/tag header.
    #[error("credential blob is truncated")]
    Truncated,
    /// Authentication failed: the blob was tampered with or sealed under a
    /// different master secret.
    #[error("credential blob failed authentication")]
    Crypto,
    /// Decrypted bytes are not UTF-8.
    #[error("decrypted credential is not valid UTF-8")]
    Utf8,
}

/// Encrypts and decrypts credential blobs with the master secret.
///
/// # Examples
/// ```
/// use activation_backend::domain::{CredentialVault, MasterSecret};
///
/// let vault = CredentialVault::new(MasterSecret::new("correct horse").expect("secret"));
/// let blob = vault.encrypt("shpat_123").expect("sealable");
/// assert_eq!(vault.decrypt(&blob).expect("opens"), "shpat_123");
/// ```
pub struct CredentialVault {
    master: MasterSecret,
}

impl CredentialVault {
    /// Build a vault around the process master secret.
    pub fn new(master: MasterSecret) -> Self {
        Self { master }
    }

    /// Seal a plaintext secret into a storable blob.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedCredential, EncryptionError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let key = self.derive_key(&salt);
        let cipher = VaultCipher::new(GenericArray::from_slice(key.as_slice()));
        let sealed = cipher
            .encrypt(GenericArray::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| EncryptionError::Crypto)?;
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        let mut blob = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(tag);
        blob.extend_from_slice(ciphertext);
        Ok(EncryptedCredential(BASE64.encode(blob)))
    }

    /// Open a blob back into the plaintext secret.
    pub fn decrypt(&self, blob: &EncryptedCredential) -> Result<String, DecryptionError> {
        let raw = BASE64
            .decode(blob.as_str())
            .map_err(|_| DecryptionError::Decode)?;
        if raw.len() < HEADER_LEN {
            return Err(DecryptionError::Truncated);
        }
        let salt = &raw[..SALT_LEN];
        let iv = &raw[SALT_LEN..SALT_LEN + IV_LEN];
        let tag = &raw[SALT_LEN + IV_LEN..HEADER_LEN];
        let ciphertext = &raw[HEADER_LEN..];

        let key = self.derive_key(salt);
        let cipher = VaultCipher::new(GenericArray::from_slice(key.as_slice()));
        let mut sealed = ciphertext.to_vec();
        sealed.extend_from_slice(tag);
        let opened = cipher
            .decrypt(GenericArray::from_slice(iv), sealed.as_slice())
            .map_err(|_| DecryptionError::Crypto)?;
        String::from_utf8(opened).map_err(|_| DecryptionError::Utf8)
    }

    /// Seal an optional secret, passing `None` straight through.
    pub fn encrypt_opt(
        &self,
        plaintext: Option<&str>,
    ) -> Result<Option<EncryptedCredential>, EncryptionError> {
        plaintext.map(|value| self.encrypt(value)).transpose()
    }

    /// Open an optional blob, passing `None` straight through.
    pub fn decrypt_opt(
        &self,
        blob: Option<&EncryptedCredential>,
    ) -> Result<Option<String>, DecryptionError> {
        blob.map(|value| self.decrypt(value)).transpose()
    }

    fn derive_key(&self, salt: &[u8]) -> Zeroizing<Vec<u8>> {
        let mut key = Zeroizing::new(vec![0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(self.master.as_bytes(), salt, KDF_ROUNDS, key.as_mut_slice());
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn vault(secret: &str) -> CredentialVault {
        CredentialVault::new(MasterSecret::new(secret).expect("valid secret"))
    }

    #[rstest]
    #[case("shpat_0123456789abcdef")]
    #[case("a")]
    #[case("token with spaces and ümlauts")]
    fn round_trips_plaintext(#[case] plaintext: &str) {
        let vault = vault("master-secret");
        let blob = vault.encrypt(plaintext).expect("seals");
        assert_eq!(vault.decrypt(&blob).expect("opens"), plaintext);
    }

    #[test]
    fn blob_layout_has_header_segments() {
        let vault = vault("master-secret");
        let blob = vault.encrypt("secret").expect("seals");
        let raw = BASE64.decode(blob.as_str()).expect("valid base64");
        assert_eq!(raw.len(), HEADER_LEN + "secret".len());
    }

    #[test]
    fn fresh_salt_per_call_changes_the_blob() {
        let vault = vault("master-secret");
        let first = vault.encrypt("secret").expect("seals");
        let second = vault.encrypt("secret").expect("seals");
        assert_ne!(first, second);
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let vault = vault("master-secret");
        let blob = vault.encrypt("secret").expect("seals");
        let mut raw = BASE64.decode(blob.as_str()).expect("valid base64");
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = EncryptedCredential::new(BASE64.encode(raw));
        assert_eq!(vault.decrypt(&tampered), Err(DecryptionError::Crypto));
    }

    #[test]
    fn foreign_master_secret_fails_authentication() {
        let blob = vault("master-secret").encrypt("secret").expect("seals");
        assert_eq!(
            vault("other-secret").decrypt(&blob),
            Err(DecryptionError::Crypto)
        );
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let vault = vault("master-secret");
        let short = EncryptedCredential::new(BASE64.encode([0u8; 16]));
        assert_eq!(vault.decrypt(&short), Err(DecryptionError::Truncated));
    }

    #[test]
    fn garbage_blob_is_rejected() {
        let vault = vault("master-secret");
        let garbage = EncryptedCredential::new("not-base64!!!");
        assert_eq!(vault.decrypt(&garbage), Err(DecryptionError::Decode));
    }

    #[test]
    fn optional_variants_pass_none_through() {
        let vault = vault("master-secret");
        assert_eq!(vault.encrypt_opt(None).expect("no-op"), None);
        assert_eq!(vault.decrypt_opt(None).expect("no-op"), None);
    }

    #[test]
    fn blank_master_secret_is_a_configuration_error() {
        let err = MasterSecret::new("  ").expect_err("blank secret rejected");
        assert_eq!(err, MasterSecretError::Empty);
    }
}
