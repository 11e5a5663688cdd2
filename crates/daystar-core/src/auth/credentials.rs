//! Encrypted-at-rest storage for the session token.
//!
//! The token grants full account access, so it is never written to disk in
//! the clear: it is sealed with ChaCha20-Poly1305 under a random 256-bit
//! key that lives in the OS keychain. Clearing the store removes the sealed
//! file; the sealing key is reused for the next login.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use keyring::Entry;
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tracing::debug;

/// Keychain service name for the sealing key entry.
const SERVICE_NAME: &str = "daystar";

/// Keychain account name under which the sealing key is stored.
const KEY_ENTRY: &str = "credential-key";

/// Sealed token file inside the app data directory.
const CREDENTIAL_FILE: &str = "credential.bin";

/// ChaCha20-Poly1305 nonce length in bytes, prefixed to the sealed file.
const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("keychain error: {0}")]
    Keychain(#[from] keyring::Error),

    #[error("credential file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored credential could not be sealed or unsealed")]
    Crypto,
}

enum Backend {
    /// Sealed file on disk, key in the OS keychain.
    Keychain { path: PathBuf },
    /// Process-local storage for tests.
    Memory(Mutex<Option<String>>),
}

/// Durable storage for exactly one opaque session token.
///
/// All operations are idempotent: `save` overwrites, `clear` on an empty
/// store succeeds, and `read` after `clear` returns `None`. A storage
/// failure is fatal to the calling operation and propagates as
/// [`StoreError`].
pub struct CredentialStore {
    backend: Backend,
}

impl CredentialStore {
    /// Store backed by the OS keychain, with the sealed token file placed
    /// under `data_dir`.
    pub fn open(data_dir: &Path) -> Self {
        Self {
            backend: Backend::Keychain {
                path: data_dir.join(CREDENTIAL_FILE),
            },
        }
    }

    /// Volatile store for tests.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(None)),
        }
    }

    /// Persist `token`, overwriting any prior value.
    pub async fn save(&self, token: &str) -> Result<(), StoreError> {
        match &self.backend {
            Backend::Memory(slot) => {
                *slot.lock().expect("credential slot poisoned") = Some(token.to_string());
                Ok(())
            }
            Backend::Keychain { path } => {
                let key = sealing_key()?;
                let sealed = seal(&key, token)?;
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, sealed)?;
                debug!("credential sealed to disk");
                Ok(())
            }
        }
    }

    /// Read the stored token, if any.
    pub async fn read(&self) -> Result<Option<String>, StoreError> {
        match &self.backend {
            Backend::Memory(slot) => Ok(slot.lock().expect("credential slot poisoned").clone()),
            Backend::Keychain { path } => {
                if !path.exists() {
                    return Ok(None);
                }
                let sealed = std::fs::read(path)?;
                let key = existing_sealing_key()?.ok_or(StoreError::Crypto)?;
                unseal(&key, &sealed).map(Some)
            }
        }
    }

    /// Remove the stored token. Safe to call when nothing is stored.
    pub async fn clear(&self) -> Result<(), StoreError> {
        match &self.backend {
            Backend::Memory(slot) => {
                *slot.lock().expect("credential slot poisoned") = None;
                Ok(())
            }
            Backend::Keychain { path } => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                    debug!("credential cleared");
                }
                Ok(())
            }
        }
    }
}

/// Fetch the sealing key, creating one on first use.
fn sealing_key() -> Result<[u8; 32], StoreError> {
    if let Some(key) = existing_sealing_key()? {
        return Ok(key);
    }
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    let entry = Entry::new(SERVICE_NAME, KEY_ENTRY)?;
    entry.set_password(&encode_hex(&key))?;
    debug!("generated new credential sealing key");
    Ok(key)
}

/// Fetch the sealing key if one exists.
fn existing_sealing_key() -> Result<Option<[u8; 32]>, StoreError> {
    let entry = Entry::new(SERVICE_NAME, KEY_ENTRY)?;
    match entry.get_password() {
        Ok(hex) => {
            let bytes = decode_hex(&hex).ok_or(StoreError::Crypto)?;
            let key: [u8; 32] = bytes.try_into().map_err(|_| StoreError::Crypto)?;
            Ok(Some(key))
        }
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Encrypt `token`, returning `nonce || ciphertext`.
fn seal(key: &[u8; 32], token: &str) -> Result<Vec<u8>, StoreError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, token.as_bytes())
        .map_err(|_| StoreError::Crypto)?;
    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt the `nonce || ciphertext` layout produced by [`seal`].
fn unseal(key: &[u8; 32], sealed: &[u8]) -> Result<String, StoreError> {
    if sealed.len() <= NONCE_LEN {
        return Err(StoreError::Crypto);
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| StoreError::Crypto)?;
    String::from_utf8(plaintext).map_err(|_| StoreError::Crypto)
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
