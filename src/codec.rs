use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

const SETTINGS_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// How the settings payload is written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Plain,
    Base64,
    Hex,
    Rot13,
    Sealed,
}

impl Encoding {
    pub const ALL: [Encoding; 5] = [
        Encoding::Plain,
        Encoding::Base64,
        Encoding::Hex,
        Encoding::Rot13,
        Encoding::Sealed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Plain => "plain",
            Encoding::Base64 => "base64",
            Encoding::Hex => "hex",
            Encoding::Rot13 => "rot13",
            Encoding::Sealed => "sealed",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Encoding::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("Unknown settings encoding: {}", s))
    }
}

/// Local symmetric key used by the `sealed` encoding.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SettingsKey(Vec<u8>);

impl SettingsKey {
    pub fn generate() -> Self {
        let mut key_bytes = [0u8; SETTINGS_KEY_LEN];
        rand::rng().fill_bytes(&mut key_bytes);
        let key = SettingsKey(key_bytes.to_vec());
        key_bytes.zeroize();
        key
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read settings key: {:?}", path))?;
        if bytes.len() != SETTINGS_KEY_LEN {
            return Err(anyhow::anyhow!("Invalid key length in {:?}", path));
        }
        Ok(SettingsKey(bytes))
    }

    /// Load the key at `path`, creating a fresh one if none exists yet.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::from_file(path);
        }

        let key = Self::generate();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_private(path, &key.0)
            .with_context(|| format!("Failed to write settings key: {:?}", path))?;

        log::info!("Generated new settings key at {:?}", path);
        Ok(key)
    }

    /// AES-256-GCM, nonce prepended to the ciphertext.
    pub fn seal(&self, data: &[u8]) -> Result<Vec<u8>> {
        let key = Key::<Aes256Gcm>::from_slice(&self.0);
        let cipher = Aes256Gcm::new(key);

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|e| anyhow::anyhow!("Encryption failure: {}", e))?;

        let mut result = nonce_bytes.to_vec();
        result.extend(ciphertext);
        Ok(result)
    }

    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN {
            return Err(anyhow::anyhow!("Invalid ciphertext length"));
        }

        let nonce = Nonce::from_slice(&sealed[..NONCE_LEN]);
        let key = Key::<Aes256Gcm>::from_slice(&self.0);
        let cipher = Aes256Gcm::new(key);

        cipher
            .decrypt(nonce, &sealed[NONCE_LEN..])
            .map_err(|e| anyhow::anyhow!("Decryption failure (wrong key?): {}", e))
    }
}

/// Write `bytes` to a file only the owner can read. A new file is created
/// with mode 0600; an existing one is narrowed to 0600 before any bytes land.
pub fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(bytes)?;
    Ok(())
}

/// Rotate ASCII letters by 13. Applying it twice gives back the input.
pub fn rot13(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'a'..='z' => (((c as u8 - b'a') + 13) % 26 + b'a') as char,
            'A'..='Z' => (((c as u8 - b'A') + 13) % 26 + b'A') as char,
            _ => c,
        })
        .collect()
}

/// Encode `text` as a payload string. `key` is only consulted for `Sealed`.
pub fn encode(encoding: Encoding, text: &str, key: Option<&SettingsKey>) -> Result<String> {
    match encoding {
        Encoding::Plain => Ok(text.to_string()),
        Encoding::Base64 => Ok(STANDARD.encode(text.as_bytes())),
        Encoding::Hex => Ok(hex::encode(text.as_bytes())),
        Encoding::Rot13 => Ok(rot13(text)),
        Encoding::Sealed => {
            let key = key.ok_or_else(|| anyhow::anyhow!("Sealed encoding needs a settings key"))?;
            Ok(hex::encode(key.seal(text.as_bytes())?))
        }
    }
}

pub fn decode(encoding: Encoding, payload: &str, key: Option<&SettingsKey>) -> Result<String> {
    let bytes = match encoding {
        Encoding::Plain => return Ok(payload.to_string()),
        Encoding::Rot13 => return Ok(rot13(payload)),
        Encoding::Base64 => STANDARD
            .decode(payload.trim())
            .context("Settings payload is not valid base64")?,
        Encoding::Hex => hex::decode(payload.trim()).context("Settings payload is not valid hex")?,
        Encoding::Sealed => {
            let key = key.ok_or_else(|| anyhow::anyhow!("Sealed encoding needs a settings key"))?;
            let sealed = hex::decode(payload.trim()).context("Sealed payload is not valid hex")?;
            key.open(&sealed)?
        }
    };
    String::from_utf8(bytes).context("Decoded settings are not UTF-8")
}
