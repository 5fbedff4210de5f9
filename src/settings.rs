use crate::codec::{self, Encoding, SettingsKey};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Credentials and recipients for alert mail.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
}

fn default_smtp_host() -> String {
    DEFAULT_SMTP_HOST.to_string()
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            recipients: Vec::new(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
        }
    }
}

impl EmailSettings {
    /// Alerts can only go out once an account and at least one recipient are known.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty() && !self.recipients.is_empty()
    }

    /// Fill in any values given on the command line.
    pub fn apply(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
        recipients: &[String],
    ) {
        if let Some(u) = username {
            self.username = u.to_string();
        }
        if let Some(p) = password {
            self.password = p.to_string();
        }
        if !recipients.is_empty() {
            self.recipients = recipients.to_vec();
        }
    }
}

/// On-disk envelope: `{"encoding": "...", "payload": ...}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "payload", rename_all = "lowercase")]
enum StoredSettings {
    Plain(EmailSettings),
    Base64(String),
    Hex(String),
    Rot13(String),
    Sealed(String),
}

impl StoredSettings {
    fn encoding(&self) -> Encoding {
        match self {
            StoredSettings::Plain(_) => Encoding::Plain,
            StoredSettings::Base64(_) => Encoding::Base64,
            StoredSettings::Hex(_) => Encoding::Hex,
            StoredSettings::Rot13(_) => Encoding::Rot13,
            StoredSettings::Sealed(_) => Encoding::Sealed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    /// `~/.heartbeat`
    pub fn default_dir() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".heartbeat"))
    }

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join("settings.json")
    }

    pub fn key_path(&self) -> PathBuf {
        self.dir.join("settings.key")
    }

    /// Load the stored settings. A missing file is reset to defaults on disk.
    pub fn load(&self) -> Result<EmailSettings> {
        let path = self.settings_path();
        if !path.exists() {
            log::warn!("No settings file at {:?}, resetting to defaults", path);
            let defaults = EmailSettings::default();
            self.save(&defaults, Encoding::Plain)?;
            return Ok(defaults);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        let stored: StoredSettings = serde_json::from_str(&content)
            .with_context(|| format!("Malformed settings file: {:?}", path))?;
        log::debug!("Loaded {} settings from {:?}", stored.encoding(), path);

        let text = match stored {
            StoredSettings::Plain(settings) => return Ok(settings),
            StoredSettings::Base64(p) => codec::decode(Encoding::Base64, &p, None)?,
            StoredSettings::Hex(p) => codec::decode(Encoding::Hex, &p, None)?,
            StoredSettings::Rot13(p) => codec::decode(Encoding::Rot13, &p, None)?,
            StoredSettings::Sealed(p) => {
                let key = SettingsKey::from_file(&self.key_path())?;
                codec::decode(Encoding::Sealed, &p, Some(&key))
                    .with_context(|| format!("Failed to unseal {:?}", path))?
            }
        };

        serde_json::from_str(&text)
            .with_context(|| format!("Settings in {:?} do not match the expected fields", path))
    }

    pub fn save(&self, settings: &EmailSettings, encoding: Encoding) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let stored = if encoding == Encoding::Plain {
            StoredSettings::Plain(settings.clone())
        } else {
            let text = serde_json::to_string(settings)?;
            let key = match encoding {
                Encoding::Sealed => Some(SettingsKey::load_or_create(&self.key_path())?),
                _ => None,
            };
            let payload = codec::encode(encoding, &text, key.as_ref())?;
            match encoding {
                Encoding::Base64 => StoredSettings::Base64(payload),
                Encoding::Hex => StoredSettings::Hex(payload),
                Encoding::Rot13 => StoredSettings::Rot13(payload),
                _ => StoredSettings::Sealed(payload),
            }
        };

        let json = serde_json::to_string_pretty(&stored)?;
        let path = self.settings_path();
        codec::write_private(&path, json.as_bytes())
            .with_context(|| format!("Failed to write settings file: {:?}", path))?;

        Ok(())
    }
}
