pub mod alert;
pub mod cli;
pub mod codec;
pub mod interactive;
pub mod logging;
pub mod mineos;
pub mod monitor;
pub mod server;
pub mod settings;
pub mod shell;


use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

const MAX_RESTART_ENTRIES: usize = 1000;

/// Last known state of one monitored server
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ServerState {
    pub name: String,
    /// `None` when the last status query failed
    pub up: Option<bool>,
    pub last_checked: String,
    pub restarts: u32,
}

/// Written by a running heartbeat so `--status` can report on it
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HeartbeatStatus {
    pub pid: u32,
    pub mode: String,
    pub base_directory: String,
    pub started: String,
    pub servers: Vec<ServerState>,
}

impl HeartbeatStatus {
    pub fn new(mode: &str, base_directory: &Path) -> Self {
        Self {
            pid: std::process::id(),
            mode: mode.to_string(),
            base_directory: base_directory.display().to_string(),
            started: now(),
            servers: Vec::new(),
        }
    }

    pub fn record(&mut self, name: &str, up: Option<bool>, restarted: bool) {
        let checked = now();
        match self.servers.iter_mut().find(|s| s.name == name) {
            Some(state) => {
                state.up = up;
                state.last_checked = checked;
                if restarted {
                    state.restarts += 1;
                }
            }
            None => self.servers.push(ServerState {
                name: name.to_string(),
                up,
                last_checked: checked,
                restarts: u32::from(restarted),
            }),
        }
    }

    pub fn load(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// A single restart attempt
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RestartEntry {
    pub timestamp: String,
    pub server: String,
    pub success: bool,
    pub detail: String,
}

/// Persistent history of restart attempts
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RestartLog {
    pub entries: Vec<RestartEntry>,
}

impl RestartLog {
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn push(&mut self, server: &str, success: bool, detail: &str) {
        self.entries.push(RestartEntry {
            timestamp: now(),
            server: server.to_string(),
            success,
            detail: detail.to_string(),
        });

        // Keep only the newest entries so memory and the file stay bounded
        if self.entries.len() > MAX_RESTART_ENTRIES {
            let excess = self.entries.len() - MAX_RESTART_ENTRIES;
            self.entries.drain(..excess);
        }
    }

    /// Most recent first
    pub fn recent(&self, n: usize) -> Vec<&RestartEntry> {
        self.entries.iter().rev().take(n).collect()
    }
}

fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
