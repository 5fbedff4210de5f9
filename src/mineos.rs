use crate::server::ServerBackend;
use crate::shell::Shell;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_DIRECTORY: &str = "/var/games/minecraft";
pub const DEFAULT_MINEOS_HOME: &str = "/usr/games/minecraft";

/// Sections of a MineOS `server.config` file.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    sections: HashMap<String, HashMap<String, String>>,
}

impl ServerConfig {
    pub fn parse(content: &str) -> Self {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current = String::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                current = line[1..line.len() - 1].trim().to_lowercase();
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                sections
                    .entry(current.clone())
                    .or_default()
                    .insert(key.trim().to_lowercase(), value.trim().to_string());
            }
        }

        Self { sections }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read server config: {:?}", path))?;
        Ok(Self::parse(&content))
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(&section.to_lowercase())
            .and_then(|s| s.get(&key.to_lowercase()))
            .map(|v| v.as_str())
    }

    /// `[onreboot] start`
    pub fn start_on_reboot(&self) -> bool {
        matches!(
            self.get("onreboot", "start").map(|v| v.to_lowercase()).as_deref(),
            Some("true" | "yes" | "1" | "on")
        )
    }
}

/// Whether `screen -ls` output lists the session MineOS uses for `name`.
pub fn screen_session_running(screen_ls: &str, name: &str) -> bool {
    let session = format!("mc-{}", name);
    screen_ls.lines().any(|line| {
        line.split_whitespace()
            .next()
            .and_then(|id| id.split_once('.'))
            .map(|(pid, sess)| pid.chars().all(|c| c.is_ascii_digit()) && sess == session)
            .unwrap_or(false)
    })
}

/// A MineOS installation on this machine.
#[derive(Debug, Clone)]
pub struct MineOs {
    base_directory: PathBuf,
    mineos_home: PathBuf,
    python: String,
    dry_run: bool,
}

impl MineOs {
    pub fn new(base_directory: impl Into<PathBuf>, mineos_home: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
            mineos_home: mineos_home.into(),
            python: "python".to_string(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn servers_dir(&self) -> PathBuf {
        self.base_directory.join("servers")
    }

    pub fn server_dir(&self, name: &str) -> PathBuf {
        self.servers_dir().join(name)
    }

    fn console_command(&self, name: &str, action: &str) -> Vec<String> {
        let base = self.base_directory.to_string_lossy().to_string();
        vec![
            "./mineos_console.py".to_string(),
            "-d".to_string(),
            base,
            "-s".to_string(),
            name.to_string(),
            action.to_string(),
        ]
    }
}

impl ServerBackend for MineOs {
    fn list_servers(&self) -> Result<Vec<String>> {
        let dir = self.servers_dir();
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("Failed to list servers in {:?}", dir))?;

        let mut servers = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                servers.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        servers.sort();
        Ok(servers)
    }

    fn is_up(&self, name: &str) -> Result<bool> {
        let output = Shell::probe_local("screen", &["-ls"])?;
        Ok(screen_session_running(&output, name))
    }

    fn start(&self, name: &str) -> Result<()> {
        log::info!("Starting Server: {}", name);
        let args = self.console_command(name, "start");
        let args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        Shell::exec_local(&self.python, &args, Some(&self.mineos_home), self.dry_run)
            .with_context(|| format!("MineOS failed to start {}", name))?;
        log::info!("Server Started");
        Ok(())
    }

    fn starts_on_reboot(&self, name: &str) -> Result<bool> {
        let path = self.server_dir(name).join("server.config");
        if !path.exists() {
            return Ok(false);
        }
        Ok(ServerConfig::load(&path)?.start_on_reboot())
    }
}
