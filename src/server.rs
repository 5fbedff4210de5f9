use anyhow::Result;
use std::fmt;

/// Liveness of one server as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Up,
    Down,
}

impl From<bool> for Liveness {
    fn from(up: bool) -> Self {
        if up {
            Liveness::Up
        } else {
            Liveness::Down
        }
    }
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Liveness::Up => f.write_str("UP"),
            Liveness::Down => f.write_str("DOWN"),
        }
    }
}

/// The server-management installation the heartbeat drives.
pub trait ServerBackend {
    /// Names of every server under the base directory.
    fn list_servers(&self) -> Result<Vec<String>>;

    fn is_up(&self, name: &str) -> Result<bool>;

    fn start(&self, name: &str) -> Result<()>;

    /// Whether the server is flagged to be brought back after a reboot.
    fn starts_on_reboot(&self, _name: &str) -> Result<bool> {
        Ok(true)
    }

    fn liveness(&self, name: &str) -> Result<Liveness> {
        self.is_up(name).map(Liveness::from)
    }

    fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.list_servers()?.iter().any(|s| s == name))
    }
}
