//! The heartbeat loop: check each server, restart it if it is down, sleep, repeat.

use crate::alert::Notifier;
use crate::server::ServerBackend;
use crate::{HeartbeatStatus, RestartLog};
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

pub const DEFAULT_DELAY_SECS: u64 = 60;
pub const DEFAULT_BOOT_WAIT_SECS: u64 = 120;
pub const INTERACTIVE_STAGGER: Duration = Duration::from_millis(500);

/// Which servers a heartbeat watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    Single(String),
    Selected(Vec<String>),
    /// Every server under the base directory, listed again each cycle.
    All { onreboot_only: bool },
}

impl Targets {
    pub fn mode_name(&self) -> &'static str {
        match self {
            Targets::Single(_) => "single",
            Targets::Selected(_) => "interactive",
            Targets::All { .. } => "multi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Pause between heartbeats
    pub delay: Duration,
    /// Pause after a start before the server is checked again
    pub boot_wait: Duration,
    /// Pause between servers within one heartbeat
    pub stagger: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(DEFAULT_DELAY_SECS),
            boot_wait: Duration::from_secs(DEFAULT_BOOT_WAIT_SECS),
            stagger: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Up,
    /// `recovered` is `None` when shutdown arrived before the recheck.
    Restarted { recovered: Option<bool> },
    RestartFailed(String),
    /// The status query itself failed.
    Unknown(String),
}

/// Where a heartbeat persists its status and restart history.
#[derive(Debug, Clone)]
pub struct StateFiles {
    pub status: PathBuf,
    pub restarts: PathBuf,
}

pub struct Heartbeat<'a, B: ServerBackend> {
    backend: &'a B,
    notifier: Option<&'a dyn Notifier>,
    timing: Timing,
    shutdown: watch::Receiver<bool>,
    status: HeartbeatStatus,
    restarts: RestartLog,
    state_files: Option<StateFiles>,
}

impl<'a, B: ServerBackend> Heartbeat<'a, B> {
    pub fn new(
        backend: &'a B,
        timing: Timing,
        shutdown: watch::Receiver<bool>,
        status: HeartbeatStatus,
    ) -> Self {
        Self {
            backend,
            notifier: None,
            timing,
            shutdown,
            status,
            restarts: RestartLog::default(),
            state_files: None,
        }
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_state_files(mut self, files: StateFiles) -> Self {
        self.restarts = RestartLog::load(&files.restarts);
        self.state_files = Some(files);
        self
    }

    pub fn status(&self) -> &HeartbeatStatus {
        &self.status
    }

    pub fn restarts(&self) -> &RestartLog {
        &self.restarts
    }

    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleep for `duration`. Returns false if shutdown was requested first.
    async fn pause(&mut self, duration: Duration) -> bool {
        if self.stopping() {
            return false;
        }
        if duration.is_zero() {
            // still hand the runtime a turn so a zero pause never spins
            tokio::task::yield_now().await;
            return !self.stopping();
        }

        let deadline = Instant::now() + duration;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return true,
                changed = self.shutdown.changed() => match changed {
                    Ok(()) if *self.shutdown.borrow() => return false,
                    Ok(()) => continue,
                    Err(_) => {
                        // sender gone, nobody can ask us to stop any more
                        tokio::time::sleep_until(deadline).await;
                        return true;
                    }
                },
            }
        }
    }

    /// Check one server and restart it if it is down.
    pub async fn check_server(&mut self, name: &str) -> CheckOutcome {
        log::info!("Checking server {}", name);

        match self.backend.is_up(name) {
            Ok(true) => {
                log::debug!("Server {} is Up", name);
                self.status.record(name, Some(true), false);
                return CheckOutcome::Up;
            }
            Ok(false) => {}
            Err(e) => {
                log::error!("Could not query server {}: {:#}", name, e);
                self.status.record(name, None, false);
                return CheckOutcome::Unknown(e.to_string());
            }
        }

        log::error!("Server {} is Down", name);
        println!("⚠️  Server {} is DOWN, restarting...", name);

        if let Err(e) = self.backend.start(name) {
            let reason = format!("{:#}", e);
            log::error!("Failed to start server {}: {}", name, reason);
            self.status.record(name, Some(false), false);
            self.log_restart(name, false, &reason);
            self.alert(
                &format!("[heartbeat] {} is down and failed to restart", name),
                &format!(
                    "Server {} under {} was found DOWN.\nRestart failed: {}\n",
                    name, self.status.base_directory, reason
                ),
            );
            return CheckOutcome::RestartFailed(reason);
        }

        if !self.pause(self.timing.boot_wait).await {
            self.status.record(name, None, true);
            self.log_restart(name, true, "start issued, shutdown before recheck");
            return CheckOutcome::Restarted { recovered: None };
        }

        let recovered = match self.backend.is_up(name) {
            Ok(up) => Some(up),
            Err(e) => {
                log::error!("Could not recheck server {}: {:#}", name, e);
                None
            }
        };

        let detail = match recovered {
            Some(true) => {
                log::info!("Server {}: UP", name);
                println!("✅ Server {} is back UP", name);
                "back up"
            }
            Some(false) => {
                log::error!("Server {}: still DOWN after restart", name);
                "still down after restart"
            }
            None => "recheck failed",
        };

        self.status.record(name, recovered, true);
        self.log_restart(name, true, detail);
        self.alert(
            &format!("[heartbeat] {} was down and has been restarted", name),
            &format!(
                "Server {} under {} was found DOWN and a restart was issued.\nAfter {}s: {}\n",
                name,
                self.status.base_directory,
                self.timing.boot_wait.as_secs(),
                detail
            ),
        );

        CheckOutcome::Restarted { recovered }
    }

    fn resolve(&self, targets: &Targets) -> Vec<String> {
        match targets {
            Targets::Single(name) => vec![name.clone()],
            Targets::Selected(names) => names.clone(),
            Targets::All { onreboot_only } => {
                let servers = match self.backend.list_servers() {
                    Ok(s) => s,
                    Err(e) => {
                        log::error!("Could not list servers: {:#}", e);
                        return Vec::new();
                    }
                };
                if !onreboot_only {
                    return servers;
                }
                servers
                    .into_iter()
                    .filter(|name| match self.backend.starts_on_reboot(name) {
                        Ok(flag) => flag,
                        Err(e) => {
                            log::warn!("Could not read config for {}: {:#}", name, e);
                            false
                        }
                    })
                    .collect()
            }
        }
    }

    /// One heartbeat over every target. Stops early on shutdown.
    pub async fn run_cycle(&mut self, targets: &Targets) -> Vec<(String, CheckOutcome)> {
        let mut results = Vec::new();
        let names = self.resolve(targets);

        for (i, name) in names.iter().enumerate() {
            if self.stopping() {
                break;
            }
            if i > 0 && !self.pause(self.timing.stagger).await {
                break;
            }
            let outcome = self.check_server(name).await;
            results.push((name.clone(), outcome));
        }

        results
    }

    /// Heartbeat until shutdown is requested.
    pub async fn run(&mut self, targets: &Targets) -> Result<()> {
        log::info!("Starting monitor ({} mode)", targets.mode_name());

        loop {
            self.run_cycle(targets).await;
            self.save_status();
            if !self.pause(self.timing.delay).await {
                break;
            }
        }

        log::info!("Heartbeat stopped");
        self.save_status();
        Ok(())
    }

    fn log_restart(&mut self, name: &str, success: bool, detail: &str) {
        self.restarts.push(name, success, detail);
        if let Some(files) = &self.state_files {
            if let Err(e) = self.restarts.save(&files.restarts) {
                log::warn!("Failed to save restart log: {}", e);
            }
        }
    }

    fn save_status(&self) {
        if let Some(files) = &self.state_files {
            if let Err(e) = self.status.save(&files.status) {
                log::warn!("Failed to save heartbeat status: {}", e);
            }
        }
    }

    fn alert(&self, subject: &str, body: &str) {
        if let Some(notifier) = self.notifier {
            if let Err(e) = notifier.notify(subject, body) {
                log::error!("Failed to send alert: {:#}", e);
            }
        }
    }
}
