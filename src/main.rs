use anyhow::{Context, Result};
use mineos_heartbeat::alert::{EmailNotifier, Notifier};
use mineos_heartbeat::cli::{self, CliOptions, Mode, MODE_HINT};
use mineos_heartbeat::interactive;
use mineos_heartbeat::logging;
use mineos_heartbeat::mineos::MineOs;
use mineos_heartbeat::monitor::{Heartbeat, StateFiles, Targets, Timing, INTERACTIVE_STAGGER};
use mineos_heartbeat::server::ServerBackend;
use mineos_heartbeat::settings::{EmailSettings, SettingsStore};
use mineos_heartbeat::{HeartbeatStatus, RestartLog};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Bare invocation shows help and fails
    if std::env::args_os().len() == 1 {
        let _ = cli::build_cli().print_help();
        println!();
        std::process::exit(1);
    }

    let matches = match cli::build_cli().try_get_matches() {
        Ok(m) => m,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                clap::error::ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(code);
        }
    };
    let opts = cli::options_from_matches(&matches);

    if let Err(e) = logging::init(opts.debug, &opts.log_file) {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
    log::debug!("Base directory: {}", opts.base_directory.display());

    if let Err(e) = run(opts).await {
        log::error!("{:#}", e);
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

async fn run(opts: CliOptions) -> Result<()> {
    let settings_dir = match &opts.settings_dir {
        Some(dir) => dir.clone(),
        None => SettingsStore::default_dir()?,
    };
    let store = SettingsStore::new(&settings_dir);
    let backend = MineOs::new(&opts.base_directory, &opts.mineos_home).with_dry_run(opts.dry_run);

    if opts.list {
        println!("Servers @ {}", opts.base_directory.display());
        for name in backend.list_servers()? {
            println!("{}", name);
        }
    }

    if opts.status {
        show_status(&settings_dir);
    }

    if opts.configure {
        configure(&store, &opts)?;
    }

    if opts.test_email {
        let notifier = EmailNotifier::new(store.load()?)?;
        notifier.notify(
            "[heartbeat] Test alert",
            "This is a test alert from the MineOS heartbeat monitor.\n",
        )?;
        println!("✅ Test alert sent");
    }

    let Some(mode) = opts.mode.clone() else {
        if opts.has_action() {
            return Ok(());
        }
        println!("{}", MODE_HINT);
        std::process::exit(1);
    };

    let notifier = if opts.email {
        let settings = store.load()?;
        Some(EmailNotifier::new(settings).context("E-mail alerts requested (-e)")?)
    } else {
        None
    };

    let mut timing = Timing {
        delay: Duration::from_secs(opts.delay),
        boot_wait: Duration::from_secs(opts.boot_wait),
        stagger: Duration::ZERO,
    };

    let targets = match mode {
        Mode::Single(name) => {
            if !backend.contains(&name)? {
                return Err(anyhow::anyhow!(
                    "Please enter a valid server name ({} not found in {})",
                    name,
                    backend.servers_dir().display()
                ));
            }
            println!("Single Server Mode: {}", name);
            Targets::Single(name)
        }
        Mode::Multi => {
            // fail fast on a bad base directory
            backend.list_servers()?;
            println!("Multi Server mode");
            Targets::All {
                onreboot_only: opts.onreboot,
            }
        }
        Mode::Interactive => {
            println!("Interactive Mode");
            let rows = interactive::status_rows(&backend)?;
            let stdin = io::stdin();
            let selected = interactive::select_servers(rows, stdin.lock(), io::stdout())?;
            timing.stagger = INTERACTIVE_STAGGER;
            Targets::Selected(selected)
        }
    };
    println!("Press Ctrl-C to quit");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n🛑 Stopping heartbeat...");
            let _ = shutdown_tx.send(true);
        }
    });

    let status = HeartbeatStatus::new(targets.mode_name(), backend.base_directory());
    let mut heartbeat = Heartbeat::new(&backend, timing, shutdown_rx, status).with_state_files(
        StateFiles {
            status: settings_dir.join("status.json"),
            restarts: settings_dir.join("restarts.json"),
        },
    );
    if let Some(n) = &notifier {
        heartbeat = heartbeat.with_notifier(n);
    }

    heartbeat.run(&targets).await
}

fn configure(store: &SettingsStore, opts: &CliOptions) -> Result<()> {
    let mut settings = match store.load() {
        Ok(s) => s,
        Err(e) => {
            log::warn!("Discarding unreadable settings: {:#}", e);
            EmailSettings::default()
        }
    };
    settings.apply(
        opts.username.as_deref(),
        opts.password.as_deref(),
        &opts.recipients,
    );

    let stdin = io::stdin();
    let mut input = stdin.lock();
    if settings.username.is_empty() {
        settings.username = prompt(&mut input, "Username (sending address): ")?;
    }
    if settings.password.is_empty() {
        settings.password = prompt(&mut input, "Password: ")?;
    }
    if settings.recipients.is_empty() {
        settings.recipients = prompt(&mut input, "Recipients (comma separated): ")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    store.save(&settings, opts.encoding)?;
    println!(
        "✅ Saved e-mail settings ({}) to {}",
        opts.encoding,
        store.settings_path().display()
    );
    Ok(())
}

fn prompt<R: BufRead>(input: &mut R, label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn show_status(dir: &Path) {
    match HeartbeatStatus::load(&dir.join("status.json")) {
        Some(status) => {
            println!("💓 Heartbeat Status");
            println!("PID: {}", status.pid);
            println!("Mode: {}", status.mode);
            println!("Base: {}", status.base_directory);
            println!("Started: {}", status.started);
            for server in &status.servers {
                let state = match server.up {
                    Some(true) => "UP",
                    Some(false) => "DOWN",
                    None => "UNKNOWN",
                };
                println!(
                    "   - {:<20} {:<8} checked {} ({} restarts)",
                    server.name, state, server.last_checked, server.restarts
                );
            }
        }
        None => println!("❌ No heartbeat status recorded yet"),
    }

    let log = RestartLog::load(&dir.join("restarts.json"));
    let recent = log.recent(10);
    if !recent.is_empty() {
        println!("Recent restarts:");
        for entry in recent {
            println!(
                "   [{}] {} {} ({})",
                entry.timestamp,
                entry.server,
                if entry.success { "restarted" } else { "FAILED" },
                entry.detail
            );
        }
    }
}
