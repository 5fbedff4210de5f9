use crate::codec::Encoding;
use crate::logging::DEFAULT_LOG_FILE;
use crate::mineos::{DEFAULT_BASE_DIRECTORY, DEFAULT_MINEOS_HOME};
use crate::monitor::{DEFAULT_BOOT_WAIT_SECS, DEFAULT_DELAY_SECS};
use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

pub const MODE_HINT: &str = "Please specify mode (-s, -i or -m) to start monitoring";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Single(String),
    Interactive,
    Multi,
}

#[derive(Debug, Clone)]
pub struct CliOptions {
    pub mode: Option<Mode>,
    pub delay: u64,
    pub boot_wait: u64,
    pub base_directory: PathBuf,
    pub mineos_home: PathBuf,
    pub list: bool,
    pub debug: bool,
    pub log_file: PathBuf,
    pub email: bool,
    pub configure: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub recipients: Vec<String>,
    pub encoding: Encoding,
    pub test_email: bool,
    pub onreboot: bool,
    pub dry_run: bool,
    pub settings_dir: Option<PathBuf>,
    pub status: bool,
}

impl CliOptions {
    /// True when the invocation does something besides monitoring.
    pub fn has_action(&self) -> bool {
        self.list || self.configure || self.test_email || self.status
    }
}

pub fn build_cli() -> Command {
    Command::new("heartbeat")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A MineOS Server Monitor")
        .after_help(MODE_HINT)
        .arg(
            Arg::new("single")
                .short('s')
                .long("single")
                .value_name("NAME")
                .help_heading("Single Server Mode")
                .help("Single server watch mode"),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .action(ArgAction::SetTrue)
                .help_heading("Interactive Mode")
                .help("Interactive menu mode"),
        )
        .arg(
            Arg::new("multi")
                .short('m')
                .long("multi")
                .action(ArgAction::SetTrue)
                .help_heading("Multi Server Mode")
                .help("Multi server watch mode"),
        )
        .group(ArgGroup::new("mode").args(["single", "interactive", "multi"]))
        .arg(
            Arg::new("onreboot")
                .long("onreboot")
                .action(ArgAction::SetTrue)
                .requires("multi")
                .conflicts_with_all(["single", "interactive"])
                .help_heading("Multi Server Mode")
                .help("Only watch servers flagged [onreboot] start in server.config"),
        )
        .arg(
            Arg::new("delay")
                .short('d')
                .long("delay")
                .value_name("SECONDS")
                .value_parser(value_parser!(u64).range(1..))
                .default_value("60")
                .help("Wait x seconds between checks (ex. 60)"),
        )
        .arg(
            Arg::new("boot_wait")
                .long("boot-wait")
                .value_name("SECONDS")
                .value_parser(value_parser!(u64))
                .default_value("120")
                .help("Wait x seconds after a restart before checking again"),
        )
        .arg(
            Arg::new("base_directory")
                .short('b')
                .long("base_directory")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_BASE_DIRECTORY)
                .help("MineOS Server Base Location (ex. /var/games/minecraft)"),
        )
        .arg(
            Arg::new("mineos")
                .long("mineos")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_MINEOS_HOME)
                .help("MineOS install directory holding mineos_console.py"),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .action(ArgAction::SetTrue)
                .help("List MineOS Servers"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Debug Logging Flag"),
        )
        .arg(
            Arg::new("log_file")
                .long("log-file")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_LOG_FILE)
                .help("Log file used when --debug is off"),
        )
        .arg(
            Arg::new("dry_run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Report restarts without running them"),
        )
        .arg(
            Arg::new("status")
                .long("status")
                .action(ArgAction::SetTrue)
                .help("Show the state recorded by the last heartbeat"),
        )
        .arg(
            Arg::new("email")
                .short('e')
                .long("email")
                .action(ArgAction::SetTrue)
                .help_heading("E-mail Alerts")
                .help("Mail an alert whenever a server is restarted"),
        )
        .arg(
            Arg::new("configure")
                .short('c')
                .long("configure")
                .action(ArgAction::SetTrue)
                .help_heading("E-mail Alerts")
                .help("Save e-mail settings (prompts for anything not given)"),
        )
        .arg(
            Arg::new("username")
                .short('u')
                .long("username")
                .value_name("ADDRESS")
                .help_heading("E-mail Alerts")
                .help("Sending account"),
        )
        .arg(
            Arg::new("password")
                .short('p')
                .long("password")
                .value_name("PASSWORD")
                .help_heading("E-mail Alerts")
                .help("Sending account password"),
        )
        .arg(
            Arg::new("to")
                .short('t')
                .long("to")
                .value_name("ADDRESS")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .help_heading("E-mail Alerts")
                .help("Alert recipients (comma separated)"),
        )
        .arg(
            Arg::new("encoding")
                .long("encoding")
                .value_parser(Encoding::ALL.map(|e| e.as_str()))
                .default_value(Encoding::Sealed.as_str())
                .help_heading("E-mail Alerts")
                .help("How the settings file is stored"),
        )
        .arg(
            Arg::new("test_email")
                .long("test-email")
                .action(ArgAction::SetTrue)
                .help_heading("E-mail Alerts")
                .help("Send a test alert and exit"),
        )
        .arg(
            Arg::new("settings_dir")
                .long("settings-dir")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Directory for settings and state (default ~/.heartbeat)"),
        )
}

pub fn options_from_matches(matches: &ArgMatches) -> CliOptions {
    let mode = if let Some(name) = matches.get_one::<String>("single") {
        Some(Mode::Single(name.clone()))
    } else if matches.get_flag("interactive") {
        Some(Mode::Interactive)
    } else if matches.get_flag("multi") {
        Some(Mode::Multi)
    } else {
        None
    };

    let encoding = matches
        .get_one::<String>("encoding")
        .and_then(|e| e.parse().ok())
        .unwrap_or(Encoding::Sealed);

    CliOptions {
        mode,
        delay: matches
            .get_one::<u64>("delay")
            .copied()
            .unwrap_or(DEFAULT_DELAY_SECS),
        boot_wait: matches
            .get_one::<u64>("boot_wait")
            .copied()
            .unwrap_or(DEFAULT_BOOT_WAIT_SECS),
        base_directory: matches
            .get_one::<PathBuf>("base_directory")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_DIRECTORY)),
        mineos_home: matches
            .get_one::<PathBuf>("mineos")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MINEOS_HOME)),
        list: matches.get_flag("list"),
        debug: matches.get_flag("debug"),
        log_file: matches
            .get_one::<PathBuf>("log_file")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        email: matches.get_flag("email"),
        configure: matches.get_flag("configure"),
        username: matches.get_one::<String>("username").cloned(),
        password: matches.get_one::<String>("password").cloned(),
        recipients: matches
            .get_many::<String>("to")
            .map(|v| {
                v.map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        encoding,
        test_email: matches.get_flag("test_email"),
        onreboot: matches.get_flag("onreboot"),
        dry_run: matches.get_flag("dry_run"),
        settings_dir: matches.get_one::<PathBuf>("settings_dir").cloned(),
        status: matches.get_flag("status"),
    }
}

pub fn try_parse_from<I, T>(args: I) -> Result<CliOptions, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_cli().try_get_matches_from(args)?;
    Ok(options_from_matches(&matches))
}
