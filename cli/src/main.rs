//! Portwarden CLI - See what is listening on your ports
//!
//! A command-line tool for listing listeners, inspecting a single port,
//! waiting for a port to open or close, watching ports live and
//! terminating the process that holds a port.

mod commands;
mod output;
mod prompt;
mod tui;

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use portwarden_core::SortKey;
use tracing_subscriber::EnvFilter;

use commands::{parse_duration, parse_sort, Context, GlobalOpts};

#[derive(Parser)]
#[command(name = "portwarden")]
#[command(author, version, about = "See what is listening on your ports")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Show details for a single port
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Refresh the view until 'q' is pressed
    #[arg(short, long)]
    watch: bool,

    /// Watch refresh interval (e.g. 500ms, 2s)
    #[arg(long, value_parser = parse_duration)]
    interval: Option<Duration>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Omit the table header
    #[arg(long, global = true)]
    no_header: bool,

    /// Only TCP listeners
    #[arg(short, long, global = true)]
    tcp: bool,

    /// Only UDP listeners
    #[arg(short, long, global = true)]
    udp: bool,

    /// Sort by port, pid, user, conns or uptime
    #[arg(long, global = true, value_parser = parse_sort)]
    sort: Option<SortKey>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find listeners by process name, user, port or PID
    Find {
        /// Case-insensitive substring, or a port/PID number
        pattern: String,
    },

    /// List ports owned by a process
    Pid {
        /// Process ID
        pid: u32,
    },

    /// Show details for a single port
    Port {
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,

        /// Refresh the view until 'q' is pressed
        #[arg(short, long)]
        watch: bool,

        /// Watch refresh interval (e.g. 500ms, 2s)
        #[arg(long, value_parser = parse_duration)]
        interval: Option<Duration>,
    },

    /// Block until a port is in use (or free with --invert)
    Wait {
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,

        /// Give up after this long (e.g. 30s, 2m)
        #[arg(long, value_parser = parse_duration)]
        timeout: Option<Duration>,

        /// Delay between polls
        #[arg(short, long, value_parser = parse_duration)]
        interval: Option<Duration>,

        /// Wait for the port to become free
        #[arg(long)]
        invert: bool,

        /// Only report through the exit code
        #[arg(short, long)]
        quiet: bool,

        /// Shell command to run once the port is ready
        #[arg(short, long)]
        exec: Option<String>,
    },

    /// Terminate the process listening on a port
    Kill {
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Signal to send first (TERM, INT, HUP, KILL)
        #[arg(short, long, default_value = "TERM")]
        signal: String,

        /// Send SIGKILL if the process outlives the grace period
        #[arg(short, long)]
        force: bool,

        /// Grace period before giving up or escalating
        #[arg(long, value_parser = parse_duration)]
        timeout: Option<Duration>,

        /// Suppress progress messages
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show or change saved defaults
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print current settings
    Show,
    /// Change one setting
    Set { key: String, value: String },
    /// Print the config file location
    Path,
}

impl Cli {
    fn globals(&self) -> GlobalOpts {
        GlobalOpts {
            json: self.json,
            no_header: self.no_header,
            tcp: self.tcp,
            udp: self.udp,
            sort: self.sort,
        }
    }

    fn is_watch(&self) -> bool {
        match &self.command {
            Some(Commands::Port { watch, .. }) => *watch,
            Some(_) => false,
            None => self.watch,
        }
    }
}

fn init_tracing(watch: bool) {
    // Watch mode stays silent unless PORTWARDEN_LOG says otherwise
    let filter = match std::env::var("PORTWARDEN_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => EnvFilter::new(if watch { "off" } else { "warn" }),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.is_watch());

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<portwarden_core::Error>()
                .map_or(1, |err| err.exit_code());
            ExitCode::from(code as u8)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let ctx = Context::load(cli.globals()).await;

    match cli.command {
        Some(Commands::Find { pattern }) => commands::find::run(&ctx, &pattern).await,
        Some(Commands::Pid { pid }) => commands::pid::run(&ctx, pid).await,
        Some(Commands::Port {
            port,
            watch,
            interval,
        }) => commands::port::run(&ctx, port, watch, interval).await,
        Some(Commands::Wait {
            port,
            timeout,
            interval,
            invert,
            quiet,
            exec,
        }) => {
            let args = commands::wait::WaitArgs {
                port,
                timeout,
                interval,
                invert,
                quiet,
                exec,
            };
            commands::wait::run(&ctx, args).await
        }
        Some(Commands::Kill {
            port,
            yes,
            signal,
            force,
            timeout,
            quiet,
        }) => {
            let args = commands::kill::KillArgs {
                port,
                yes,
                signal,
                force,
                timeout,
                quiet,
            };
            commands::kill::run(&ctx, args).await
        }
        Some(Commands::Config { action }) => match action {
            None | Some(ConfigAction::Show) => commands::config::show(&ctx).await,
            Some(ConfigAction::Set { key, value }) => {
                commands::config::set(&ctx, &key, &value).await
            }
            Some(ConfigAction::Path) => commands::config::path().await,
        },
        None => match cli.port {
            Some(port) => commands::port::run(&ctx, port, cli.watch, cli.interval).await,
            None => commands::list::run(&ctx, cli.watch, cli.interval).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positional_port_with_globals() {
        let cli = Cli::try_parse_from(["portwarden", "5432", "--json", "-w"]).unwrap();
        assert_eq!(cli.port, Some(5432));
        assert!(cli.json);
        assert!(cli.is_watch());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["portwarden", "find", "node", "--sort", "conns", "-t"]).unwrap();
        let globals = cli.globals();
        assert!(globals.tcp);
        assert_eq!(globals.sort, Some(SortKey::Conns));
        assert!(matches!(cli.command, Some(Commands::Find { .. })));
    }

    #[test]
    fn test_port_zero_rejected() {
        assert!(Cli::try_parse_from(["portwarden", "0"]).is_err());
        assert!(Cli::try_parse_from(["portwarden", "kill", "0"]).is_err());
    }

    #[test]
    fn test_wait_flags() {
        let cli = Cli::try_parse_from([
            "portwarden", "wait", "3000", "--timeout", "5s", "-i", "250ms", "--invert", "-e", "echo up",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Wait {
                port,
                timeout,
                interval,
                invert,
                exec,
                ..
            }) => {
                assert_eq!(port, 3000);
                assert_eq!(timeout, Some(Duration::from_secs(5)));
                assert_eq!(interval, Some(Duration::from_millis(250)));
                assert!(invert);
                assert_eq!(exec.as_deref(), Some("echo up"));
            }
            _ => panic!("expected wait"),
        }
    }

    #[test]
    fn test_kill_defaults() {
        let cli = Cli::try_parse_from(["portwarden", "kill", "8080"]).unwrap();
        match cli.command {
            Some(Commands::Kill {
                signal, yes, force, ..
            }) => {
                assert_eq!(signal, "TERM");
                assert!(!yes);
                assert!(!force);
            }
            _ => panic!("expected kill"),
        }
    }

    #[test]
    fn test_port_subcommand_watch() {
        let cli = Cli::try_parse_from(["portwarden", "port", "80", "-w", "--interval", "2s"]).unwrap();
        assert!(cli.is_watch());
    }
}
