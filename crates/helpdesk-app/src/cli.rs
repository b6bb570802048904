//! CLI argument definitions for the helpdesk binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use helpdesk_core::config::HelpdeskConfig;

/// Helpdesk: an autonomous customer support agent.
#[derive(Parser, Debug)]
#[command(name = "helpdesk", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for the database and the knowledge index.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory of support documents to index.
    #[arg(long = "documents", global = true)]
    pub documents_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Chat with the agent in the terminal (default).
    Chat {
        /// Name recorded on tickets created during the session.
        #[arg(short = 'u', long = "user")]
        user: Option<String>,
        /// Start without syncing the document index.
        #[arg(long = "skip-sync")]
        skip_sync: bool,
    },
    /// Serve the HTTP API.
    Serve {
        #[arg(long = "host")]
        host: Option<String>,
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
        #[arg(long = "skip-sync")]
        skip_sync: bool,
    },
    /// Sync the document index and print what changed.
    Index,
    /// Inspect and answer support tickets.
    Ticket {
        #[command(subcommand)]
        action: TicketCommand,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TicketCommand {
    /// Show one ticket.
    Show { id: String },
    /// List tickets, newest first.
    List {
        /// Only tickets with this status (open, closed).
        #[arg(long = "status")]
        status: Option<String>,
        #[arg(short = 'n', long = "limit", default_value_t = 20)]
        limit: u64,
    },
    /// Record a response to a ticket and close it.
    Respond {
        id: String,
        response: String,
        /// Leave the ticket open after responding.
        #[arg(long = "keep-open")]
        keep_open: bool,
    },
}

impl CliArgs {
    /// The subcommand to run; `chat` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat {
            user: None,
            skip_sync: false,
        })
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > HELPDESK_CONFIG env var > ~/.helpdesk/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("HELPDESK_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API port.
    ///
    /// Priority: --port flag > HELPDESK_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(Command::Serve { port: Some(p), .. }) = &self.command {
            return *p;
        }
        std::env::var("HELPDESK_PORT")
            .ok()
            .and_then(|val| val.parse::<u16>().ok())
            .unwrap_or(config_port)
    }

    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_overrides(&self, config: &mut HelpdeskConfig) {
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref dir) = self.documents_dir {
            config.knowledge.documents_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(Command::Serve { host: Some(host), .. }) = &self.command {
            config.api.host = host.clone();
        }
        config.api.port = self.resolve_port(config.api.port);
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".helpdesk").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".helpdesk").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_chat() {
        let args = CliArgs::try_parse_from(["helpdesk"]).unwrap();
        assert_eq!(
            args.command(),
            Command::Chat {
                user: None,
                skip_sync: false
            }
        );
    }

    #[test]
    fn test_ticket_subcommands() {
        let args = CliArgs::try_parse_from(["helpdesk", "ticket", "respond", "TKT-1", "Fixed now"])
            .unwrap();
        assert_eq!(
            args.command(),
            Command::Ticket {
                action: TicketCommand::Respond {
                    id: "TKT-1".into(),
                    response: "Fixed now".into(),
                    keep_open: false,
                }
            }
        );

        let args =
            CliArgs::try_parse_from(["helpdesk", "ticket", "list", "--status", "open"]).unwrap();
        assert_eq!(
            args.command(),
            Command::Ticket {
                action: TicketCommand::List {
                    status: Some("open".into()),
                    limit: 20,
                }
            }
        );
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let args = CliArgs::try_parse_from(["helpdesk", "-c", "/tmp/hd.toml", "index"]).unwrap();
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/hd.toml"));
        assert_eq!(args.command(), Command::Index);
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let args = CliArgs::try_parse_from([
            "helpdesk",
            "serve",
            "--port",
            "9100",
            "--host",
            "0.0.0.0",
            "--data-dir",
            "/srv/helpdesk",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let mut config = HelpdeskConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.api.port, 9100);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.general.data_dir, "/srv/helpdesk");
        assert_eq!(config.general.log_level, "debug");
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(CliArgs::try_parse_from(["helpdesk", "frobnicate"]).is_err());
    }
}
