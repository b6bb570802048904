//! Helpdesk binary: composition root.
//!
//! 1. Load configuration from TOML (plus `.env` and CLI overrides)
//! 2. Open the ticket database and the knowledge index
//! 3. Sync the document index
//! 4. Run the terminal chat, the HTTP API, or a one-off maintenance command

mod cli;
mod repl;
mod services;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use helpdesk_api::AppState;
use helpdesk_core::config::HelpdeskConfig;
use helpdesk_core::types::{Ticket, TicketStatus};
use helpdesk_storage::SupportStore;

use crate::cli::{CliArgs, Command, TicketCommand};
use crate::services::{open_store, Services};

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn print_ticket(ticket: &Ticket) {
    println!("{} ({})", ticket.ticket_id, ticket.status);
    println!("  From:     {}", ticket.user_name);
    println!(
        "  Created:  {}",
        ticket.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
    );
    println!("  Issue:    {}", ticket.issue);
    println!(
        "  Response: {}",
        ticket.response.as_deref().unwrap_or("Pending from support.")
    );
}

async fn run_ticket_command(
    config: &HelpdeskConfig,
    action: TicketCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config)?;

    match action {
        TicketCommand::Show { id } => {
            let id = id.trim().to_uppercase();
            match store.ticket(&id)? {
                Some(ticket) => print_ticket(&ticket),
                None => println!("Ticket {id} not found."),
            }
        }
        TicketCommand::List { status, limit } => {
            let status = status.as_deref().map(str::parse::<TicketStatus>).transpose()?;
            let tickets = store.list_tickets(status, limit)?;
            if tickets.is_empty() {
                println!("No tickets.");
            }
            for ticket in &tickets {
                println!(
                    "{}  {:<6}  {:<12}  {}",
                    ticket.ticket_id, ticket.status, ticket.user_name, ticket.issue
                );
            }
        }
        TicketCommand::Respond {
            id,
            response,
            keep_open,
        } => {
            let id = id.trim().to_uppercase();
            let status = if keep_open {
                TicketStatus::Open
            } else {
                TicketStatus::Closed
            };
            if store.respond_to_ticket(&id, response.trim(), status)? {
                println!("Ticket {id} updated ({status}).");
            } else {
                println!("Ticket {id} not found.");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    let config_path = args.resolve_config_path();
    let (mut config, load_error) = if config_path.exists() {
        match HelpdeskConfig::load(&config_path) {
            Ok(config) => (config, None),
            Err(e) => (HelpdeskConfig::default(), Some(e)),
        }
    } else {
        (HelpdeskConfig::default(), None)
    };
    args.apply_overrides(&mut config);

    init_tracing(&config.general.log_level);
    tracing::info!("Starting helpdesk v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) => tracing::warn!(
            path = %config_path.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
        None => tracing::info!(path = %config_path.display(), "Configuration resolved"),
    }

    match args.command() {
        Command::Ticket { action } => run_ticket_command(&config, action).await?,
        Command::Index => {
            let services = Services::build(config)?;
            let report = services.sync_knowledge().await?;
            if report.reused {
                println!("Index is up to date.");
            }
            for name in &report.processed {
                println!("indexed  {name}");
            }
            for name in &report.removed_sources {
                println!("removed  {name}");
            }
            for name in &report.failed {
                println!("failed   {name}");
            }
            let stats = services.knowledge.stats();
            println!(
                "{} chunks from {} documents in '{}'",
                stats.chunk_count, stats.source_count, stats.collection_name
            );
            services.shutdown();
        }
        Command::Chat { user, skip_sync } => {
            let services = Services::build(config)?;
            if !skip_sync {
                println!("Initializing knowledge base...");
                services.sync_knowledge().await?;
            }
            repl::run(&services, user).await;
            services.shutdown();
        }
        Command::Serve { skip_sync, .. } => {
            let services = Services::build(config)?;
            if !skip_sync {
                services.sync_knowledge().await?;
            }
            let state = AppState::new(
                services.config.clone(),
                services.agent.clone(),
                services.store.clone(),
                services.knowledge.clone(),
            );
            helpdesk_api::start_server(state, shutdown_signal()).await?;
            services.shutdown();
        }
    }

    Ok(())
}
