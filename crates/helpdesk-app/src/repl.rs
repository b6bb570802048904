//! Interactive terminal chat.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use helpdesk_agent::{is_affirmative, AgentError, Confirmer, TurnContext, NO_INFO_FOUND};
use helpdesk_storage::SupportStore;

use crate::services::Services;

const EXIT_WORDS: &[&str] = &["quit", "exit", "q"];
const FAREWELL: &str = "Goodbye! Thank you for using our support service.";

/// Print `prompt` and read one line from stdin off the async runtime.
///
/// `None` on end of input or a read error.
async fn read_line(prompt: String) -> Option<String> {
    tokio::task::spawn_blocking(move || {
        print!("{prompt}");
        io::stdout().flush().ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    })
    .await
    .ok()
    .flatten()
}

/// Asks yes/no questions on the terminal.
pub struct TerminalConfirmer;

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        read_line(format!("\n{prompt}"))
            .await
            .is_some_and(|answer| is_affirmative(&answer))
    }
}

pub fn is_exit(input: &str) -> bool {
    EXIT_WORDS.contains(&input.trim().to_lowercase().as_str())
}

/// Run the chat loop until the user quits, says goodbye, or presses Ctrl-C.
pub async fn run(services: &Services, user: Option<String>) {
    let stats = services.knowledge.stats();
    println!("Autonomous Customer Support Agent Ready!");
    println!("Type 'quit', 'exit', or 'q' to stop.\n");
    match services.store.ping() {
        Ok(()) => println!("Database connected successfully"),
        Err(e) => println!("Database connection failed: {e}"),
    }
    println!(
        "Knowledge base: {} chunks from {} documents\n",
        stats.chunk_count, stats.source_count
    );

    let context = TurnContext::new(Arc::new(TerminalConfirmer)).with_user_name(user);
    let mut session = services.agent.new_session();

    loop {
        let input = tokio::select! {
            line = read_line("User: ".to_string()) => line,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(input) = input else {
            println!("\n{FAREWELL}");
            break;
        };
        if input.is_empty() {
            continue;
        }
        if is_exit(&input) {
            println!("{FAREWELL}");
            break;
        }

        match services
            .agent
            .respond(&mut session, &input, &context)
            .await
        {
            Ok(reply) => {
                println!("Assistant: {}\n", reply.answer);
                if reply.answer.trim() == NO_INFO_FOUND {
                    offer_ticket(services, &context, &input).await;
                }
                if reply.farewell {
                    break;
                }
            }
            Err(e @ (AgentError::EmptyMessage | AgentError::MessageTooLong(_))) => {
                println!("Assistant: {e}\n");
            }
            Err(e) => {
                error!(error = %e, "Turn failed");
                println!("Assistant: Sorry, something went wrong ({e}). Please try again.\n");
            }
        }
    }
}

/// The model passed the no-information sentinel through verbatim; offer a
/// ticket directly.
async fn offer_ticket(services: &Services, context: &TurnContext, question: &str) {
    println!("Assistant: I apologize, I don't have an answer to that.");
    let prompt = "Would you like me to create a support ticket for this issue? (yes/no): ";
    if !context.confirmer.confirm(prompt).await {
        println!("Okay, no ticket created.\n");
        return;
    }

    let user = context.user_name.as_deref().unwrap_or("anonymous");
    match services.store.create_ticket(user, question) {
        Ok(ticket) => println!(
            "Support ticket #{} created successfully. Our support team will reach out to you soon.\n",
            ticket.ticket_id
        ),
        Err(e) => {
            warn!(error = %e, "Ticket creation failed");
            println!("Failed to create a support ticket. Please try again later.\n");
        }
    }
}
