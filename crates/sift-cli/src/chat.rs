//! Interactive chat mode with readline support.
//!
//! This is the transport adapter: it maps typed lines and commands onto
//! orchestrator calls and prints the replies. The orchestrator itself never
//! returns an error, so the loop only deals with terminal I/O failures.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::{Config, Editor};

use sift_chat::{AuthPolicy, Orchestrator};

/// Chat commands
enum ChatCommand {
    Quit,
    Clear,
    Analyze(String),
    Help,
    None(String), // Regular message
}

fn parse_command(input: &str) -> ChatCommand {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return ChatCommand::None(String::new());
    }

    if !trimmed.starts_with('/') {
        return ChatCommand::None(trimmed.to_string());
    }

    let parts: Vec<&str> = trimmed.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let arg = parts.get(1).map(|s| s.trim().to_string()).unwrap_or_default();

    match cmd.as_str() {
        "/quit" | "/exit" | "/q" => ChatCommand::Quit,
        "/clear" | "/c" => ChatCommand::Clear,
        "/analyze" | "/a" => ChatCommand::Analyze(arg),
        "/help" | "/?" => ChatCommand::Help,
        _ => {
            eprintln!("Unknown command: {}. Type /help for available commands.", cmd);
            ChatCommand::None(String::new())
        }
    }
}

fn print_help() {
    println!(
        r#"
Chat Commands:
  /help, /?        Show this help message
  /quit, /exit     Exit chat mode
  /clear, /c       Clear conversation history
  /analyze <url>   Analyze a single webpage

Anything else is sent to the assistant. Queries that need live
information trigger a web search automatically.

Tips:
  - Press Ctrl+D to exit
"#
    );
}

pub async fn run(orchestrator: &Orchestrator, auth: &AuthPolicy, user_id: &str) -> Result<()> {
    if !auth.permits(user_id) {
        println!("You are not authorized to use this bot.");
        return Ok(());
    }

    println!("sift chat - type /help for commands, Ctrl+D to exit");

    let rl_config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<(), FileHistory> = Editor::with_config(rl_config)?;

    loop {
        match rl.readline("> ") {
            Ok(line) => match parse_command(&line) {
                ChatCommand::Quit => break,
                ChatCommand::Clear => {
                    println!("{}", orchestrator.clear_history(user_id).await);
                }
                ChatCommand::Analyze(url) => {
                    if url.is_empty() {
                        eprintln!("Usage: /analyze <url>");
                        continue;
                    }
                    println!("{}", orchestrator.analyze_page(&url).await);
                }
                ChatCommand::Help => print_help(),
                ChatCommand::None(message) => {
                    if message.is_empty() {
                        continue;
                    }
                    let reply = orchestrator.respond(user_id, &message).await;
                    println!("{}", reply);
                }
            },
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
