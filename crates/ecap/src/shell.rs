//! Line-oriented front-end: one message per line, like a chat with the bot.

use anyhow::{Context, Result};
use ecap::attendance::{refresh, run_pipeline, CredentialStore, Credentials, PortalConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
I can help you check your Vignan ECAP attendance.

How to use:
  • Send your credentials: <rollnumber> <password>
    Example: 23l31a4391 mypassword
  • refresh <rollnumber>   fetch again with the credentials you sent before
  • cancel                 forget all stored credentials
  • quit

You can check multiple accounts by sending different credentials!";

#[derive(Debug, PartialEq)]
enum ShellCommand {
    Help,
    Quit,
    Cancel,
    Refresh(String),
    Check(Credentials),
    /// Anything that isn't a command or a credential line
    Ignore,
}

fn parse_command(line: &str) -> ShellCommand {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => return ShellCommand::Ignore,
        "help" | "/start" | "/help" => return ShellCommand::Help,
        "quit" | "exit" => return ShellCommand::Quit,
        "cancel" | "/cancel" => return ShellCommand::Cancel,
        _ => {}
    }

    if let Some((word, rest)) = line.split_once(' ') {
        if word.eq_ignore_ascii_case("refresh") && !rest.trim().is_empty() {
            return ShellCommand::Refresh(rest.trim().to_string());
        }
    }

    match Credentials::parse_line(line) {
        Some(credentials) => ShellCommand::Check(credentials),
        None => ShellCommand::Ignore,
    }
}

/// Runs the interactive loop until EOF, `quit` or Ctrl-C.
pub async fn run(config: PortalConfig) -> Result<()> {
    let store = CredentialStore::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_command(&line) {
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => break,
            ShellCommand::Cancel => {
                let count = store.clear();
                if count > 0 {
                    println!("✅ Cleared {count} stored session(s).");
                } else {
                    println!("No active sessions to clear.");
                }
            }
            ShellCommand::Refresh(identifier) => {
                if store.get(&identifier).is_none() {
                    println!(
                        "❌ Session expired for {identifier}.\n\nPlease send credentials again: {identifier} <password>"
                    );
                    continue;
                }
                println!("🔄 Refreshing data for {identifier}...");
                match refresh(&store, &config, &identifier).await {
                    Ok(report) => println!("{}\n\n🔄 refresh {identifier}", report.render()),
                    Err(e) => println!("❌ {}", e.user_message()),
                }
            }
            ShellCommand::Check(credentials) => {
                println!("🔐 Logging in as {}...", credentials.identifier());
                match run_pipeline(&config, &credentials).await {
                    Ok(report) => {
                        let identifier = credentials.identifier().to_string();
                        store.insert(credentials);
                        println!("{}\n\n🔄 refresh {identifier}", report.render());
                    }
                    Err(e) => println!("❌ {}", e.user_message()),
                }
            }
            ShellCommand::Ignore => debug!("Ignoring non-command input"),
        }
    }

    Ok(())
}
