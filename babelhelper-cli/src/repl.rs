//! Interactive REPL.

use crate::commands::{format_lines, format_owned_events};
use babelhelper_client::{Client, ClientError, ConnectionConfig};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

const HELP_TEXT: &str = r#"
Available commands:
  help                          Show this help
  dump                          Dump interfaces, neighbours and routes
  reconnect                     Drop the connection and open a new one

  Anything else is sent to the daemon as-is, for example:
  dump-neighbours, dump-routes, flush interface eth0

  quit, exit                    Exit the REPL
"#;

pub async fn run(config: ConnectionConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "babelctl".bold().cyan());
    println!("Connecting to {}...", config.addr);

    let mut client = Client::connect(config.clone()).await?;
    println!("{}", "Connected!".green());

    // Create readline editor
    let rl_config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(rl_config)?;

    // Load history
    let history_path = home::home_dir()
        .map(|h| h.join(".babelctl_history"))
        .unwrap_or_else(|| ".babelctl_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "babel>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match line {
                    "help" | "?" => println!("{}", HELP_TEXT),
                    "quit" | "exit" | "q" => break,
                    "reconnect" => {
                        let _ = client.close().await;
                        client = Client::connect(config.clone()).await?;
                        println!("{}\n", "Reconnected.".green());
                    }
                    _ => match execute_repl_command(&mut client, line, json).await {
                        Ok(output) => println!("{}\n", output),
                        Err(e) => {
                            println!("{}: {}\n", "Error".red(), e);
                            if !client.connection().is_ready() {
                                println!("{}\n", "Type 'reconnect' to open a new connection.".dimmed());
                            }
                        }
                    },
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&history_path);

    // Disconnect
    let _ = client.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

async fn execute_repl_command(
    client: &mut Client,
    line: &str,
    json: bool,
) -> Result<String, ClientError> {
    if line == "dump" {
        let events = client.dump().await?;
        if events.is_empty() {
            return Ok("Nothing to dump".yellow().to_string());
        }
        return Ok(format_owned_events(&events, json));
    }

    let lines = client.send(line).await?;
    Ok(format_lines(&lines, json))
}
