//! Command execution.

use crate::Commands;
use babelhelper_client::{Client, Event, EventType, ObjectType, OwnedEvent, Param};
use babelhelper_protocol::address::{ipv6_to_mac, mac_to_ipv6, MacAddr};
use babelhelper_protocol::{decode_event, Message};
use colored::Colorize;

/// Executes a command against the daemon and returns the formatted output.
pub async fn execute(
    client: &mut Client,
    cmd: Commands,
    json: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Dump => {
            let events = client.dump().await?;
            if events.is_empty() {
                return Ok("Nothing to dump".yellow().to_string());
            }
            Ok(format_owned_events(&events, json))
        }

        Commands::Send { command } => {
            let lines = client.send(&command.join(" ")).await?;
            Ok(format_lines(&lines, json))
        }

        // Handled directly in main.rs
        Commands::Repl | Commands::Monitor => unreachable!(),
        Commands::MacToIp { .. } | Commands::IpToMac { .. } => execute_offline(&cmd),
    }
}

/// Executes a command that needs no daemon connection.
pub fn execute_offline(cmd: &Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::MacToIp { mac, prefix } => {
            let mac: MacAddr = mac.parse()?;
            Ok(mac_to_ipv6(mac, *prefix).to_string())
        }
        Commands::IpToMac { addr } => Ok(ipv6_to_mac(*addr)?.to_string()),
        _ => Err("command requires a daemon connection".into()),
    }
}

/// Formats a single event for display.
pub fn format_event(event: &Event<'_>, json: bool) -> String {
    if json {
        return serde_json::to_string(event).unwrap_or_default();
    }
    format_parts(
        event.event_type,
        event.object_type,
        event.object,
        event.params(),
    )
}

/// Formats events collected from a batch.
pub fn format_owned_events(events: &[OwnedEvent], json: bool) -> String {
    events
        .iter()
        .map(|event| {
            if json {
                serde_json::to_string(event).unwrap_or_default()
            } else {
                format_parts(
                    event.event_type,
                    event.object_type,
                    &event.object,
                    event.params.iter().map(|(p, v)| (*p, v.as_str())),
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats raw response lines, decoding the ones that look like events.
pub fn format_lines(lines: &[String], json: bool) -> String {
    if lines.is_empty() {
        return "ok".green().to_string();
    }
    lines
        .iter()
        .map(|line| match decode_event(line) {
            Message::Event(event) if event.event_type != EventType::Unknown => {
                format_event(&event, json)
            }
            _ => line.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_parts<'a>(
    event_type: EventType,
    object_type: ObjectType,
    object: &str,
    params: impl Iterator<Item = (Param, &'a str)>,
) -> String {
    let verb = match event_type {
        EventType::Add => event_type.as_str().green(),
        EventType::Change => event_type.as_str().yellow(),
        EventType::Flush => event_type.as_str().red(),
        EventType::Unknown => event_type.as_str().dimmed(),
    };

    let mut output = format!("{} {} {}", verb, object_type.as_str().cyan(), object.bold());
    for (param, value) in params {
        output.push_str(&format!("\n  {:>10} {}", param.as_str().dimmed(), value));
    }
    output
}
