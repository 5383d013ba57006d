//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use crate::agent::GraphKind;
use crate::cli::repl::Repl;
use crate::core::{Config, Result, Role};
use crate::llm::OllamaClient;

/// Result of parsing a command
pub enum CommandResult {
    /// Continue processing as normal input
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// Clear history
    Clear,
    /// No output needed
    None,
}

/// Parse and handle special commands
pub async fn handle_command(input: &str, repl: &mut Repl) -> Result<CommandResult> {
    let input = input.trim();
    let (cmd, args) = match input.split_once(' ') {
        Some((cmd, args)) => (cmd.to_lowercase(), args.trim()),
        None => (input.to_lowercase(), ""),
    };

    match cmd.trim_start_matches('/') {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "clear" | "reset" => {
            repl.clear_history();
            Ok(CommandResult::Clear)
        }

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "history" => Ok(CommandResult::Handled(format_history(repl))),

        "instructions" => show_instructions(repl).await.map(CommandResult::Handled),

        "models" => list_models(repl.config()).await.map(CommandResult::Handled),

        "config" => match args {
            "" => Ok(CommandResult::Handled(format!(
                "Config file: {}\n\n{}",
                Config::config_file().display(),
                repl.config().to_toml()?
            ))),
            "save" => {
                let path = repl.config().save()?;
                Ok(CommandResult::Handled(format!("Saved config to {}", path.display())))
            }
            _ => Ok(CommandResult::Handled("Usage: config [save]".to_string())),
        },

        "graph" => {
            if args.is_empty() {
                return Ok(CommandResult::Handled(format!(
                    "Current graph: {}\nUsage: graph <builder|template|title>",
                    repl.kind()
                )));
            }
            let kind: GraphKind = args.parse()?;
            repl.set_graph(kind)?;
            Ok(CommandResult::Handled(format!(
                "Graph set to: {} (model {})",
                kind,
                repl.run_config().model
            )))
        }

        _ => {
            // Not a command, treat as normal input
            if input.starts_with('/') {
                Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )))
            } else {
                Ok(CommandResult::Continue(input.to_string()))
            }
        }
    }
}

fn format_history(repl: &Repl) -> String {
    if repl.history().is_empty() {
        return "History is empty.".to_string();
    }

    repl.history()
        .iter()
        .map(|m| match m.role {
            Role::Assistant if m.has_tool_calls() => {
                let names: Vec<&str> = m.tool_calls.iter().map(|c| c.name.as_str()).collect();
                format!("[assistant] -> {}", names.join(", "))
            }
            Role::Tool => format!(
                "[tool:{}] {}",
                m.name.as_deref().unwrap_or("?"),
                truncate(m.text(), 80)
            ),
            role => format!("[{}] {}", role, truncate(m.text(), 80)),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn show_instructions(repl: &Repl) -> Result<String> {
    let Some(store) = &repl.services().instructions else {
        return Ok("No instruction store configured.".to_string());
    };

    let run = repl.run_config();
    let record = store.load(&run.user_id, &run.assistant_id).await?;

    Ok(match record {
        Some(record) if !record.fields.is_empty() => record
            .fields
            .iter()
            .map(|(field, value)| format!("{}:\n  {}", field, value.replace('\n', "\n  ")))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => format!("Nothing stored for assistant '{}'.", run.assistant_id),
    })
}

async fn list_models(config: &Config) -> Result<String> {
    let models = OllamaClient::from_config(config)?.list_models().await?;
    if models.is_empty() {
        return Ok("No models installed.".to_string());
    }
    Ok(models
        .iter()
        .map(|m| format!("  ollama/{}", m))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn truncate(text: &str, max: usize) -> String {
    let text = text.replace('\n', " ");
    if text.chars().count() <= max {
        text
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}

/// Generate help text
fn help_text() -> String {
    r#"Forge Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit Forge
  clear, reset     Clear conversation history
  history          Show the conversation so far
  instructions     Show the stored instructions of the assistant
  graph <kind>     Switch graph: builder, template or title
  models           List models available in Ollama
  config [save]    Show the active config, or write it to disk

Keyboard Shortcuts:
  Ctrl+C           Stop the current run after its current step
  Ctrl+D           Exit Forge

Tips:
  - Shape an assistant in the builder graph, then try it in template
  - The title graph names the current conversation
─────────────────────────────────────────────"#
        .to_string()
}
