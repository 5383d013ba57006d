//! Interactive REPL for Forge
//!
//! Keeps the conversation across runs; each line of input starts a new run
//! of the selected graph over the accumulated history.

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, GraphKind, RunConfig, Services};
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{Config, Message, Result, Role};
use crate::tools::{GeneratedOptions, InlineActionTool};

/// Cancellation token of the run in flight, shared with the Ctrl+C watcher
#[derive(Clone, Default)]
pub struct ActiveRun(Arc<Mutex<Option<CancellationToken>>>);

impl ActiveRun {
    fn slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new run and return its token
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.slot() = Some(token.clone());
        token
    }

    pub fn finish(&self) {
        self.slot().take();
    }

    /// Cancel the run in flight. Returns false when no run is active.
    pub fn interrupt(&self) -> bool {
        match self.slot().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Listen for Ctrl+C for the lifetime of the REPL.
///
/// An interrupt stops the active run after its current step; with no run
/// active it exits the process.
fn spawn_interrupt_watcher(active: ActiveRun) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if active.interrupt() {
                eprintln!("\nStopping after the current step...");
            } else {
                println!("\nGoodbye!");
                std::process::exit(130);
            }
        }
    })
}

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    config: Config,
    services: Services,
    agent: Agent,
    /// Settings for the next run
    run_config: RunConfig,
    /// Model chosen on the command line; wins over the per-graph default
    model_override: Option<String>,
    /// Conversation so far
    history: Vec<Message>,
    active: ActiveRun,
}

impl Repl {
    /// Create a REPL from configuration
    pub fn new(
        config: Config,
        kind: GraphKind,
        run_config: RunConfig,
        model_override: Option<String>,
    ) -> Result<Self> {
        let services = Services::from_config(&config)?;
        let agent = Agent::new(kind, &services)?;
        let mut repl = Self {
            config,
            services,
            agent,
            run_config,
            model_override,
            history: Vec::new(),
            active: ActiveRun::default(),
        };
        repl.run_config.model = repl.model_for(kind);
        Ok(repl)
    }

    /// Model identifier a graph runs with
    pub fn model_for(&self, kind: GraphKind) -> String {
        match (&self.model_override, kind) {
            (Some(model), _) => model.clone(),
            (None, GraphKind::Title) => self.config.models.title.clone(),
            (None, _) => self.config.models.default.clone(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn kind(&self) -> GraphKind {
        self.agent.kind()
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.run_config
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Switch to another graph, keeping the history
    pub fn set_graph(&mut self, kind: GraphKind) -> Result<()> {
        self.agent = Agent::new(kind, &self.services)?;
        self.run_config.model = self.model_for(kind);
        Ok(())
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner()?;
        let watcher = spawn_interrupt_watcher(self.active.clone());

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            // Print prompt
            print!("You: ");
            stdout.flush()?;

            // Read input
            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();

            if input.is_empty() {
                continue;
            }

            match handle_command(input, self).await {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Clear) => {
                    println!("Conversation cleared.\n");
                    continue;
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                    continue;
                }
                Ok(CommandResult::None) => continue,
                Ok(CommandResult::Continue(input)) => match self.send(&input).await {
                    Ok(reply) => println!("\n{}\n", reply),
                    Err(e) => eprintln!("\nError: {}\n", e),
                },
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                }
            }
        }

        watcher.abort();
        Ok(())
    }

    /// Run the graph over the history plus `input`. The run is registered
    /// with the interrupt watcher; the history is left unchanged when it
    /// fails.
    pub async fn send(&mut self, input: &str) -> Result<String> {
        let mut messages = self.history.clone();
        messages.push(Message::user(input));
        let start = messages.len();

        let cancel = self.active.begin();
        let result = self
            .agent
            .run_cancellable(messages, self.run_config.clone(), cancel)
            .await;
        self.active.finish();

        let conversation = result?;
        let reply = render_reply(&conversation[start.min(conversation.len())..]);
        self.history = conversation;
        Ok(reply)
    }

    /// Print the startup banner
    fn print_banner(&self) -> Result<()> {
        println!(
            r#"
+-----------------------------------------------+
|   FORGE  - assistant builder and playground   |
+-----------------------------------------------+
"#
        );
        println!("Ollama:     {}", self.config.ollama_url()?);
        println!("Graph:      {}", self.kind());
        println!("Model:      {}", self.run_config.model);
        println!(
            "Assistant:  {} (user {})",
            self.run_config.assistant_id, self.run_config.user_id
        );
        println!(
            "Search:     {}",
            if self.services.search.is_some() { "enabled" } else { "disabled" }
        );
        println!();
        println!("Commands: help, clear, history, instructions, graph <kind>, models, config, exit");
        println!("-----------------------------------------------");
        Ok(())
    }
}

/// Format the messages a run added
pub fn render_reply(new_messages: &[Message]) -> String {
    let mut lines = Vec::new();

    for message in new_messages {
        match message.role {
            Role::Tool => {
                let name = message.name.as_deref().unwrap_or("tool");
                if message.is_error {
                    lines.push(format!("  x {}: {}", name, message.text()));
                } else if name == InlineActionTool::NAME {
                    let options = serde_json::from_str::<GeneratedOptions>(message.text())
                        .map(|options| format_options(&options))
                        .unwrap_or_default();
                    if !options.is_empty() {
                        lines.push(options);
                    }
                } else {
                    lines.push(format!("  + {}", name));
                }
            }
            Role::Assistant if !message.text().trim().is_empty() => {
                lines.push(format!("Assistant:\n{}", message.text().trim()));
            }
            _ => {}
        }
    }

    if lines.is_empty() {
        "(no reply)".to_string()
    } else {
        lines.join("\n")
    }
}

fn format_options(options: &GeneratedOptions) -> String {
    let mut out = Vec::new();
    if !options.inline_options.is_empty() {
        out.push(format!("Options: [{}]", options.inline_options.join("] [")));
    }
    if !options.main_options.is_empty() {
        out.push(format!("Menu:    [{}]", options.main_options.join("] [")));
    }
    out.join("\n")
}
