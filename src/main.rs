//! Forge - build assistants by talking to one
//!
//! Main entry point for the CLI application.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use forge::cli::repl::render_reply;
use forge::{Agent, CallContext, Config, GraphKind, Message, Repl, RunConfig, Services};

/// Forge - tool-routing conversational agent
#[derive(Parser, Debug)]
#[command(name = "forge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Graph to run: builder, template or title
    #[arg(long, short = 'g', default_value = "builder")]
    graph: GraphKind,

    /// Model identifier, e.g. ollama/qwen3:8b
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// User the run is scoped to
    #[arg(long)]
    user: Option<String>,

    /// Assistant the run is scoped to
    #[arg(long)]
    assistant: Option<String>,

    /// Fail a run after this many steps
    #[arg(long)]
    max_steps: Option<usize>,

    /// Extra context appended to the prompt (used with --action)
    #[arg(long, requires = "action")]
    context: Option<String>,

    /// Action paired with --context
    #[arg(long, requires = "context")]
    action: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,
}

fn init_tracing(debug: bool) {
    let default = if debug { "forge=debug" } else { "forge=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref user) = args.user {
        config.agent.user_id = user.clone();
    }

    if let Some(ref assistant) = args.assistant {
        config.agent.assistant_id = assistant.clone();
    }

    if args.max_steps.is_some() {
        config.agent.max_steps = args.max_steps;
    }

    if args.debug {
        config.agent.debug = true;
    }

    init_tracing(config.agent.debug);

    let mut run_config = RunConfig::from_config(&config);
    if let (Some(context), Some(action)) = (&args.context, &args.action) {
        run_config = run_config.with_context(CallContext::new(context, action));
    }

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        run_config.model = match (&args.model, args.graph) {
            (Some(model), _) => model.clone(),
            (None, GraphKind::Title) => config.models.title.clone(),
            (None, _) => config.models.default.clone(),
        };

        let services = Services::from_config(&config)?;
        let agent = Agent::new(args.graph, &services)?;
        let conversation = agent.run(vec![Message::user(&prompt)], run_config).await?;
        println!("{}", render_reply(conversation.get(1..).unwrap_or_default()));
        return Ok(());
    }

    // Interactive REPL mode
    let mut repl = Repl::new(config, args.graph, run_config, args.model)?;
    repl.run().await?;

    Ok(())
}
