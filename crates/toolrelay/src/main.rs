//! Command-line entry point: chat with a hosted agent, run a pipeline, or list tools.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toolrelay::chat::{ChatEnd, run_chat};
use toolrelay::config::{LayeredConfigOptions, ToolrelayConfig};
use toolrelay::core::{
    AgentService, Conversation, ConversationSettings, HttpAgentService, SequentialPipeline,
};
use toolrelay::{builtin_registry, init_logging};

/// Command-line options.
#[derive(Parser)]
#[command(name = "toolrelay", version, about)]
struct Cli {
    /// Optional path to a toolrelay.json5 layered over the discovered config
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat with one agent
    Chat {
        /// Agent id from the config
        #[arg(long)]
        agent: Option<String>,
        /// Model override for the agent
        #[arg(long)]
        model: Option<String>,
    },
    /// Run a task through agents in sequence
    Pipeline {
        /// Comma-separated agent ids; defaults to `pipeline.agents` from the config
        #[arg(long, value_delimiter = ',')]
        agents: Vec<String>,
        /// Task text
        #[arg(long, conflicts_with = "task_file")]
        task: Option<String>,
        /// File holding the task text
        #[arg(long)]
        task_file: Option<PathBuf>,
    },
    /// List the local tools the config enables
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    info!("starting toolrelay (config_set={})", cli.config.is_some());
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Chat { agent, model } => chat(&config, agent, model).await,
        Command::Pipeline {
            agents,
            task,
            task_file,
        } => pipeline(&config, agents, task, task_file).await,
        Command::Tools => list_tools(&config),
    }
}

fn load_config(runtime: Option<&Path>) -> anyhow::Result<ToolrelayConfig> {
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = runtime {
        info!("adding runtime config layer (path={})", path.display());
        options = options.with_runtime_path(path);
    }
    let layered = ToolrelayConfig::load_layered_with_options(options)
        .context("failed to load layered config")?;
    for layer in &layered.layers {
        debug!(
            "config layer (source={:?}, path={})",
            layer.source,
            layer.path.display()
        );
    }
    Ok(layered.config)
}

fn agent_service(config: &ToolrelayConfig) -> anyhow::Result<Arc<dyn AgentService>> {
    let service =
        HttpAgentService::from_config(&config.service).context("failed to configure service")?;
    Ok(Arc::new(service))
}

async fn chat(
    config: &ToolrelayConfig,
    agent: Option<String>,
    model: Option<String>,
) -> anyhow::Result<()> {
    let agent_id = agent.unwrap_or_else(|| config.default_agent_id().to_string());
    let mut profile = config
        .agent(&agent_id)
        .with_context(|| format!("unknown agent {agent_id}"))?;
    if let Some(model) = model {
        profile = profile.with_model(model);
    }

    let service = agent_service(config)?;
    let tools = builtin_registry(&config.tools)?;
    let mut conversation = Conversation::start(
        service,
        &profile,
        &tools,
        ConversationSettings::from_config(config),
    )
    .await
    .context("failed to start conversation")?;
    println!(
        "Chatting with {} (tools: {}). Type {} to leave.",
        profile.display_name(),
        conversation.tool_names().join(", "),
        config.conversation.exit_commands.join("/")
    );

    let stdin = io::stdin();
    let result = run_chat(
        &mut conversation,
        &config.conversation,
        stdin.lock(),
        io::stdout(),
    )
    .await;
    conversation.close().await;

    match result? {
        ChatEnd::RunFailed(outcome) => bail!("run {} ended as {}", outcome.run_id, outcome.state),
        ChatEnd::TurnFailed(error) => bail!("chat stopped: {error}"),
        ChatEnd::ExitCommand | ChatEnd::EndOfInput => Ok(()),
    }
}

async fn pipeline(
    config: &ToolrelayConfig,
    agents: Vec<String>,
    task: Option<String>,
    task_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let task = match (task, task_file) {
        (Some(task), _) => task,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read task file {}", path.display()))?,
        (None, None) => bail!("either --task or --task-file is required"),
    };
    let agents = if agents.is_empty() {
        config.pipeline.agents.clone()
    } else {
        agents
    };

    let service = agent_service(config)?;
    let tools = builtin_registry(&config.tools)?;
    let pipeline = SequentialPipeline::from_config(service, config, &agents, tools)
        .context("failed to build pipeline")?;

    println!("Task:\n{}\n", task.trim());
    let steps = pipeline
        .run(task.trim(), |step| {
            let banner = "=".repeat(50);
            println!("{banner}\n{}\n{banner}", step.agent_name);
            match step.reply.text() {
                Some(text) => println!("{text}\n"),
                None => println!("(run {} without a reply)\n", step.reply.outcome.state),
            }
        })
        .await
        .context("pipeline failed")?;

    if steps.len() < pipeline.agents().len() {
        bail!(
            "pipeline stopped after {} of {} agents",
            steps.len(),
            pipeline.agents().len()
        );
    }
    Ok(())
}

fn list_tools(config: &ToolrelayConfig) -> anyhow::Result<()> {
    let tools = builtin_registry(&config.tools)?;
    if tools.is_empty() {
        println!("No local tools enabled.");
    }
    for spec in tools.specs() {
        println!("{:<28} {}", spec.name, spec.description);
    }
    for agent in &config.agents {
        let permitted = tools.filtered(&agent.tools).list();
        println!("agent {}: {}", agent.id, permitted.join(", "));
    }
    Ok(())
}
