use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use strand_rs::adk::agent::{AgentExecutor, AgentOutcome};
use strand_rs::adk::callbacks::{
    CallbackManager, LogCallbackHandler, TraceCallbackHandler, TraceLog,
};
use strand_rs::adk::model::ReplayModel;
use strand_rs::strand::workflow::loader::SettingsLoader;
use strand_rs::strand::workflow::types::AgentSettings;

use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one agent exchange against recorded model replies
    Replay {
        /// Path to the agent settings YAML file
        #[arg(short, long)]
        settings: Option<String>,

        /// Path to a JSON array of model replies
        #[arg(short, long)]
        replies: String,

        /// The query to send
        #[arg(short, long)]
        query: String,

        /// Print the indented invocation trace
        #[arg(long)]
        trace: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Replay {
            settings,
            replies,
            query,
            trace,
        } => {
            let settings = match settings {
                Some(path) => SettingsLoader::new()
                    .load_settings(&path)
                    .with_context(|| format!("loading settings from {}", path))?,
                None => AgentSettings::default(),
            };
            let model = ReplayModel::from_file(&replies)
                .with_context(|| format!("loading replies from {}", replies))?;

            log::info!("Replaying agent {} with replies from {}", settings.name, replies);

            let trace_log = TraceLog::new();
            let mut callbacks = CallbackManager::default().with_handler(Arc::new(LogCallbackHandler));
            if trace {
                callbacks =
                    callbacks.with_handler(Arc::new(TraceCallbackHandler::new(trace_log.clone())));
            }

            let agent = AgentExecutor::new(Arc::new(model))
                .with_settings(&settings)
                .with_callbacks(callbacks);

            println!("Sending query: {}", query);
            let turn = agent.run(&query, Vec::new()).await;

            if trace {
                for line in trace_log.logs() {
                    println!("{}", line);
                }
            }

            match turn.outcome {
                AgentOutcome::Answer(content) => match content {
                    serde_json::Value::String(text) => println!("Response: {}", text),
                    other => println!("Response: {}", serde_json::to_string_pretty(&other)?),
                },
                AgentOutcome::Failed(message) => anyhow::bail!("agent failed: {}", message),
            }
        }
    }

    Ok(())
}
