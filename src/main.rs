use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::sync::Arc;

use expunge::api::{serve, AppState};
use expunge::engine::{assemble, BatchOptions, Engine, OrchestrationRequest};
use expunge::providers::{AnthropicProvider, LLMProvider};
use expunge::storage::{InMemoryOutcomeStore, OutcomeStore, PostgresOutcomeStore};
use expunge::types::ExecutionContext;
use expunge::Config;

#[derive(Parser)]
#[command(name = "expunge")]
#[command(about = "Capability orchestration engine for personal-data removal", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the orchestration API server
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Invoke a single agent capability
    Invoke {
        agent: String,
        capability: String,
        #[arg(long, help = "JSON input payload")]
        input: Option<String>,
    },
    /// Orchestrate an action or a workflow.* action
    Orchestrate {
        action: String,
        #[arg(long, help = "JSON input payload")]
        input: Option<String>,
        #[arg(long, help = "Run workflow steps concurrently")]
        parallel: bool,
    },
    /// Run one action across a JSON array of items under a deadline
    Batch {
        action: String,
        #[arg(long, help = "JSON array of item payloads")]
        items: String,
        #[arg(long, default_value_t = 60_000)]
        deadline_ms: u64,
    },
    /// Print per-agent health and the workflow catalog
    Status,
    /// Probe agents without executing any capability
    Validate {
        #[arg(long)]
        agent: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    let engine = build_engine(&config).await?;

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            let state = AppState::from_engine(&engine, config);
            serve(state, port).await?;
        }
        Commands::Invoke {
            agent,
            capability,
            input,
        } => {
            let input = parse_input(input)?;
            let ctx = ExecutionContext::manual();
            let result = engine
                .orchestrator
                .invoke(&agent, &capability, &input, &ctx)
                .await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Orchestrate {
            action,
            input,
            parallel,
        } => {
            let input = parse_input(input)?;
            let mut request = OrchestrationRequest::action(&action, input)
                .with_context(ExecutionContext::manual());
            if parallel {
                request = request.with_options(expunge::types::WorkflowOptions {
                    parallel: true,
                    ..Default::default()
                });
            }
            let response = engine.orchestrator.orchestrate(request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Batch {
            action,
            items,
            deadline_ms,
        } => {
            let items: Vec<Value> = serde_json::from_str(&items)?;
            let options = BatchOptions {
                deadline_ms,
                chunk_size: config.batch_chunk_size,
            };
            let report = engine
                .batch
                .run(&action, items, &ExecutionContext::batch(), &options)
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Status => {
            let report = engine.orchestrator.status_report();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Validate { agent } => {
            let statuses = engine.orchestrator.validate(agent.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        }
    }

    Ok(())
}

async fn build_engine(config: &Config) -> Result<Engine> {
    let provider: Option<Arc<dyn LLMProvider>> = config
        .anthropic_api_key
        .clone()
        .map(|key| Arc::new(AnthropicProvider::new(key)) as Arc<dyn LLMProvider>);

    let outcomes: Arc<dyn OutcomeStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresOutcomeStore::new(url).await?;
            store.run_migrations().await?;
            Arc::new(store)
        }
        None => Arc::new(InMemoryOutcomeStore::new()),
    };

    Ok(assemble(config, provider, outcomes)?)
}

fn parse_input(input: Option<String>) -> Result<Value> {
    Ok(match input {
        Some(raw) => serde_json::from_str(&raw)?,
        None => Value::Object(Default::default()),
    })
}
