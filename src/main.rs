use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use kinetic_orchestrator::adk::agent::HttpAgentRunner;
use kinetic_orchestrator::kinetic::audit::{AuditBackend, HttpAuditBackend, NoopAuditBackend};
use kinetic_orchestrator::kinetic::config::EngineConfig;
use kinetic_orchestrator::kinetic::directory::AgentRegistry;
use kinetic_orchestrator::kinetic::workflow::graph::execution_waves;
use kinetic_orchestrator::kinetic::workflow::{
    DagValidator, WorkflowDefinition, WorkflowExecutor, WorkflowLoader,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "kinetic", author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a workflow and check that its agents exist
    Validate {
        /// Path to the workflow file
        #[arg(short, long)]
        file: PathBuf,

        /// Directory of agent definitions (defaults to KINETIC_AGENTS_DIR)
        #[arg(short, long)]
        agents: Option<PathBuf>,
    },
    /// Print the execution waves of a workflow
    Plan {
        /// Path to the workflow file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Run a workflow from a file
    Run {
        /// Path to the workflow file
        #[arg(short, long)]
        file: PathBuf,

        /// Input to the workflow
        #[arg(short, long)]
        input: String,

        /// Directory of agent definitions (defaults to KINETIC_AGENTS_DIR)
        #[arg(short, long)]
        agents: Option<PathBuf>,
    },
}

fn load_workflow(file: &Path) -> anyhow::Result<WorkflowDefinition> {
    WorkflowLoader::new()
        .load_workflow(file)
        .with_context(|| format!("failed to load workflow {}", file.display()))
}

async fn load_agents(config: &EngineConfig, agents: Option<PathBuf>) -> anyhow::Result<AgentRegistry> {
    let dir = agents.unwrap_or_else(|| config.agents_dir.clone());
    let registry = AgentRegistry::new();
    let count = registry
        .load_dir(&dir)
        .await
        .with_context(|| format!("failed to load agents from {}", dir.display()))?;
    log::info!("Registered {} agents from {}", count, dir.display());
    Ok(registry)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = EngineConfig::from_env()?;

    match args.command {
        Commands::Validate { file, agents } => {
            let def = load_workflow(&file)?;
            let order = DagValidator::validate(&def)?;

            let registry = load_agents(&config, agents).await?;
            DagValidator::validate_agents_exist(&def, &registry).await?;

            println!("Workflow '{}' is valid", def.workflow_id);
            println!("Order: {}", order.join(" -> "));
        }
        Commands::Plan { file } => {
            let def = load_workflow(&file)?;
            DagValidator::validate(&def)?;

            println!("Plan for workflow: {}", def.name);
            for (i, wave) in execution_waves(&def).iter().enumerate() {
                println!("  wave {}: {}", i + 1, wave.join(", "));
            }
        }
        Commands::Run {
            file,
            input,
            agents,
        } => {
            let Some(runner_url) = config.runner_url.clone() else {
                bail!("KINETIC_RUNNER_URL must be set to run workflows");
            };

            let def = load_workflow(&file)?;
            let registry = load_agents(&config, agents).await?;

            let audit: Arc<dyn AuditBackend> = match &config.audit_url {
                Some(url) => Arc::new(HttpAuditBackend::new(url.clone(), config.audit_timeout)?),
                None => {
                    log::info!("KINETIC_AUDIT_URL not set, audit logging disabled");
                    Arc::new(NoopAuditBackend)
                }
            };

            let executor = WorkflowExecutor::new(
                Arc::new(registry),
                Arc::new(HttpAgentRunner::new(runner_url)),
            )
            .with_audit(audit);

            println!("Running workflow: {}", def.name);
            let ctx = executor.execute(&def, Some(input)).await?;

            println!("Execution: {}", ctx.execution_id);
            for (node_id, result) in ctx.terminal_results(&def) {
                println!("[{}] {}", node_id, result.answer);
            }
        }
    }

    Ok(())
}
