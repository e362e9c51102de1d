//! Guardian CLI - Main entry point

use clap::{Args, Parser, Subcommand};
use guardian_core::ReviewDecision;
use guardian_rpc::{commands, AppContext, GuardianConfig};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "guardian")]
#[command(about = "Guardian - Transaction compliance for autonomous agents", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage agents
    Agent {
        #[command(subcommand)]
        command: AgentCommands,
    },

    /// Create a transaction and evaluate it
    Ingest {
        /// Agent ID
        agent: String,
        /// Amount to transfer
        amount: Decimal,
        /// Destination address
        to: String,
        /// Currency code
        #[arg(long, default_value = "USDC")]
        currency: String,
        /// Provider transfer ID, used to detect redelivery
        #[arg(long)]
        external_id: Option<String>,
    },

    /// Re-evaluate a stored transaction
    Evaluate {
        /// Transaction ID
        transaction: String,
    },

    /// Process a payment provider notification stored in a file
    Webhook {
        /// Path to the notification body
        file: PathBuf,
    },

    /// Resolve an alert with a human decision
    Resolve(ResolveArgs),

    /// Suspend an agent's wallet
    Freeze {
        /// Agent ID
        agent: String,
        /// Why the wallet is frozen
        #[arg(long)]
        reason: String,
        /// Provider wallet ID, defaults to the agent's
        #[arg(long)]
        wallet: Option<String>,
    },

    /// Behavioural scan over an agent's recent transactions
    Scan {
        /// Agent ID
        agent: String,
    },

    /// List transactions, newest first
    Transactions {
        /// Filter by agent ID
        #[arg(long)]
        agent: Option<String>,
        /// Filter by status (PENDING, APPROVED, QUARANTINE, BLOCKED, COMPLETED)
        #[arg(long)]
        status: Option<String>,
        /// Maximum number of rows
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// List alerts
    Alerts {
        /// Filter by status (PENDING, INVESTIGATING, RESOLVED, DISMISSED)
        #[arg(long)]
        status: Option<String>,
    },

    /// Inspect the audit trail
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },

    /// Retry ledger writes for unanchored audit entries
    Reanchor {
        /// Maximum entries to retry
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Dashboard statistics
    Stats,
}

#[derive(Subcommand)]
enum AgentCommands {
    /// Register an agent
    Add {
        /// Agent name
        name: String,
        /// On-chain wallet address
        wallet_address: String,
        /// Organization ID
        #[arg(long, default_value = "default")]
        org: String,
        /// Provider wallet ID for webhook matching
        #[arg(long)]
        wallet_id: Option<String>,
    },

    /// List agents
    List,
}

#[derive(Subcommand)]
enum AuditCommands {
    /// Show audit entries in chronological order
    Log {
        /// Filter by entity ID
        #[arg(long)]
        entity: Option<String>,
        /// Filter by action (e.g. TRANSACTION_EVALUATED)
        #[arg(long)]
        action: Option<String>,
        /// Maximum number of entries
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Verify the ledger hash chain
    Verify,
}

#[derive(Args)]
struct ResolveArgs {
    /// Alert ID
    alert: String,
    /// Approve the transaction
    #[arg(long, conflicts_with = "block", required_unless_present = "block")]
    approve: bool,
    /// Block the transaction and quarantine the agent
    #[arg(long)]
    block: bool,
    /// Reviewer's reason (required)
    #[arg(long)]
    reason: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = GuardianConfig::load(cli.config.as_deref())?;
    let ctx = AppContext::new(&cli.data, config).await?;

    match cli.command {
        Commands::Agent { command } => match command {
            AgentCommands::Add {
                name,
                wallet_address,
                org,
                wallet_id,
            } => {
                commands::agent_add(&ctx, &org, &name, &wallet_address, wallet_id.as_deref())?;
            }
            AgentCommands::List => commands::agent_list(&ctx)?,
        },

        Commands::Ingest {
            agent,
            amount,
            to,
            currency,
            external_id,
        } => {
            commands::ingest(&ctx, &agent, amount, &currency, &to, external_id).await?;
        }

        Commands::Evaluate { transaction } => {
            commands::evaluate(&ctx, &transaction).await?;
        }

        Commands::Webhook { file } => {
            commands::webhook(&ctx, &file).await?;
        }

        Commands::Resolve(args) => {
            let decision = if args.block {
                ReviewDecision::Block
            } else {
                ReviewDecision::Approve
            };
            commands::resolve(&ctx, &args.alert, decision, &args.reason).await?;
        }

        Commands::Freeze {
            agent,
            reason,
            wallet,
        } => {
            commands::freeze(&ctx, &agent, &reason, wallet.as_deref()).await?;
        }

        Commands::Scan { agent } => {
            commands::scan(&ctx, &agent).await?;
        }

        Commands::Transactions {
            agent,
            status,
            limit,
        } => {
            commands::transactions(&ctx, agent, status.as_deref(), limit)?;
        }

        Commands::Alerts { status } => {
            commands::alerts(&ctx, status.as_deref())?;
        }

        Commands::Audit { command } => match command {
            AuditCommands::Log {
                entity,
                action,
                limit,
            } => {
                commands::audit_log(&ctx, entity, action.as_deref(), limit)?;
            }
            AuditCommands::Verify => {
                if !commands::audit_verify(&ctx)? {
                    std::process::exit(1);
                }
            }
        },

        Commands::Reanchor { limit } => {
            commands::reanchor(&ctx, limit).await?;
        }

        Commands::Stats => commands::stats(&ctx)?,
    }

    Ok(())
}
