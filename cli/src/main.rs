//! Thin command-line driver over the dashboard engine: authenticate,
//! pull a KPI summary or hierarchy rollup, or stream an assistant answer.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use clap::Parser;
use clap::Subcommand;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use finsight_assistant::CompletionClient;
use finsight_assistant::CompletionItem;
use finsight_assistant::StreamEnd;
use finsight_backend_client::ApiClient;
use finsight_backend_client::AuthSession;
use finsight_backend_client::FileTokenStore;
use finsight_backend_client::PnlQuery;
use finsight_core::EngineConfig;
use finsight_protocol::FilterState;
use finsight_protocol::HierarchyMode;

#[derive(Parser)]
#[command(name = "finsight", about = "FinSight P&L dashboard engine")]
struct Cli {
    /// Path to the config file (defaults to ~/.finsight/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authenticate against the reporting backend.
    Login {
        email: String,
    },
    /// Print the KPI summary for an unfiltered query.
    Summary,
    /// Print the rollup at the given level (cluster, account, project,
    /// resource).
    Hierarchy {
        mode: String,
    },
    /// Stream an assistant answer for a free-text question.
    Ask {
        question: String,
    },
}

fn auth_session(config: &EngineConfig) -> Result<Arc<AuthSession>> {
    let auth_path = EngineConfig::default_auth_path()
        .ok_or_else(|| anyhow!("could not determine a home directory for token storage"))?;
    let store = FileTokenStore::new(auth_path);
    let session = AuthSession::new(
        config.api_base_url.clone(),
        reqwest::Client::new(),
        Box::new(store),
    )
    .context("failed to initialize the auth session")?;
    Ok(Arc::new(session))
}

fn api_client(config: &EngineConfig) -> Result<ApiClient> {
    let auth = auth_session(config)?;
    ApiClient::new(config.api_base_url.clone(), auth)
        .context("failed to build the backend client")
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    Ok(password.trim_end().to_string())
}

async fn run(cli: Cli) -> Result<()> {
    let config = EngineConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Login { email } => {
            let auth = auth_session(&config)?;
            let password = read_password()?;
            let user = auth
                .login(&email, &password)
                .await
                .context("login failed")?;
            println!("Logged in as {} ({})", user.name, user.role.label());
        }
        Command::Summary => {
            let client = api_client(&config)?;
            let query = PnlQuery::from_filters(&FilterState::default());
            let summary = client.kpi_summary(&query).await?;
            println!("Revenue:        {:>14.2}", summary.revenue);
            println!("Cost:           {:>14.2}", summary.cost);
            println!("Gross profit:   {:>14.2}", summary.gross_profit);
            println!("Margin:         {:>13.1}%", summary.margin);
            println!("Headcount:      {:>14.1}", summary.headcount);
            println!("Utilization:    {:>13.1}%", summary.display_utilization());
        }
        Command::Hierarchy { mode } => {
            let mode: HierarchyMode = mode
                .parse()
                .map_err(|_| anyhow!("unknown hierarchy level: {mode}"))?;
            let client = api_client(&config)?;
            let query = PnlQuery::from_filters(&FilterState::default());
            let rows = client.hierarchy_rows(mode, &query).await?;
            for row in &rows {
                let metrics = row.metrics();
                println!(
                    "{:<30} revenue {:>12.2}  margin {:>6.1}%",
                    row.display_name(),
                    metrics.revenue,
                    metrics.margin
                );
            }
            println!("{} rows at the {mode} level", rows.len());
        }
        Command::Ask { question } => {
            let client = CompletionClient::new(
                config.assistant.url.clone(),
                config.assistant.model.clone(),
            )?;
            let mut stream = client.stream(&question, CancellationToken::new());
            let mut stdout = std::io::stdout();
            while let Some(item) = stream.next().await {
                match item {
                    CompletionItem::Fragment(fragment) => {
                        stdout.write_all(fragment.as_bytes())?;
                        stdout.flush()?;
                    }
                    CompletionItem::End(StreamEnd::Completed) => break,
                    CompletionItem::End(StreamEnd::Cancelled) => break,
                    CompletionItem::End(StreamEnd::Failed(err)) => {
                        return Err(anyhow!("assistant request failed: {err}"));
                    }
                }
            }
            println!();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    run(Cli::parse()).await
}
