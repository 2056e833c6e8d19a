use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use graph_workbench::service::graph_service::GremlinQueryRequest;
use graph_workbench::traversal::client::Account;
use graph_workbench::{GraphComputeService, Server, ServiceConfig, SettingsStore};
use graph_workbench::traversal::HttpTraversalConnector;
use graph_workbench::compute::engine::engine_client;

/// Graph Workbench - traversal queries and graph algorithms against a remote compute engine
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Listen address, overrides the configuration
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
    /// Run one traversal query and print the assembled result
    Query {
        /// Traversal server endpoint
        #[arg(short, long, default_value = "ws://127.0.0.1:8182/gremlin")]
        server: String,
        /// Account user name
        #[arg(short, long)]
        username: Option<String>,
        /// Account password
        #[arg(short, long)]
        password: Option<String>,
        /// Query text
        query: String,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ServiceConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { listen } => {
            let mut server = Server::from_config(&config)?;
            if let Some(addr) = listen {
                server = server.with_listen(addr);
            }
            server.start().await?;
        }
        Commands::Query {
            server,
            username,
            password,
            query,
        } => {
            // one-off queries never touch the persisted engine settings
            let service = GraphComputeService::new(
                Arc::new(HttpTraversalConnector::new(config.connect_timeout(), config.request_timeout())?),
                Arc::new(SettingsStore::in_memory(None)),
                engine_client(config.connect_timeout(), config.request_timeout())?,
                config.neighbor_limit,
            );
            let account = (username.is_some() || password.is_some()).then(|| Account { username, password });
            let envelope = service
                .query_by_gremlin(GremlinQueryRequest {
                    value: query,
                    gremlin_server: server,
                    graph_scope_account: account,
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            if !envelope.success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
