//! Concierge CLI.
//!
//! `serve` (the default) runs the web gateway; `chat` opens the terminal
//! client against a running gateway; `ask` answers one message in-process.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use concierge::agent::ChatAgent;
use concierge::channels::web::{GatewayState, start_server};
use concierge::client::{DEFAULT_GATEWAY_URL, run_repl};
use concierge::config::Config;
use concierge::db::{self, Database};
use concierge::llm::GeminiProvider;
use concierge::seed::seed_demo_data;
use concierge::tools::ToolRegistry;

const DEFAULT_LOG_FILTER: &str = "concierge=info,tower_http=info";

#[derive(Parser)]
#[command(name = "concierge")]
#[command(
    version,
    about = "Corporate chat assistant backed by the company database"
)]
struct Cli {
    /// Settings file (TOML). Defaults to ./concierge.toml when present.
    #[arg(long, global = true, env = "CONCIERGE_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines (also enabled by LOG_FORMAT=json).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web gateway (chat API and browser UI).
    Serve,

    /// Chat with a running gateway from the terminal.
    Chat {
        /// Gateway base URL.
        #[arg(long, env = "CONCIERGE_URL", default_value = DEFAULT_GATEWAY_URL)]
        url: String,
    },

    /// Answer one message and print the streamed reply.
    Ask {
        /// The message; several words are joined with spaces.
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Print the tool catalog offered to the model.
    Tools {
        /// Print the JSON declarations instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Insert demo data into an empty database.
    Seed,
}

fn init_tracing(log_json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = log_json
        || std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Database>> {
    let store = db::connect_from_config(&config.database)
        .await
        .context("opening database")?;
    tracing::info!(path = %config.database.libsql_path.display(), "Database ready");
    Ok(store)
}

fn build_agent(config: &Config, store: Arc<dyn Database>) -> anyhow::Result<Arc<ChatAgent>> {
    let llm = GeminiProvider::from_config(&config.llm)?;
    let tools = Arc::new(ToolRegistry::with_builtins(store));
    tracing::info!(
        model = %config.llm.model,
        tools = tools.len(),
        max_steps = config.agent.max_steps,
        "Agent configured"
    );
    Ok(Arc::new(ChatAgent::new(Arc::new(llm), tools, &config.agent)))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = config.gateway.socket_addr()?;
    let store = open_store(&config).await?;
    let agent = build_agent(&config, store)?;

    let state = Arc::new(GatewayState::new(agent));
    let bound = start_server(addr, Arc::clone(&state)).await?;
    println!("Concierge listening on http://{bound}");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    state.shutdown().await;
    Ok(())
}

async fn ask(config: Config, message: String) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let agent = build_agent(&config, store)?;

    let mut chunks = agent.spawn_stream(message);
    let mut stdout = std::io::stdout();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        stdout.write_all(chunk.as_bytes())?;
        stdout.flush()?;
    }
    writeln!(stdout)?;
    Ok(())
}

async fn list_tools(config: Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let registry = ToolRegistry::with_builtins(store);
    let definitions = registry.definitions();

    if json {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }
    for definition in definitions {
        println!("{}", definition.name.as_str().bold());
        println!("    {}", definition.description);
    }
    Ok(())
}

async fn seed(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let report = seed_demo_data(store.as_ref()).await?;
    if report.skipped {
        println!("Database already contains data; nothing inserted.");
    } else {
        println!(
            "Inserted {} users, {} clients, {} products, {} orders, {} claims.",
            report.users, report.clients, report.products, report.orders, report.claims
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG may come from .env.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let settings_path = cli.config;
    let load = || Config::load(settings_path.as_deref());
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(load()?).await,
        Command::Chat { url } => run_repl(&url).await,
        Command::Ask { message } => ask(load()?, message.join(" ")).await,
        Command::Tools { json } => list_tools(load()?, json).await,
        Command::Seed => seed(load()?).await,
    }
}
