mod config;
mod error;
mod quotes;

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use runtime::{Dispatcher, GeminiBackend, HostConnector, LlmSelector};

use config::Config;
use error::Result;

const CONFIG_FILE: &str = "coxswain.toml";

#[derive(Parser)]
#[command(name = "coxswain")]
#[command(about = "Resolve natural-language queries to tool calls on a spawned host", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive query loop
    Query,
    /// Run the tool host on stdio (spawned per query by the query loop)
    Serve,
    /// List the tools advertised by the configured host
    Tools,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Query) | None => cmd_query().await,
        Some(Commands::Serve) => cmd_serve().await,
        Some(Commands::Tools) => cmd_tools().await,
    }
}

async fn cmd_query() -> Result<()> {
    println!("coxswain v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    println!(
        "Config: {}",
        if std::path::Path::new(CONFIG_FILE).exists() {
            CONFIG_FILE
        } else {
            "default (built-in quote host)"
        }
    );

    let backend = GeminiBackend::builder(config.api_key()?, &config.selector.model).build();
    let connector = HostConnector::new(config.host_config()?);
    let dispatcher = Dispatcher::new(connector, LlmSelector::new(backend));

    println!("Model: {}", config.selector.model);
    println!("Enter a query ('exit' to quit).\n");

    // Query loop: one fresh session per query, one printed line per outcome.
    // A failed query never takes the loop down.
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let report = dispatcher.dispatch(input).await;
        println!("{report}");
    }

    println!("\nGoodbye.");
    Ok(())
}

async fn cmd_serve() -> Result<()> {
    mcp::server::serve(quotes::registry()).await?;
    Ok(())
}

async fn cmd_tools() -> Result<()> {
    let config = load_config()?;
    let client = mcp::Client::spawn(&config.host_config()?).await?;

    let listing = list_tools(&client).await;
    client.close().await;

    for tool in listing? {
        let description = tool.description.unwrap_or_default();
        println!("{}: {description}", tool.name);
    }
    Ok(())
}

async fn list_tools(client: &mcp::Client) -> Result<Vec<mcp::Tool>> {
    client.initialize().await?;
    Ok(client.list_tools().await?)
}

fn load_config() -> Result<Config> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        Ok(Config::load(path)?)
    } else {
        Ok(Config::default_config())
    }
}
