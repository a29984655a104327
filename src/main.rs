use std::sync::Arc;

use aichef::api::serve_api;
use aichef::config::AppConfig;
use aichef::llm::LlmService;
use aichef::rag::RecipeService;
use aichef::store::ChromaStore;
use aichef::Result;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(name = "aichef")]
#[command(about = "Recipe recommendation service built on retrieval-augmented generation")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind (defaults to the configured server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (defaults to the configured server.port)
        #[arg(long)]
        port: Option<u16>,
        /// Disable permissive CORS
        #[arg(long)]
        no_cors: bool,
    },
    /// Run a structured recipe search and print the response as JSON
    Search {
        /// Free-text ingredient or craving query
        query: String,
    },
    /// Ask a free-text question and print the answer with its sources
    Ask {
        /// Free-text question
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    if cli.verbose {
        aichef::logging::init_logging_with_level("debug")?;
    } else {
        aichef::logging::init_logging_with_config(Some(&config))?;
    }

    match cli.command {
        Commands::Serve {
            host,
            port,
            no_cors,
        } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let enable_cors = config.server.enable_cors && !no_cors;
            serve_api(&config, host, port, enable_cors).await?;
        }
        Commands::Search { query } => {
            let service = build_service(&config)?;
            match service.search(&query).await? {
                Some(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                None => println!("抱歉，暂未收录关于“{query}”的菜谱，请尝试其他关键词。"),
            }
        }
        Commands::Ask { query } => {
            let service = build_service(&config)?;
            let result = service.answer(&query).await?;
            println!("{}\n", result.answer);
            if !result.source_docs.is_empty() {
                println!("来源 ({} 条):", result.source_docs.len());
                for (idx, doc) in result.source_docs.iter().enumerate() {
                    println!("  {}. {} (score: {:.2})", idx + 1, doc.name, doc.score);
                }
            }
        }
    }

    Ok(())
}

fn build_service(config: &AppConfig) -> Result<RecipeService> {
    let store = Arc::new(ChromaStore::new(config));
    let llm = LlmService::from_config(config)?;
    Ok(RecipeService::new(store, llm, config))
}
