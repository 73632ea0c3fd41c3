use clap::Parser;
use clap::Subcommand;
use grainwise::api::serve_api;
use grainwise::config::AppConfig;
use grainwise::models::ChatMessage;
use grainwise::rag::Orchestrator;
use grainwise::Result;
use tracing::info;

#[derive(Parser)]
#[command(name = "grainwise")]
#[command(about = "Retrieval-augmented woodworking assistant")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind
        #[arg(long, default_value = "8080")]
        port: u16,
        /// Enable permissive CORS
        #[arg(long)]
        cors: bool,
    },
    /// Ask a single question from the command line
    Ask {
        /// The question to answer
        question: String,
    },
    /// Validate the configuration file and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    grainwise::logging::init_logging(Some(&config))?;

    match cli.command {
        Commands::Serve { host, port, cors } => {
            serve_api(&config, host, port, cors).await?;
        }
        Commands::Ask { question } => {
            let orchestrator = Orchestrator::new(&config).await?;
            let messages = vec![ChatMessage::user(question)];
            let outcome = orchestrator.execute(&messages).await?;
            println!("{}", outcome.result.text);
            info!(
                "response_type={} documents={} run_id={}",
                outcome.result.metadata.response_type,
                outcome.result.metadata.context_document_count,
                outcome.run_id
            );
        }
        Commands::CheckConfig => {
            println!("Configuration loaded successfully");
            println!("  llm endpoint:        {}", config.llm.endpoint);
            println!("  llm model:           {}", config.llm.model);
            println!("  embeddings model:    {}", config.embeddings.model);
            println!("  embedding dimension: {}", config.embeddings.dimension);
            println!("  corpus:              {}", config.retrieval.corpus);
            println!("  top_k:               {}", config.retrieval.top_k);
            println!(
                "  tracing:             {}",
                if config.tracing.is_configured() {
                    "configured"
                } else {
                    "disabled (no-op)"
                }
            );
            println!(
                "  enrichment:          {}",
                if config.enrichment.enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        }
    }

    Ok(())
}
