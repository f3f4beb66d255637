use clap::{Parser, Subcommand};

use finrag_cli::{init_tracing, load_settings, print_hits};
use finrag_retrieval::RetrievalCoordinator;

#[derive(Parser, Debug)]
#[command(name = "finrag", version, about = "Query the financial retrieval index")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search one namespace.
    Search {
        query: String,
        #[arg(long, default_value = finrag_core::types::DEFAULT_NAMESPACE)]
        namespace: String,
        /// Defaults to `retrieval.default_k`.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Search several namespaces and merge by confidence.
    Ask {
        query: String,
        /// Defaults to `retrieval.namespaces`.
        #[arg(long, value_delimiter = ',')]
        namespaces: Vec<String>,
        #[arg(long)]
        threshold: Option<f32>,
        #[arg(long)]
        per_namespace: Option<usize>,
    },
    /// Chunk counts per namespace.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings()?;
    let coordinator = RetrievalCoordinator::from_settings(&settings).await?;

    match cli.command {
        Command::Search { query, namespace, limit } => {
            let k = limit.unwrap_or(settings.retrieval.default_k);
            let hits = coordinator.query(&query, &namespace, k).await?;
            if hits.is_empty() {
                println!("No results in '{namespace}'");
            }
            print_hits(&hits);
        }
        Command::Ask { query, namespaces, threshold, per_namespace } => {
            let namespaces = if namespaces.is_empty() { settings.retrieval.namespaces.clone() } else { namespaces };
            let threshold = threshold.unwrap_or(settings.retrieval.confidence_threshold);
            let k = per_namespace.unwrap_or(settings.retrieval.per_namespace_k);
            let out = coordinator.query_many(&query, &namespaces, k, threshold).await;
            println!("Average confidence: {:.1} (threshold {threshold:.1})", out.avg_confidence);
            if out.below_threshold {
                println!("⚠️  Below threshold: answer with caution");
            }
            print_hits(&out.results);
        }
        Command::Status => {
            let index = coordinator.vector_index();
            let names = index.namespaces().await?;
            println!("Vector store: {}", settings.store_root().display());
            if names.is_empty() {
                println!("(empty)");
            }
            for ns in names {
                println!("{ns:<16} {} chunks", index.count(&ns).await?);
            }
        }
    }
    Ok(())
}
