use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use walkdir::WalkDir;

use finrag_cli::{infer_data_type, init_tracing, load_settings, read_items};
use finrag_core::DataType;
use finrag_retrieval::RetrievalCoordinator;

/// Index financial JSON data into per-type namespaces.
#[derive(Parser, Debug)]
#[command(name = "finrag-indexer", version)]
struct Args {
    /// Directory of `*.json` files; subdirectory names select the data type.
    data_dir: PathBuf,

    /// Treat every file as this data type (news, earnings, stock_data, sentiment, ...).
    #[arg(long = "type", value_name = "TYPE")]
    data_type: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = load_settings()?;
    let coordinator = RetrievalCoordinator::from_settings(&settings).await?;

    println!("Financial Data Indexer\n======================");
    println!("Data directory: {}", args.data_dir.display());
    println!("Vector store:   {}", settings.store_root().display());

    let files: Vec<PathBuf> = WalkDir::new(&args.data_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == "json"))
        .map(|e| e.into_path())
        .collect();
    if files.is_empty() {
        println!("No JSON files found");
        return Ok(());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let mut by_type: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    let mut unreadable = 0usize;
    for file in &files {
        pb.set_message(file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
        let data_type = args.data_type.clone().or_else(|| infer_data_type(&args.data_dir, file));
        match (data_type, read_items(file)) {
            (Some(dt), Ok(items)) => by_type.entry(dt).or_default().extend(items),
            (None, _) => {
                tracing::warn!(file = %file.display(), "cannot infer data type, skipped");
                unreadable += 1;
            }
            (_, Err(e)) => {
                tracing::warn!(error = %e, "file skipped");
                unreadable += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("read");

    let mut failed = Vec::new();
    for (data_type, items) in by_type {
        let report = coordinator.index_financial_data_report(items, &DataType::from(data_type.as_str())).await;
        println!(
            "📊 {:<12} {} items, {} chunks, {} skipped",
            report.namespace,
            report.records_received,
            report.chunks_indexed,
            report.records_skipped.len()
        );
        for (pos, reason) in &report.records_skipped {
            println!("   item {pos}: {reason}");
        }
        if let Some(e) = report.error {
            println!("   ❌ {e}");
            failed.push(report.namespace);
        }
    }
    if unreadable > 0 {
        println!("⚠️  {unreadable} file(s) could not be read");
    }
    if !failed.is_empty() {
        anyhow::bail!("indexing failed for: {}", failed.join(", "));
    }
    println!("\n✅ Indexing completed successfully!");
    println!("💡 To search, use: cargo run --bin finrag -- search '<query>'");
    Ok(())
}
