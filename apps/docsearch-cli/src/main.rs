use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use walkdir::WalkDir;

use docsearch_core::config::{Config, Settings};
use docsearch_hybrid::{build_ingestor, build_retriever, store_applies_idf, HybridRetriever};
use docsearch_sections::loader::is_supported;
use docsearch_vector::open_store;

const USAGE: &str = "Usage: docsearch <ingest <path>|query \"<query>\" [--top-k N]|delete <document>>";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("docsearch=info".parse()?))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Cancel `token` on Ctrl-C so in-flight requests abort.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, cancelling...");
            token.cancel();
        }
    });
}

fn collect_documents(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_supported(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

async fn retriever(settings: &Settings) -> anyhow::Result<Arc<HybridRetriever>> {
    let store = open_store(&settings.store, store_applies_idf(settings)).await?;
    let retriever = build_retriever(settings, store)?;
    retriever.prepare().await?;
    Ok(Arc::new(retriever))
}

async fn ingest(settings: &Settings, args: &[String], cancel: &CancellationToken) -> anyhow::Result<()> {
    let Some(root) = args.first().map(PathBuf::from) else {
        eprintln!("Usage: docsearch ingest <file-or-directory>");
        std::process::exit(1);
    };
    let files = collect_documents(&root);
    println!("Ingesting {} documents from {}", files.len(), root.display());
    let ingestor = build_ingestor(settings, retriever(settings).await?)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}")?
            .progress_chars("#>-"),
    );
    let (mut chunks, mut failed) = (0usize, 0usize);
    for file in &files {
        pb.set_message(file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
        match ingestor.ingest_file(file, cancel).await {
            Ok(report) => chunks += report.chunks,
            Err(docsearch_core::Error::Cancelled) => {
                pb.abandon_with_message("cancelled");
                anyhow::bail!("ingestion cancelled");
            }
            Err(e) => {
                failed += 1;
                pb.suspend(|| warn!(file = %file.display(), error = %e, "skipped document"));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");
    println!("Indexed {chunks} chunks ({failed} documents skipped)");
    Ok(())
}

async fn query(settings: &Settings, args: &[String], cancel: &CancellationToken) -> anyhow::Result<()> {
    let mut top_k = settings.retrieval.top_k;
    let mut text = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--top-k" | "-k" => {
                match args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                    Some(k) => top_k = k,
                    None => {
                        eprintln!("Error: --top-k requires a number");
                        std::process::exit(1);
                    }
                }
                i += 1;
            }
            other => text = Some(other.to_string()),
        }
        i += 1;
    }
    let Some(text) = text else {
        eprintln!("Usage: docsearch query \"<query>\" [--top-k N]");
        std::process::exit(1);
    };

    let retriever = retriever(settings).await?;
    let results = retriever.retrieve(&text, top_k, cancel).await?;
    println!("Found {} results for: \"{}\"", results.len(), text);
    for r in &results {
        let pages = if r.chunk.start_page == r.chunk.end_page {
            format!("p. {}", r.chunk.start_page)
        } else {
            format!("pp. {}-{}", r.chunk.start_page, r.chunk.end_page)
        };
        println!(
            "\n  {}. score={:.2} (was #{})  {}  {}  [{}]",
            r.new_rank, r.relevance_score, r.original_rank, r.chunk.source_document, pages, r.chunk.section_path
        );
        println!("     {}", r.chunk.text.replace('\n', " "));
    }
    Ok(())
}

async fn delete(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let Some(name) = args.first() else {
        eprintln!("Usage: docsearch delete <document>");
        std::process::exit(1);
    };
    retriever(settings).await?.delete_document(name).await?;
    println!("Deleted chunks of {name}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;
    info!(
        collection = %settings.store.collection,
        sectioner = ?settings.sectioner.strategy,
        reranker = ?settings.reranker.kind,
        "loaded configuration"
    );
    let (cmd, args) = parse_args();
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    match cmd.as_str() {
        "ingest" => ingest(&settings, &args, &cancel).await,
        "query" => query(&settings, &args, &cancel).await,
        "delete" => delete(&settings, &args).await,
        _ => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
    }
}
