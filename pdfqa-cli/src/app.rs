//! Subcommand implementations.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use pdfqa_rag::loader::load_pdf;
use pdfqa_rag::{PipelineState, RagSearch, Settings};
use tracing::info;

use crate::cli::Commands;
use crate::{render, setup, shell};

/// Questions run by `pdfqa selftest`. The last one is outside any document
/// and should be refused.
pub const SELFTEST_QUESTIONS: [&str; 3] = [
    "Qual o faturamento da empresa?",
    "Quantos funcionários trabalham na empresa?",
    "Qual é a capital da França?",
];

/// Run one subcommand.
pub async fn run(command: Commands) -> Result<ExitCode> {
    let settings = Settings::from_env().context("failed to load settings")?;
    info!(?settings, "settings loaded");

    match command {
        Commands::Ingest { pdf, append } => ingest(&settings, pdf, append).await,
        Commands::Chat => chat(&settings).await,
        Commands::Search { query, k } => search(&settings, &query, k).await,
        Commands::Selftest => selftest(&settings).await,
    }
}

async fn ingest(settings: &Settings, pdf: Option<PathBuf>, append: bool) -> Result<ExitCode> {
    let path = pdf.unwrap_or_else(|| PathBuf::from(&settings.pdf_path));
    let started = Instant::now();

    let document =
        load_pdf(&path).with_context(|| format!("failed to load PDF {}", path.display()))?;
    let pipeline = setup::ingestion_pipeline(settings, append).await?;
    let report = pipeline.ingest(&document).await;
    pipeline.close().await;
    let report = report.context("ingestion failed")?;

    println!(
        "Ingested {} chunks from {} into '{}' in {:.2}s",
        report.chunk_count,
        path.display(),
        pipeline.collection(),
        started.elapsed().as_secs_f64(),
    );
    if report.fallback_count > 0 {
        println!(
            "Warning: {} chunks could not be embedded and were stored with zero vectors",
            report.fallback_count
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Build and initialise the answer pipeline, printing remediation hints
/// and returning `None` if it is not usable.
async fn ready_search(settings: &Settings, require_chunks: bool) -> Result<Option<RagSearch>> {
    let search = setup::search_pipeline(settings)?;

    if let PipelineState::Failed(reason) = search.initialize().await {
        eprintln!("{}", render::startup_failure(&reason));
        return Ok(None);
    }

    if require_chunks && !search.system_status().await.is_ready {
        eprintln!("{}", render::startup_failure("the document collection is empty or unreachable"));
        search.shutdown().await;
        return Ok(None);
    }

    Ok(Some(search))
}

async fn chat(settings: &Settings) -> Result<ExitCode> {
    println!("Initializing RAG system...");
    let Some(search) = ready_search(settings, true).await? else {
        return Ok(ExitCode::FAILURE);
    };
    println!("RAG system initialized successfully!\n");

    shell::run(&search).await?;
    println!("RAG Chat closed. See you later!");
    Ok(ExitCode::SUCCESS)
}

async fn search(settings: &Settings, query: &str, k: usize) -> Result<ExitCode> {
    let Some(search) = ready_search(settings, false).await? else {
        return Ok(ExitCode::FAILURE);
    };

    let results = search.search_documents(query, k).await;
    print!("{}", render::search_results(query, &results));
    search.shutdown().await;
    Ok(ExitCode::SUCCESS)
}

async fn selftest(settings: &Settings) -> Result<ExitCode> {
    let Some(search) = ready_search(settings, false).await? else {
        return Ok(ExitCode::FAILURE);
    };

    for question in SELFTEST_QUESTIONS {
        let started = Instant::now();
        let answer = search.generate_answer(question).await;
        println!("{}", render::answer_block(question, &answer, started.elapsed()));
    }

    let status = search.system_status().await;
    println!("{}", render::status_report(&status));
    search.shutdown().await;
    Ok(ExitCode::SUCCESS)
}
