//! Text shown by the shell and the one-shot subcommands.

use std::fmt::Write;
use std::time::Duration;

use pdfqa_rag::{ChunkCount, SearchResult, SystemStatus};

const WIDE: usize = 80;
const NARROW: usize = 40;
const BANNER_WIDTH: usize = 60;

fn rule(width: usize) -> String {
    "=".repeat(width)
}

/// Startup banner with the special commands.
pub fn banner() -> String {
    let rule = rule(BANNER_WIDTH);
    format!(
        "{rule}\n\
         RAG CHAT - PDF Question and Answer System\n\
         Powered by Google Gemini + pgvector\n\
         {rule}\n\
         Special commands:\n   \
         • 'exit', 'quit', 'sair', 'q' - Closes the program\n   \
         • 'help' - Shows available commands\n   \
         • 'clear' - Clears the screen\n   \
         • 'status' - Checks system status\n\
         {rule}"
    )
}

/// Command list and usage tips.
pub fn help() -> String {
    "\nAVAILABLE COMMANDS:\n   \
     exit, quit, sair, q   - Closes the program\n   \
     help, ajuda, h, ?     - Shows available commands\n   \
     clear, limpar, cls    - Clears the screen\n   \
     status, info, s       - Checks system status\n   \
     [any text]            - Asks a question about the PDF\n\
     \nTIPS FOR USE:\n   \
     • Ask specific questions about the PDF content\n   \
     • The system responds only based on the document\n   \
     • Out-of-context questions return \"I don't have the information...\"\n"
        .to_string()
}

const CHECKLIST: &str = "\nTROUBLESHOOTING CHECKLIST:\n   \
     1. Is PostgreSQL running?\n      \
     → Command: docker compose up -d\n   \
     2. Has ingestion been executed?\n      \
     → Command: pdfqa ingest\n   \
     3. Is the API key configured?\n      \
     → File: .env (GOOGLE_API_KEY)\n";

/// Status report for the `status` shell command.
pub fn status_report(status: &SystemStatus) -> String {
    let mut out = format!("\nRAG SYSTEM STATUS:\n{}\n", rule(NARROW));

    match status.chunks {
        ChunkCount::Unready => {
            out.push_str("Vector database: UNREACHABLE\n");
            out.push_str(CHECKLIST);
        }
        ChunkCount::Zero => {
            out.push_str("Vector database: CONNECTED\n");
            out.push_str("Stored chunks: none\n");
            out.push_str("\nThe collection is empty. Run: pdfqa ingest\n");
        }
        ChunkCount::NonZeroUnknown => {
            out.push_str("Vector database: READY\n");
            out.push_str("Stored chunks: at least one (exact count not available)\n");
            out.push_str("\nSystem ready to answer questions!\n");
        }
    }

    out.push_str(&rule(NARROW));
    out
}

/// Causes and fixes printed when the shell cannot start.
pub fn startup_failure(reason: &str) -> String {
    format!(
        "\nCRITICAL ERROR: RAG system could not be initialized!\n   {reason}\n\
         \nPOSSIBLE CAUSES AND SOLUTIONS:\n   \
         1. PostgreSQL is not running\n      \
         → Solution: docker compose up -d\n   \
         2. Ingestion process has not been executed\n      \
         → Solution: pdfqa ingest\n   \
         3. GOOGLE_API_KEY is not configured or invalid\n      \
         → Solution: Configure it in the .env file\n   \
         4. The pgvector extension has not been created\n      \
         → Solution: Check the database logs\n"
    )
}

/// Question, answer and response time between rule lines.
pub fn answer_block(question: &str, answer: &str, elapsed: Duration) -> String {
    let rule = rule(WIDE);
    format!(
        "\n{rule}\nASK: {question}\n{rule}\nRESPONSE:\n{answer}\n{rule}\nResponse time: {:.2}s",
        elapsed.as_secs_f64()
    )
}

/// Search hits with their distances, best first.
pub fn search_results(query: &str, results: &[SearchResult]) -> String {
    let mut out = format!("Query: \"{query}\"\n");
    if results.is_empty() {
        out.push_str("  (no results)\n");
        return out;
    }
    for (i, result) in results.iter().enumerate() {
        let preview: String = result.content.chars().take(WIDE).collect();
        let _ = writeln!(
            out,
            "  {}. [distance={:.4}] chunk {}/{} | {}",
            i + 1,
            result.score,
            result.metadata.page,
            result.metadata.total_pages,
            preview.replace('\n', " "),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfqa_rag::ChunkMetadata;

    #[test]
    fn answer_block_shows_two_decimal_seconds() {
        let block = answer_block("Q?", "A.", Duration::from_millis(1234));
        assert!(block.contains("ASK: Q?"));
        assert!(block.contains("RESPONSE:\nA.\n"));
        assert!(block.ends_with("Response time: 1.23s"));
    }

    #[test]
    fn unready_status_lists_checklist() {
        let report = status_report(&SystemStatus { is_ready: false, chunks: ChunkCount::Unready });
        assert!(report.contains("docker compose up -d"));
        assert!(report.contains("GOOGLE_API_KEY"));

        let report =
            status_report(&SystemStatus { is_ready: true, chunks: ChunkCount::NonZeroUnknown });
        assert!(report.contains("READY"));
        assert!(!report.contains("CHECKLIST"));
    }

    #[test]
    fn search_results_list_distances() {
        let results = vec![SearchResult {
            content: "line one\nline two".into(),
            metadata: ChunkMetadata { page: 2, total_pages: 7, ..Default::default() },
            score: 0.125,
        }];
        let out = search_results("q", &results);
        assert!(out.contains("1. [distance=0.1250] chunk 2/7 | line one line two"));
        assert!(search_results("q", &[]).contains("(no results)"));
    }
}
