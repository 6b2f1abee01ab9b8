//! Context assembly and the grounding prompt.

use crate::document::SearchResult;

/// The exact sentence returned when the document holds no answer.
pub const REFUSAL: &str = "I don't have the information necessary to answer your question.";

/// Returned by the answer pipeline when a question cannot be processed.
pub const INTERNAL_ERROR: &str =
    "Internal error: Unable to process your query. Please check if ingestion has been performed.";

/// Separator placed between retrieved chunks.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Retrieved text ready to be placed in the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    /// The joined chunk contents.
    pub text: String,
    /// How many retrieved chunks contributed text.
    pub chunks_used: usize,
    /// Whether the character budget cut anything off.
    pub truncated: bool,
}

impl AssembledContext {
    /// Length of the context in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Join retrieved chunk contents in the given order, separated by a blank
/// line, without deduplication.
///
/// With `max_chars` set, whole chunks are appended while they fit in the
/// budget. A first chunk that alone exceeds the budget is cut at the budget.
pub fn assemble_context(results: &[SearchResult], max_chars: Option<usize>) -> AssembledContext {
    let Some(budget) = max_chars else {
        let text =
            results.iter().map(|r| r.content.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR);
        return AssembledContext { text, chunks_used: results.len(), truncated: false };
    };

    let separator_len = CONTEXT_SEPARATOR.chars().count();
    let mut text = String::new();
    let mut used_chars = 0;
    let mut chunks_used = 0;

    for result in results {
        let content_len = result.content.chars().count();
        let needed = if chunks_used == 0 { content_len } else { separator_len + content_len };

        if used_chars + needed > budget {
            if chunks_used == 0 {
                text = result.content.chars().take(budget).collect();
                chunks_used = 1;
            }
            return AssembledContext { text, chunks_used, truncated: true };
        }

        if chunks_used > 0 {
            text.push_str(CONTEXT_SEPARATOR);
        }
        text.push_str(&result.content);
        used_chars += needed;
        chunks_used += 1;
    }

    AssembledContext { text, chunks_used, truncated: false }
}

/// Substitute the context and the raw question into the grounding template.
///
/// The template restricts the model to the supplied context and tells it to
/// answer with [`REFUSAL`] when the context does not contain the answer.
pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        "CONTEXT PROVIDED:\n\
         {context}\n\
         \n\
         CRITICAL INSTRUCTIONS:\n\
         - Answer EXCLUSIVELY from the CONTEXT PROVIDED above.\n\
         - If the information is not EXPLICITLY in the context, respond exactly:\n  \
         \"{REFUSAL}\"\n\
         - NEVER use outside knowledge or invent information.\n\
         - NEVER express personal opinions or interpretations beyond the given text.\n\
         \n\
         USER QUESTION:\n\
         {question}\n\
         \n\
         ANSWER (based only on the provided context):\n"
    )
}
