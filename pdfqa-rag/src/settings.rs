//! Process settings read from environment variables.
//!
//! [`Settings`] is built once at startup and handed to component
//! constructors. [`Settings::from_lookup`] accepts any key lookup so tests
//! can inject values without touching the process environment.

use crate::error::{RagError, Result};

/// API key for the generative provider.
pub const ENV_API_KEY: &str = "GOOGLE_API_KEY";
/// Embedding model identifier.
pub const ENV_EMBEDDING_MODEL: &str = "GOOGLE_EMBEDDING_MODEL";
/// Chat model identifier.
pub const ENV_CHAT_MODEL: &str = "GOOGLE_CHAT_MODEL";
/// Embedding dimensionality.
pub const ENV_EMBEDDING_DIMENSIONS: &str = "GOOGLE_EMBEDDING_DIMENSIONS";
/// PostgreSQL connection string.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
/// Collection (table) name.
pub const ENV_COLLECTION: &str = "PG_VECTOR_COLLECTION_NAME";
/// Path of the PDF to ingest.
pub const ENV_PDF_PATH: &str = "PDF_PATH";
/// Optional cap on assembled context characters.
pub const ENV_MAX_CONTEXT_CHARS: &str = "RAG_MAX_CONTEXT_CHARS";

/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "pdf_documents";
/// Default PDF path.
pub const DEFAULT_PDF_PATH: &str = "./document.pdf";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
/// Default embedding dimensions for `gemini-embedding-001`.
pub const DEFAULT_DIMENSIONS: usize = 3072;

/// Startup settings for the embedding provider, chat provider and store.
#[derive(Clone, PartialEq)]
pub struct Settings {
    /// Generative provider API key.
    pub api_key: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Chat model identifier.
    pub chat_model: String,
    /// Embedding dimensionality `D`.
    pub embedding_dimensions: usize,
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Collection (table) name.
    pub collection: String,
    /// PDF to ingest.
    pub pdf_path: String,
    /// Optional cap on assembled context characters.
    pub max_context_chars: Option<usize>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("embedding_model", &self.embedding_model)
            .field("chat_model", &self.chat_model)
            .field("embedding_dimensions", &self.embedding_dimensions)
            .field("database_url", &"<redacted>")
            .field("collection", &self.collection)
            .field("pdf_path", &self.pdf_path)
            .field("max_context_chars", &self.max_context_chars)
            .finish()
    }
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `GOOGLE_API_KEY` or
    /// `DATABASE_URL` is missing, or a numeric variable does not parse as a
    /// positive integer.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get(ENV_API_KEY).ok_or_else(|| {
            RagError::ConfigError(format!("{ENV_API_KEY} is not set in environment variables"))
        })?;
        let database_url = get(ENV_DATABASE_URL).ok_or_else(|| {
            RagError::ConfigError(format!("{ENV_DATABASE_URL} is not set in environment variables"))
        })?;

        let embedding_dimensions = match get(ENV_EMBEDDING_DIMENSIONS) {
            Some(raw) => parse_positive(ENV_EMBEDDING_DIMENSIONS, &raw)?,
            None => DEFAULT_DIMENSIONS,
        };
        let max_context_chars = get(ENV_MAX_CONTEXT_CHARS)
            .map(|raw| parse_positive(ENV_MAX_CONTEXT_CHARS, &raw))
            .transpose()?;

        Ok(Self {
            api_key,
            embedding_model: get(ENV_EMBEDDING_MODEL)
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            chat_model: get(ENV_CHAT_MODEL).unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_dimensions,
            database_url,
            collection: get(ENV_COLLECTION).unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            pdf_path: get(ENV_PDF_PATH).unwrap_or_else(|| DEFAULT_PDF_PATH.to_string()),
            max_context_chars,
        })
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(RagError::ConfigError(format!("{key} must be a positive integer, got '{raw}'"))),
    }
}
