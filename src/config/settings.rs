//! Configuration settings for Lectern.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub corpus: CorpusSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub retrieval: RetrievalSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Where the serving corpus comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Local corpus file.
    pub path: String,
    /// Remote corpus file. Takes precedence over `path` when set.
    pub url: Option<String>,
    /// Timeout for downloading a remote corpus.
    pub download_timeout_secs: u64,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            path: "~/.lectern/embeddings.json".to_string(),
            url: None,
            download_timeout_secs: 60,
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Cohere embed v3 (default).
    #[default]
    Cohere,
    /// OpenAI embeddings.
    OpenAI,
}

impl std::str::FromStr for EmbeddingProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cohere" => Ok(EmbeddingProviderKind::Cohere),
            "openai" => Ok(EmbeddingProviderKind::OpenAI),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProviderKind::Cohere => write!(f, "cohere"),
            EmbeddingProviderKind::OpenAI => write!(f, "openai"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (cohere, openai).
    pub provider: EmbeddingProviderKind,
    /// Embedding model. Empty selects the provider default.
    pub model: String,
    /// Embedding dimensions (OpenAI only; Cohere models have a fixed size).
    pub dimensions: u32,
    /// API base URL. Empty selects the provider default.
    pub base_url: String,
    /// Environment variable holding the API key. Empty selects the provider default.
    pub api_key_env: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Texts per embedding request when indexing.
    pub batch_size: usize,
    /// Embedding requests in flight at once when indexing.
    pub max_concurrent_batches: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Cohere,
            model: String::new(),
            dimensions: 1536,
            base_url: String::new(),
            api_key_env: String::new(),
            timeout_secs: 30,
            batch_size: 50,
            max_concurrent_batches: 2,
        }
    }
}

impl EmbeddingSettings {
    pub fn model(&self) -> &str {
        match (self.model.is_empty(), self.provider) {
            (false, _) => &self.model,
            (true, EmbeddingProviderKind::Cohere) => "embed-english-v3.0",
            (true, EmbeddingProviderKind::OpenAI) => "text-embedding-3-small",
        }
    }

    pub fn base_url(&self) -> &str {
        match (self.base_url.is_empty(), self.provider) {
            (false, _) => &self.base_url,
            (true, EmbeddingProviderKind::Cohere) => "https://api.cohere.ai",
            (true, EmbeddingProviderKind::OpenAI) => "https://api.openai.com/v1",
        }
    }

    pub fn api_key_env(&self) -> &str {
        match (self.api_key_env.is_empty(), self.provider) {
            (false, _) => &self.api_key_env,
            (true, EmbeddingProviderKind::Cohere) => "COHERE_API_KEY",
            (true, EmbeddingProviderKind::OpenAI) => "OPENAI_API_KEY",
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Generation provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProviderKind {
    /// Cohere chat v2 (default).
    #[default]
    Cohere,
    /// OpenAI chat completions.
    OpenAI,
    /// No language model: list the retrieved passages.
    Extractive,
}

impl std::str::FromStr for GenerationProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cohere" => Ok(GenerationProviderKind::Cohere),
            "openai" => Ok(GenerationProviderKind::OpenAI),
            "extractive" | "offline" => Ok(GenerationProviderKind::Extractive),
            _ => Err(format!("Unknown generation provider: {}", s)),
        }
    }
}

impl std::fmt::Display for GenerationProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationProviderKind::Cohere => write!(f, "cohere"),
            GenerationProviderKind::OpenAI => write!(f, "openai"),
            GenerationProviderKind::Extractive => write!(f, "extractive"),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Generation provider (cohere, openai, extractive).
    pub provider: GenerationProviderKind,
    /// Chat model. Empty selects the provider default.
    pub model: String,
    /// API base URL. Empty selects the provider default.
    pub base_url: String,
    /// Environment variable holding the API key. Empty selects the provider default.
    pub api_key_env: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: GenerationProviderKind::Cohere,
            model: String::new(),
            base_url: String::new(),
            api_key_env: String::new(),
            temperature: 0.2,
            max_tokens: None,
            timeout_secs: 30,
        }
    }
}

impl GenerationSettings {
    pub fn model(&self) -> &str {
        match (self.model.is_empty(), self.provider) {
            (false, _) => &self.model,
            (true, GenerationProviderKind::Cohere) => "command-a-03-2025",
            (true, GenerationProviderKind::OpenAI) => "gpt-4o-mini",
            (true, GenerationProviderKind::Extractive) => "extractive",
        }
    }

    pub fn base_url(&self) -> &str {
        match (self.base_url.is_empty(), self.provider) {
            (false, _) => &self.base_url,
            (true, GenerationProviderKind::OpenAI) => "https://api.openai.com/v1",
            (true, _) => "https://api.cohere.com",
        }
    }

    pub fn api_key_env(&self) -> &str {
        match (self.api_key_env.is_empty(), self.provider) {
            (false, _) => &self.api_key_env,
            (true, GenerationProviderKind::OpenAI) => "OPENAI_API_KEY",
            (true, _) => "COHERE_API_KEY",
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Ranking strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RankerKind {
    /// Cosine similarity over embeddings.
    #[default]
    Cosine,
    /// Query-term overlap count, no embeddings required.
    Lexical,
}

impl std::str::FromStr for RankerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" | "semantic" => Ok(RankerKind::Cosine),
            "lexical" | "keyword" => Ok(RankerKind::Lexical),
            _ => Err(format!("Unknown ranker: {}", s)),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Ranking strategy (cosine, lexical).
    pub ranker: RankerKind,
    /// Number of chunks handed to the generator.
    pub top_k: usize,
    /// Maximum characters of chunk text per context entry.
    pub max_text_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            ranker: RankerKind::Cosine,
            top_k: 5,
            max_text_chars: 1000,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Default for PromptSettings {
    fn default() -> Self {
        let mut variables = std::collections::HashMap::new();
        variables.insert("course".to_string(), "OpenGL".to_string());
        Self {
            custom_dir: None,
            variables,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// `EMBEDDINGS_URL` and `PORT` from the environment override the file.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = Self::read_file(&config_path)?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Read a configuration file as written, without environment overrides.
    /// A missing file yields the defaults.
    pub fn read_file(path: &PathBuf) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Return a copy with the dotted `key` (e.g. `retrieval.top_k`) set.
    ///
    /// `value` is taken as a boolean or number when it parses as one and the
    /// field accepts it, and as a string otherwise.
    pub fn with_value(&self, key: &str, value: &str) -> crate::error::Result<Self> {
        use crate::error::LecternError;

        let (section, field) = key
            .split_once('.')
            .ok_or_else(|| LecternError::Config(format!("expected <section>.<key>, got '{}'", key)))?;

        let mut candidates = Vec::new();
        if let Ok(b) = value.parse::<bool>() {
            candidates.push(toml::Value::Boolean(b));
        }
        if let Ok(i) = value.parse::<i64>() {
            candidates.push(toml::Value::Integer(i));
        }
        if let Ok(f) = value.parse::<f64>() {
            candidates.push(toml::Value::Float(f));
        }
        candidates.push(toml::Value::String(value.to_string()));

        let base = toml::Value::try_from(self).map_err(|e| LecternError::Config(e.to_string()))?;
        let mut last_error = None;
        for candidate in candidates {
            let mut root = base.clone();
            let table = root
                .get_mut(section)
                .and_then(toml::Value::as_table_mut)
                .ok_or_else(|| LecternError::Config(format!("unknown section '{}'", section)))?;
            if section != "prompts" && !table.contains_key(field) && !Self::optional_field(field) {
                return Err(LecternError::Config(format!("unknown key '{}'", key)));
            }
            table.insert(field.to_string(), candidate);

            match root.try_into::<Settings>() {
                Ok(settings) => return Ok(settings),
                Err(e) => last_error = Some(e),
            }
        }
        Err(LecternError::Config(format!(
            "invalid value '{}' for {}: {}",
            value,
            key,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Optional fields are left out of the serialized file when unset.
    fn optional_field(field: &str) -> bool {
        matches!(field, "url" | "max_tokens" | "custom_dir")
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("EMBEDDINGS_URL").filter(|u| !u.trim().is_empty()) {
            self.corpus.url = Some(url);
        }
        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LecternError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lectern")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded local corpus path.
    pub fn corpus_path(&self) -> PathBuf {
        Self::expand_path(&self.corpus.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.retrieval.max_text_chars, 1000);
        assert_eq!(settings.embedding.batch_size, 50);
        assert_eq!(settings.embedding.model(), "embed-english-v3.0");
        assert_eq!(settings.embedding.api_key_env(), "COHERE_API_KEY");
        assert_eq!(settings.generation.model(), "command-a-03-2025");
        assert_eq!(settings.embedding.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [embedding]
            provider = "openai"

            [retrieval]
            ranker = "lexical"
            top_k = 3
            "#,
        )
        .unwrap();

        assert_eq!(settings.embedding.provider, EmbeddingProviderKind::OpenAI);
        assert_eq!(settings.embedding.model(), "text-embedding-3-small");
        assert_eq!(settings.embedding.base_url(), "https://api.openai.com/v1");
        assert_eq!(settings.retrieval.ranker, RankerKind::Lexical);
        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.retrieval.max_text_chars, 1000);
        assert_eq!(settings.server.port, 5000);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_env(|key| match key {
            "EMBEDDINGS_URL" => Some("https://example.com/embeddings.json".to_string()),
            "PORT" => Some("8080".to_string()),
            _ => None,
        });
        assert_eq!(
            settings.corpus.url.as_deref(),
            Some("https://example.com/embeddings.json")
        );
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn test_save_and_load_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.generation.provider = GenerationProviderKind::Extractive;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.generation.provider, GenerationProviderKind::Extractive);
    }

    #[test]
    fn test_with_value() {
        let settings = Settings::default();

        let updated = settings.with_value("retrieval.top_k", "8").unwrap();
        assert_eq!(updated.retrieval.top_k, 8);

        let updated = settings.with_value("generation.temperature", "0.5").unwrap();
        assert!((updated.generation.temperature - 0.5).abs() < 1e-6);

        let updated = settings.with_value("generation.provider", "extractive").unwrap();
        assert_eq!(updated.generation.provider, GenerationProviderKind::Extractive);

        let updated = settings.with_value("corpus.url", "https://example.com/e.json").unwrap();
        assert_eq!(updated.corpus.url.as_deref(), Some("https://example.com/e.json"));

        assert!(settings.with_value("retrieval.top_k", "many").is_err());
        assert!(settings.with_value("retrieval.nope", "1").is_err());
        assert!(settings.with_value("top_k", "1").is_err());
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("OpenAI".parse::<EmbeddingProviderKind>().unwrap(), EmbeddingProviderKind::OpenAI);
        assert_eq!("offline".parse::<GenerationProviderKind>().unwrap(), GenerationProviderKind::Extractive);
        assert_eq!("keyword".parse::<RankerKind>().unwrap(), RankerKind::Lexical);
        assert!("ollama".parse::<EmbeddingProviderKind>().is_err());
    }
}
