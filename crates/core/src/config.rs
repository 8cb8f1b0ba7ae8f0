//! Configuration management for docqa.
//!
//! Configuration is merged from, in increasing precedence:
//! - Built-in defaults
//! - A YAML config file (`.docqa/config.yaml` in the workspace, or `DOCQA_CONFIG`)
//! - Environment variables
//! - Command-line flags (`AppConfig::with_overrides`)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the generation factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 3] = ["groq", "openai", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docqa/ and storage/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider ("groq", "openai", "ollama")
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// Explicit API key for the generation provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Generation provider configurations
    pub llm: Option<LlmConfig>,

    /// Answer pipeline settings
    pub qa: QaConfig,

    /// Query embedding settings
    pub embedding: EmbeddingConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    /// Hosted OpenAI-compatible chat completion APIs (OpenAI, Groq)
    Hosted {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::Hosted { model, .. } => model,
            ProviderConfig::Ollama { model, .. } => model,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::Hosted { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }
}

/// Answer pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaConfig {
    /// Persisted passage index; relative paths resolve against the workspace
    #[serde(default)]
    pub index_path: Option<PathBuf>,

    /// Passages requested from the retriever per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity for a passage to count as evidence
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f32,

    /// Minimum aggregate confidence for an answer to be returned
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,

    /// Rewrites longer than this are discarded
    #[serde(default = "default_max_rewrite_chars")]
    pub max_rewrite_chars: usize,

    /// Deadline for each generation call; 0 disables it
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Whether to rewrite questions before retrieval
    #[serde(default = "default_true")]
    pub rewrite: bool,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_top_k() -> usize {
    2
}

fn default_similarity_floor() -> f32 {
    0.35
}

fn default_confidence_floor() -> f64 {
    0.30
}

fn default_max_rewrite_chars() -> usize {
    200
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    256
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            top_k: default_top_k(),
            similarity_floor: default_similarity_floor(),
            confidence_floor: default_confidence_floor(),
            max_rewrite_chars: default_max_rewrite_chars(),
            generation_timeout_secs: default_generation_timeout_secs(),
            rewrite: true,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Query embedding settings. Must match the model the index was built with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "trigram" or "ollama"
    pub provider: String,

    pub model: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_dimensions() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: default_dimensions(),
            endpoint: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    qa: Option<QaConfig>,
    embedding: Option<EmbeddingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "groq".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            qa: QaConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment.
    ///
    /// Environment variables:
    /// - `DOCQA_WORKSPACE`: Override workspace path
    /// - `DOCQA_CONFIG`: Path to config file
    /// - `DOCQA_PROVIDER`: Generation provider
    /// - `DOCQA_MODEL`: Model identifier
    /// - `DOCQA_API_KEY`: API key
    /// - `DOCQA_INDEX_PATH`: Persisted passage index
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration for an explicit workspace and/or config file.
    ///
    /// Both arguments take precedence over `DOCQA_WORKSPACE` and
    /// `DOCQA_CONFIG`, and are applied before the YAML file is chosen, so
    /// the file that gets merged is the one they point at.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace
            .clone()
            .or_else(|| std::env::var("DOCQA_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file = config_file
            .or_else(|| std::env::var("DOCQA_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.docqa_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // An explicit workspace outranks `workspace.path` in the file
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        if let Ok(provider) = std::env::var("DOCQA_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCQA_MODEL") {
            config.model = model;
        }

        if let Ok(index_path) = std::env::var("DOCQA_INDEX_PATH") {
            config.qa.index_path = Some(PathBuf::from(index_path));
        }

        config.api_key = std::env::var("DOCQA_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok().or(config.log_level);

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(qa) = config_file.qa {
            result.qa = qa;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .docqa directory.
    pub fn docqa_dir(&self) -> PathBuf {
        self.workspace.join(".docqa")
    }

    /// Resolve the persisted passage index location.
    ///
    /// Defaults to `<workspace>/storage/vector_store/index.sqlite`.
    pub fn index_path(&self) -> PathBuf {
        match self.qa.index_path {
            Some(ref path) if path.is_absolute() => path.clone(),
            Some(ref path) => self.workspace.join(path),
            None => self
                .workspace
                .join("storage")
                .join("vector_store")
                .join("index.sqlite"),
        }
    }

    /// Get the configuration block for a provider, if any.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Custom endpoint for the provider, if configured.
    pub fn resolve_endpoint(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|pc| pc.endpoint())
            .map(str::to_string)
    }

    /// Resolve the API key for a hosted provider.
    ///
    /// Order: `DOCQA_API_KEY`, the provider's configured `apiKeyEnv`, then
    /// the provider's conventional variable (`GROQ_API_KEY`, `OPENAI_API_KEY`).
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ProviderConfig::Hosted { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if let Ok(key) = std::env::var(api_key_env) {
                return Some(key);
            }
        }

        let conventional = match provider {
            "groq" => "GROQ_API_KEY",
            "openai" => "OPENAI_API_KEY",
            _ => return None,
        };

        std::env::var(conventional).ok()
    }

    /// Validate configuration before building the pipeline.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();

        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider != "ollama" && self.resolve_api_key(provider).is_none() {
            return Err(AppError::Config(format!(
                "No API key found for provider '{}'",
                provider
            )));
        }

        if self.qa.top_k == 0 {
            return Err(AppError::Config("qa.topK must be at least 1".to_string()));
        }

        if !(0.0..=1.0).contains(&self.qa.similarity_floor) {
            return Err(AppError::Config(format!(
                "qa.similarityFloor must be within [0, 1], got {}",
                self.qa.similarity_floor
            )));
        }

        if !(0.0..=1.0).contains(&self.qa.confidence_floor) {
            return Err(AppError::Config(format!(
                "qa.confidenceFloor must be within [0, 1], got {}",
                self.qa.confidence_floor
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "groq");
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.qa.top_k, 2);
        assert_eq!(config.qa.similarity_floor, 0.35);
        assert_eq!(config.qa.confidence_floor, 0.30);
        assert_eq!(config.qa.max_rewrite_chars, 200);
        assert!(!config.verbose);
    }

    #[test]
    fn test_default_index_path() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/qa");
        assert_eq!(
            config.index_path(),
            PathBuf::from("/srv/qa/storage/vector_store/index.sqlite")
        );

        config.qa.index_path = Some(PathBuf::from("data/passages.sqlite"));
        assert_eq!(
            config.index_path(),
            PathBuf::from("/srv/qa/data/passages.sqlite")
        );

        config.qa.index_path = Some(PathBuf::from("/var/lib/index.sqlite"));
        assert_eq!(config.index_path(), PathBuf::from("/var/lib/index.sqlite"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_load_with_reads_explicit_config_file() {
        let workspace = tempfile::TempDir::new().unwrap();
        let custom = workspace.path().join("custom.yaml");
        std::fs::write(&custom, "qa:\n  topK: 7\n").unwrap();

        let config = AppConfig::load_with(Some(workspace.path().to_path_buf()), Some(custom.clone()))
            .unwrap();

        assert_eq!(config.qa.top_k, 7);
        assert_eq!(config.config_file, Some(custom));
    }

    #[test]
    fn test_load_with_reads_workspace_config() {
        let workspace = tempfile::TempDir::new().unwrap();
        let docqa_dir = workspace.path().join(".docqa");
        std::fs::create_dir_all(&docqa_dir).unwrap();
        std::fs::write(
            docqa_dir.join("config.yaml"),
            "workspace:\n  path: /somewhere/else\nqa:\n  topK: 5\n",
        )
        .unwrap();

        let config = AppConfig::load_with(Some(workspace.path().to_path_buf()), None).unwrap();

        assert_eq!(config.qa.top_k, 5);
        assert_eq!(config.workspace, workspace.path());
    }

    #[test]
    fn test_load_with_missing_config_file_is_error() {
        let workspace = tempfile::TempDir::new().unwrap();
        let missing = workspace.path().join("nope.yaml");

        let result = AppConfig::load_with(Some(workspace.path().to_path_buf()), Some(missing));

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_merge_yaml() {
        let yaml = r#"
llm:
  activeProvider: ollama
  providers:
    ollama:
      endpoint: http://gpu-box:11434
      model: mistral
qa:
  topK: 4
  similarityFloor: 0.5
embedding:
  provider: ollama
  model: nomic-embed-text
  dimensions: 768
logging:
  level: warn
  color: false
"#;

        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.model, "mistral");
        assert_eq!(
            merged.resolve_endpoint("ollama"),
            Some("http://gpu-box:11434".to_string())
        );
        assert_eq!(merged.qa.top_k, 4);
        assert_eq!(merged.qa.similarity_floor, 0.5);
        // Unspecified fields keep their defaults
        assert_eq!(merged.qa.confidence_floor, 0.30);
        assert_eq!(merged.qa.max_rewrite_chars, 200);
        assert_eq!(merged.embedding.dimensions, 768);
        assert_eq!(merged.log_level, Some("warn".to_string()));
        assert!(merged.no_color);
    }

    #[test]
    fn test_merge_yaml_hosted_provider() {
        let yaml = r#"
llm:
  activeProvider: groq
  providers:
    groq:
      apiKeyEnv: MY_GROQ_KEY
      model: llama-3.1-70b-versatile
"#;

        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert!(matches!(
            merged.get_provider_config("groq"),
            Some(ProviderConfig::Hosted { .. })
        ));
        assert_eq!(merged.model, "llama-3.1-70b-versatile");
        assert_eq!(merged.resolve_endpoint("groq"), None);
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".to_string());
        assert_eq!(config.resolve_api_key("groq"), Some("sk-test".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();

        config.qa.top_k = 0;
        assert!(config.validate().is_err());

        config.qa.top_k = 2;
        config.qa.similarity_floor = 1.5;
        assert!(config.validate().is_err());

        config.qa.similarity_floor = 0.35;
        config.qa.confidence_floor = -0.1;
        assert!(config.validate().is_err());
    }
}
