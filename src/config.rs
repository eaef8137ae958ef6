//! Configuration types for report generation.
//!
//! Every knob lives in [`ReportConfig`], built via [`ReportConfigBuilder`].
//! Completion-service settings are grouped in [`CompletionConfig`] and the
//! per-prompt truncation bounds in [`PromptLimits`], so a run can be logged
//! or diffed as one value.

use crate::error::ReportError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Settings for the text-completion service.
#[derive(Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    /// Ignored when both `endpoint` and `api_key` are set.
    pub provider_name: Option<String>,

    /// Azure OpenAI resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: Option<String>,

    /// Azure OpenAI API key.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Azure OpenAI REST API version. Default: "2024-02-01".
    pub api_version: String,

    /// Model identifier (the deployment name on Azure). Default: "gpt-4o".
    pub model: String,

    /// Sampling temperature. Default: 0.5.
    pub temperature: f32,

    /// Optional cap on generated tokens per request.
    pub max_tokens: Option<usize>,

    /// Total attempts per request, including the first one. Default: 3.
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds. Default: 5000.
    pub retry_delay_ms: u64,

    /// Per-request HTTP timeout in seconds. Default: 300.
    ///
    /// Section prompts carry up to ~630 000 characters of context, so
    /// responses routinely take well over a minute.
    pub request_timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider_name: None,
            endpoint: None,
            api_key: None,
            api_version: "2024-02-01".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.5,
            max_tokens: None,
            max_attempts: 3,
            retry_delay_ms: 5000,
            request_timeout_secs: 300,
        }
    }
}

impl fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("provider_name", &self.provider_name)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_version", &self.api_version)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl CompletionConfig {
    /// True when an Azure endpoint and key are both present.
    pub fn has_azure_credentials(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.endpoint) && set(&self.api_key)
    }
}

/// Character bounds applied to each large text before it enters a prompt.
///
/// Bounds count Unicode scalar values, not bytes, so multi-byte text is
/// never split mid-character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptLimits {
    /// Specification prefix sent to the structure extractor. Default: 60 000.
    pub structure_specification: usize,
    /// Subject document prefix sent to the fact extractor. Default: 30 000.
    pub facts_subject: usize,
    /// Subject document prefix sent with every section. Default: 30 000.
    pub section_subject: usize,
    /// First reference document prefix sent with every section. Default: 100 000.
    pub section_reference: usize,
    /// Specification prefix sent with every section. Default: 500 000.
    pub section_specification: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            structure_specification: 60_000,
            facts_subject: 30_000,
            section_subject: 30_000,
            section_reference: 100_000,
            section_specification: 500_000,
        }
    }
}

/// Configuration for a report-generation run.
///
/// Built via [`ReportConfig::builder()`] or using [`ReportConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_report::ReportConfig;
///
/// let config = ReportConfig::builder()
///     .model("gpt-4o")
///     .subject_dir("PC")
///     .output_dir("RELATORIOS")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ReportConfig {
    /// Completion service settings.
    pub completion: CompletionConfig,

    /// Master instruction text defining the report. Default: `prompt.txt`.
    pub specification_path: PathBuf,

    /// Directory of reference PDFs injected into every section. Default: `BASE`.
    pub reference_dir: PathBuf,

    /// Directory of subject PDFs, one report each. Default: `PC`.
    pub subject_dir: PathBuf,

    /// Extracted-text and assembled-report cache. Default: `CACHE`.
    ///
    /// Entries are never invalidated: delete a `.txt` file by hand to force
    /// re-extraction of its PDF.
    pub cache_dir: PathBuf,

    /// Rendered documents land here. Default: `RELATORIOS`.
    pub output_dir: PathBuf,

    /// Prompt truncation bounds.
    pub limits: PromptLimits,

    /// Skip DOCX rendering and stop after the markdown cache is written.
    pub markdown_only: bool,

    /// Optional per-section progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            completion: CompletionConfig::default(),
            specification_path: PathBuf::from("prompt.txt"),
            reference_dir: PathBuf::from("BASE"),
            subject_dir: PathBuf::from("PC"),
            cache_dir: PathBuf::from("CACHE"),
            output_dir: PathBuf::from("RELATORIOS"),
            limits: PromptLimits::default(),
            markdown_only: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfig")
            .field("completion", &self.completion)
            .field("specification_path", &self.specification_path)
            .field("reference_dir", &self.reference_dir)
            .field("subject_dir", &self.subject_dir)
            .field("cache_dir", &self.cache_dir)
            .field("output_dir", &self.output_dir)
            .field("limits", &self.limits)
            .field("markdown_only", &self.markdown_only)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ReportProgressCallback>"),
            )
            .finish()
    }
}

impl ReportConfig {
    /// Create a new builder for `ReportConfig`.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReportConfig`].
#[derive(Debug)]
pub struct ReportConfigBuilder {
    config: ReportConfig,
}

impl ReportConfigBuilder {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.completion.provider_name = Some(name.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.completion.endpoint = Some(endpoint.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.completion.api_key = Some(key.into());
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.completion.api_version = version.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.completion.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.completion.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.completion.max_tokens = Some(n);
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.completion.max_attempts = n;
        self
    }

    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.completion.retry_delay_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.completion.request_timeout_secs = secs;
        self
    }

    pub fn specification_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.specification_path = path.into();
        self
    }

    pub fn reference_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.reference_dir = dir.into();
        self
    }

    pub fn subject_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.subject_dir = dir.into();
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn limits(mut self, limits: PromptLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn markdown_only(mut self, v: bool) -> Self {
        self.config.markdown_only = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReportConfig, ReportError> {
        let c = &self.config.completion;
        if c.max_attempts == 0 {
            return Err(ReportError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(ReportError::InvalidConfig("model must not be empty".into()));
        }
        if c.endpoint.is_some() != c.api_key.is_some() {
            return Err(ReportError::InvalidConfig(
                "Azure endpoint and API key must be given together".into(),
            ));
        }
        let l = &self.config.limits;
        if [
            l.structure_specification,
            l.facts_subject,
            l.section_subject,
            l.section_reference,
            l.section_specification,
        ]
        .contains(&0)
        {
            return Err(ReportError::InvalidConfig(
                "prompt limits must be > 0".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_batch_layout() {
        let c = ReportConfig::default();
        assert_eq!(c.specification_path, PathBuf::from("prompt.txt"));
        assert_eq!(c.reference_dir, PathBuf::from("BASE"));
        assert_eq!(c.subject_dir, PathBuf::from("PC"));
        assert_eq!(c.cache_dir, PathBuf::from("CACHE"));
        assert_eq!(c.output_dir, PathBuf::from("RELATORIOS"));
        assert_eq!(c.completion.model, "gpt-4o");
        assert_eq!(c.completion.temperature, 0.5);
        assert_eq!(c.completion.max_attempts, 3);
        assert_eq!(c.completion.retry_delay_ms, 5000);
    }

    #[test]
    fn default_limits() {
        let l = PromptLimits::default();
        assert_eq!(l.structure_specification, 60_000);
        assert_eq!(l.facts_subject, 30_000);
        assert_eq!(l.section_subject, 30_000);
        assert_eq!(l.section_reference, 100_000);
        assert_eq!(l.section_specification, 500_000);
    }

    #[test]
    fn builder_rejects_zero_attempts() {
        let err = ReportConfig::builder().max_attempts(0).build().unwrap_err();
        assert!(matches!(err, ReportError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_endpoint_without_key() {
        let err = ReportConfig::builder()
            .endpoint("https://example.openai.azure.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("together"));
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = ReportConfig::builder().temperature(7.0).build().unwrap();
        assert_eq!(c.completion.temperature, 2.0);
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ReportConfig::builder()
            .endpoint("https://example.openai.azure.com")
            .api_key("super-secret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
        assert!(c.completion.has_azure_credentials());
    }
}
