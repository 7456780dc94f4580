//! TOML configuration for the `webminer` binary
//!
//! ```toml
//! [analysis]
//! scoring_function = "cross-tab-1"
//! normalize_across_backends = true
//!
//! [terms]
//! primary = ["beethoven", "coltrane"]
//! secondary_file = "genres.txt"
//!
//! [[sites]]
//! domain = "allmusic.com"
//! weight = 2.0
//!
//! [[backends]]
//! name = "google"
//! endpoint = "https://www.googleapis.com/customsearch/v1"
//! extra_params = { cx = "..." }
//! ```
//!
//! API keys come from the environment (`api_key_env`, by default
//! `WEBMINER_<NAME>_API_KEY`) or from `api_key`; the environment wins.

use crate::backends::{HttpSearchBackend, HttpSearchConfig, LastFmTagSource, SearchBackend, SearchOptions, TagSource};
use crate::collector::RetryPolicy;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{RequiredFilters, ScoringFunction, SiteRestriction, TermSet, WeightScaling};
use crate::post_normalizer::PostNormalization;
use crate::report::OutputFormat;
use crate::scorer::ZeroDenominator;
use crate::settings::AnalysisSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use webminer_common::config::{load_toml_config, parse_toml_config, LoggingConfig};

/// Root of `webminer.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct WebminerConfig {
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub terms: TermsSection,
    #[serde(default)]
    pub filters: FiltersSection,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
    #[serde(default)]
    pub search: SearchOptions,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub backends: Vec<HttpSearchConfig>,
    #[serde(default)]
    pub tag_source: Option<TagSourceConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSection {
    pub scoring_function: ScoringFunction,
    #[serde(default)]
    pub normalize_across_backends: bool,
    #[serde(default)]
    pub normalize_across_sites: bool,
    #[serde(default)]
    pub weight_scaling: WeightScaling,
    #[serde(default)]
    pub zero_denominator: ZeroDenominator,
    #[serde(default)]
    pub post_normalization: Option<PostNormalization>,
}

/// Terms given inline or as files with one term per line
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TermsSection {
    #[serde(default)]
    pub primary: Vec<String>,
    pub primary_file: Option<PathBuf>,
    #[serde(default)]
    pub secondary: Vec<String>,
    pub secondary_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FiltersSection {
    /// Basic filters and patterns using `<PRIMARY_SEARCH_STRING>` /
    /// `<SECONDARY_SEARCH_STRING>`
    #[serde(default)]
    pub required: Vec<String>,
}

/// A site as `"domain <WEIGHT> 2"` or as a table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SiteEntry {
    Text(String),
    Table {
        /// Omitted for the whole network
        domain: Option<String>,
        #[serde(default = "default_site_weight")]
        weight: f64,
    },
}

fn default_site_weight() -> f64 {
    1.0
}

impl SiteEntry {
    pub fn to_restriction(&self) -> webminer_common::Result<SiteRestriction> {
        match self {
            SiteEntry::Text(text) => SiteRestriction::parse(text),
            SiteEntry::Table { domain, weight } => SiteRestriction::new(domain.as_deref(), *weight),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagSourceKind {
    Lastfm,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagSourceConfig {
    #[serde(rename = "type")]
    pub kind: TagSourceKind,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// File name without extension
    pub file_stem: String,
    pub formats: Vec<OutputFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("webminer-output"),
            file_stem: "webminer".to_string(),
            formats: vec![OutputFormat::Text, OutputFormat::Json],
        }
    }
}

/// Loaded configuration plus the directory relative paths resolve against
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: WebminerConfig,
    pub base_dir: PathBuf,
}

impl LoadedConfig {
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let config: WebminerConfig = load_toml_config(path)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self { config, base_dir })
    }

    pub fn parse(content: &str, base_dir: impl Into<PathBuf>) -> AnalysisResult<Self> {
        Ok(Self {
            config: parse_toml_config(content)?,
            base_dir: base_dir.into(),
        })
    }

    /// Immutable run settings
    pub fn settings(&self) -> AnalysisResult<AnalysisSettings> {
        let config = &self.config;
        let analysis = &config.analysis;

        let primary = self.term_set(&config.terms.primary, config.terms.primary_file.as_deref(), "terms.primary")?;
        let secondary = self.term_set(
            &config.terms.secondary,
            config.terms.secondary_file.as_deref(),
            "terms.secondary",
        )?;
        let secondary = (!secondary.is_empty()).then_some(secondary);

        let sites = config
            .sites
            .iter()
            .map(|s| s.to_restriction().map_err(|e| AnalysisError::config("sites", e.to_string())))
            .collect::<AnalysisResult<Vec<_>>>()?;

        config
            .search
            .validate()
            .map_err(|e| AnalysisError::config("search", e.to_string()))?;

        let mut settings = AnalysisSettings::new(analysis.scoring_function, primary, secondary);
        settings.filters = RequiredFilters::parse(&config.filters.required);
        settings.sites = sites;
        settings.weight_scaling = analysis.weight_scaling;
        settings.normalize_across_backends = analysis.normalize_across_backends;
        settings.normalize_across_sites = analysis.normalize_across_sites;
        settings.post_normalization = analysis.post_normalization;
        settings.zero_denominator = analysis.zero_denominator;
        settings.search_options = config.search.clone();
        settings.retry = config.retry.clone();
        Ok(settings)
    }

    fn term_set(&self, inline: &[String], file: Option<&Path>, field: &str) -> AnalysisResult<TermSet> {
        let inline = TermSet::from_lines(inline.iter().map(String::as_str))
            .map_err(|e| AnalysisError::config(field, e.to_string()))?;

        let Some(file) = file else {
            return Ok(inline);
        };
        if !inline.is_empty() {
            return Err(AnalysisError::config(
                field,
                "Terms given both inline and as a file",
            ));
        }
        let path = if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.base_dir.join(file)
        };
        TermSet::from_file(&path).map_err(|e| AnalysisError::config(format!("{}_file", field), e.to_string()))
    }

    pub fn backends(&self) -> AnalysisResult<Vec<Box<dyn SearchBackend>>> {
        let mut backends: Vec<Box<dyn SearchBackend>> = Vec::with_capacity(self.config.backends.len());
        for config in &self.config.backends {
            let mut config = config.clone();
            config.api_key = resolve_api_key(&config.name, config.api_key.take(), config.api_key_env.as_deref());
            let backend = HttpSearchBackend::new(config.clone())
                .map_err(|e| AnalysisError::config(format!("backends.{}", config.name), e.to_string()))?;
            backends.push(Box::new(backend));
        }
        Ok(backends)
    }

    pub fn tag_source(&self) -> AnalysisResult<Option<Box<dyn TagSource>>> {
        let Some(config) = &self.config.tag_source else {
            return Ok(None);
        };
        match config.kind {
            TagSourceKind::Lastfm => {
                let key = resolve_api_key("lastfm", config.api_key.clone(), config.api_key_env.as_deref())
                    .unwrap_or_default();
                let mut source = LastFmTagSource::new(key)
                    .map_err(|e| AnalysisError::config("tag_source", e.to_string()))?;
                if let Some(url) = &config.base_url {
                    source = source.with_base_url(url.clone());
                }
                Ok(Some(Box::new(source)))
            }
        }
    }
}

/// `WEBMINER_<NAME>_API_KEY`, non-alphanumerics replaced by `_`
pub fn default_api_key_env(name: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("WEBMINER_{}_API_KEY", name)
}

/// Environment variable first, then the TOML value
pub fn resolve_api_key(name: &str, toml_key: Option<String>, env_name: Option<&str>) -> Option<String> {
    let env_name = env_name.map(str::to_string).unwrap_or_else(|| default_api_key_env(name));
    let env_key = std::env::var(&env_name).ok().filter(|k| !k.trim().is_empty());
    let toml_key = toml_key.filter(|k| !k.trim().is_empty());

    match (env_key, toml_key) {
        (Some(env_key), Some(_)) => {
            warn!(
                backend = %name,
                env_var = %env_name,
                "API key set in both environment and config file, using environment"
            );
            Some(env_key)
        }
        (Some(env_key), None) => Some(env_key),
        (None, toml_key) => toml_key,
    }
}
