//! Layered TOML configuration for the pipeline.
//!
//! The configuration system supports:
//! - Bundled defaults (include_str! from storylens.toml)
//! - User overrides (~/.config/storylens/storylens.toml, then ./storylens.toml)
//! - Automatic merging with user values taking precedence
//!
//! Every threshold the quality gate applies lives here, so calibration can
//! change without code changes.

use config::{Config, File, FileFormat};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use storylens_error::{ConfigError, StorylensError, StorylensResult};
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../storylens.toml");

/// Ingestion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct IngestionConfig {
    /// Paragraphs longer than this are split at sentence boundaries
    #[serde(default = "default_max_segment_chars")]
    max_segment_chars: usize,
}

fn default_max_segment_chars() -> usize {
    2000
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_segment_chars: default_max_segment_chars(),
        }
    }
}

/// Translation provider and resilience settings.
///
/// ```toml
/// [translation]
/// provider = "lexicon"
/// retry_count = 2
/// timeout_ms = 1200
/// circuit_failure_threshold = 3
/// circuit_reset_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct TranslationConfig {
    /// Provider name: `lexicon`, `identity`, or `unavailable`
    #[serde(default = "default_translation_provider")]
    #[setters(into)]
    provider: String,

    /// Language detector name
    #[serde(default = "default_language_detector")]
    #[setters(into)]
    language_detector: String,

    /// Retries after the first attempt
    #[serde(default = "default_retry_count")]
    retry_count: usize,

    /// First backoff delay
    #[serde(default = "default_initial_backoff_ms")]
    initial_backoff_ms: u64,

    /// Upper bound on a single backoff delay
    #[serde(default = "default_max_backoff_ms")]
    max_backoff_ms: u64,

    /// Per-attempt timeout
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,

    /// Consecutive failures that open the circuit
    #[serde(default = "default_circuit_failure_threshold")]
    circuit_failure_threshold: u32,

    /// Cool-down before an open circuit lets a trial through
    #[serde(default = "default_circuit_reset_secs")]
    circuit_reset_secs: u64,

    /// Maximum in-flight provider calls per run
    #[serde(default = "default_max_concurrent")]
    max_concurrent: usize,

    /// Optional request rate ceiling per provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    requests_per_minute: Option<u32>,
}

fn default_translation_provider() -> String {
    "lexicon".to_string()
}

fn default_language_detector() -> String {
    "heuristic".to_string()
}

fn default_retry_count() -> usize {
    2
}

fn default_initial_backoff_ms() -> u64 {
    50
}

fn default_max_backoff_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    1200
}

fn default_circuit_failure_threshold() -> u32 {
    3
}

fn default_circuit_reset_secs() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    4
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: default_translation_provider(),
            language_detector: default_language_detector(),
            retry_count: default_retry_count(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            timeout_ms: default_timeout_ms(),
            circuit_failure_threshold: default_circuit_failure_threshold(),
            circuit_reset_secs: default_circuit_reset_secs(),
            max_concurrent: default_max_concurrent(),
            requests_per_minute: None,
        }
    }
}

impl TranslationConfig {
    /// Per-attempt timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Circuit reset window as a duration.
    pub fn circuit_reset(&self) -> Duration {
        Duration::from_secs(self.circuit_reset_secs)
    }
}

/// Extraction provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct ExtractionConfig {
    /// Provider name: `rules` or `unavailable`
    #[serde(default = "default_extraction_provider")]
    #[setters(into)]
    provider: String,

    /// Confidence multiplier applied in degraded mode
    #[serde(default = "default_degraded_confidence_factor")]
    degraded_confidence_factor: f64,
}

fn default_extraction_provider() -> String {
    "rules".to_string()
}

fn default_degraded_confidence_factor() -> f64 {
    0.6
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider: default_extraction_provider(),
            degraded_confidence_factor: default_degraded_confidence_factor(),
        }
    }
}

/// Timeline composition settings.
#[derive(
    Debug, Clone, PartialEq, Default, Serialize, Deserialize, Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct TimelineConfig {
    /// Narrative displacement tolerated before an inversion is flagged
    #[serde(default)]
    inversion_tolerance: usize,
}

/// Quality gate thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct GateConfig {
    /// Lowest acceptable insight confidence
    #[serde(default = "default_min_confidence")]
    min_confidence: f64,

    /// Highest acceptable hallucination risk
    #[serde(default = "default_max_hallucination_risk")]
    max_hallucination_risk: f64,

    /// Lowest acceptable translation quality
    #[serde(default = "default_min_translation_quality")]
    min_translation_quality: f64,

    /// Lowest acceptable timeline consistency
    #[serde(default = "default_min_consistency")]
    min_consistency: f64,

    /// Insights that may fail the evidence check before the gate fails
    #[serde(default)]
    max_inconsistent_insights: usize,
}

fn default_min_confidence() -> f64 {
    0.55
}

fn default_max_hallucination_risk() -> f64 {
    0.45
}

fn default_min_translation_quality() -> f64 {
    0.5
}

fn default_min_consistency() -> f64 {
    0.5
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            max_hallucination_risk: default_max_hallucination_risk(),
            min_translation_quality: default_min_translation_quality(),
            min_consistency: default_min_consistency(),
            max_inconsistent_insights: 0,
        }
    }
}

/// Top-level Storylens configuration.
///
/// Loads from TOML files with a precedence system:
/// 1. Bundled defaults (storylens.toml shipped with the library)
/// 2. User config in home directory (~/.config/storylens/storylens.toml)
/// 3. User config in current directory (./storylens.toml)
///
/// # Example
///
/// ```no_run
/// use storylens_resilience::StorylensConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StorylensConfig::load()?;
/// println!("retries: {}", config.translation.retry_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StorylensConfig {
    /// Ingestion settings
    #[serde(default)]
    pub ingestion: IngestionConfig,
    /// Translation settings
    #[serde(default)]
    pub translation: TranslationConfig,
    /// Extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Timeline settings
    #[serde(default)]
    pub timeline: TimelineConfig,
    /// Quality gate thresholds
    #[serde(default)]
    pub gate: GateConfig,
}

impl StorylensConfig {
    /// Load configuration from a specific file path.
    ///
    /// Missing keys fall back to built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> StorylensResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                StorylensError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                StorylensError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text.
    #[instrument(skip(toml))]
    pub fn from_toml_str(toml: &str) -> StorylensResult<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| {
                StorylensError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                StorylensError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> StorylensResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/storylens/storylens.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("storylens").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| {
                StorylensError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                StorylensError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot drive a run.
    pub fn validate(&self) -> StorylensResult<()> {
        let probabilities = [
            ("gate.min_confidence", self.gate.min_confidence),
            ("gate.max_hallucination_risk", self.gate.max_hallucination_risk),
            ("gate.min_translation_quality", self.gate.min_translation_quality),
            ("gate.min_consistency", self.gate.min_consistency),
            (
                "extraction.degraded_confidence_factor",
                self.extraction.degraded_confidence_factor,
            ),
        ];
        for (key, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(
                    ConfigError::new(format!("{} must be within [0, 1], got {}", key, value))
                        .into(),
                );
            }
        }
        if self.extraction.degraded_confidence_factor == 0.0 {
            return Err(ConfigError::new(
                "extraction.degraded_confidence_factor must be greater than 0",
            )
            .into());
        }
        if self.translation.circuit_failure_threshold == 0 {
            return Err(
                ConfigError::new("translation.circuit_failure_threshold must be at least 1")
                    .into(),
            );
        }
        if self.translation.max_concurrent == 0 {
            return Err(ConfigError::new("translation.max_concurrent must be at least 1").into());
        }
        if self.translation.timeout_ms == 0 {
            return Err(ConfigError::new("translation.timeout_ms must be at least 1").into());
        }
        if self.translation.requests_per_minute == Some(0) {
            return Err(
                ConfigError::new("translation.requests_per_minute must be at least 1").into(),
            );
        }
        if self.ingestion.max_segment_chars < 16 {
            return Err(ConfigError::new("ingestion.max_segment_chars must be at least 16").into());
        }
        Ok(())
    }
}
