//! Built-in translation providers and config-driven provider selection.

use crate::extraction::{RuleExtractionProvider, UnavailableExtractionProvider};
use crate::language::HeuristicLanguageDetector;
use async_trait::async_trait;
use std::sync::Arc;
use storylens_core::Translation;
use storylens_error::{ConfigError, TranslationError, TranslationErrorKind};
use storylens_interface::{ExtractionProvider, LanguageDetector, TranslationProvider};
use storylens_resilience::{ExtractionConfig, TranslationConfig};
use tracing::debug;

const SPANISH_TO_ENGLISH: &[(&str, &str)] = &[
    ("historia", "story"),
    ("familia", "family"),
    ("conflicto", "conflict"),
    ("amor", "love"),
    ("guerra", "war"),
    ("memoria", "memory"),
    ("consejo", "council"),
    ("archivo", "archive"),
    ("verdad", "truth"),
];

const FRENCH_TO_ENGLISH: &[(&str, &str)] = &[
    ("histoire", "story"),
    ("famille", "family"),
    ("conflit", "conflict"),
    ("amour", "love"),
    ("guerre", "war"),
    ("memoire", "memory"),
    ("conseil", "council"),
    ("archive", "archive"),
    ("verite", "truth"),
];

/// Word lexicon translating `language` into English, if one exists.
pub fn lexicon_for(language: &str) -> Option<&'static [(&'static str, &'static str)]> {
    match language {
        "es" => Some(SPANISH_TO_ENGLISH),
        "fr" => Some(FRENCH_TO_ENGLISH),
        _ => None,
    }
}

fn lookup(lexicon: &'static [(&'static str, &'static str)], word: &str) -> Option<&'static str> {
    lexicon
        .iter()
        .find(|(source, _)| *source == word)
        .map(|(_, target)| *target)
}

/// Replace lexicon words, keeping surrounding punctuation.
fn replace_words(text: &str, lexicon: &'static [(&'static str, &'static str)]) -> String {
    text.split_whitespace()
        .map(|word| {
            let core = word.trim_matches(|c: char| !c.is_alphanumeric());
            match lookup(lexicon, &core.to_lowercase()) {
                Some(replacement) if !core.is_empty() => word.replacen(core, replacement, 1),
                _ => word.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Word-level Spanish and French to English translation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconTranslationProvider;

/// Quality the lexicon provider reports for its own output.
const LEXICON_REPORTED_QUALITY: f64 = 0.9;

#[async_trait]
impl TranslationProvider for LexiconTranslationProvider {
    fn name(&self) -> &str {
        "lexicon.v2"
    }

    fn supports(&self, source_language: &str, target_language: &str) -> bool {
        target_language == "en" && lexicon_for(source_language).is_some()
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<Translation, TranslationError> {
        let lexicon = match lexicon_for(source_language) {
            Some(lexicon) if target_language == "en" => lexicon,
            _ => {
                return Err(TranslationError::new(
                    TranslationErrorKind::UnsupportedLanguagePair {
                        provider: self.name().to_string(),
                        source: source_language.to_string(),
                        target: target_language.to_string(),
                    },
                ));
            }
        };
        let translated = replace_words(text, lexicon);
        debug!(source_language, "Lexicon translation complete");
        Ok(Translation {
            text: translated,
            quality_score: LEXICON_REPORTED_QUALITY,
        })
    }
}

/// Returns the source text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslationProvider;

#[async_trait]
impl TranslationProvider for IdentityTranslationProvider {
    fn name(&self) -> &str {
        "identity.v1"
    }

    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        _target_language: &str,
    ) -> Result<Translation, TranslationError> {
        Ok(Translation {
            text: text.to_string(),
            quality_score: 1.0,
        })
    }
}

/// Fails every call, forcing the degraded path.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableTranslationProvider;

#[async_trait]
impl TranslationProvider for UnavailableTranslationProvider {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn translate(
        &self,
        _text: &str,
        _source_language: &str,
        _target_language: &str,
    ) -> Result<Translation, TranslationError> {
        Err(TranslationError::new(TranslationErrorKind::ProviderFailure {
            provider: self.name().to_string(),
            message: "provider is configured as unavailable".to_string(),
        }))
    }
}

/// Providers chosen once at run start.
#[derive(Clone)]
pub struct ProviderSet {
    /// Per-segment language detector
    pub detector: Arc<dyn LanguageDetector>,
    /// Translation backend
    pub translator: Arc<dyn TranslationProvider>,
    /// Extraction backend
    pub extractor: Arc<dyn ExtractionProvider>,
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSet")
            .field("detector", &self.detector.name())
            .field("translator", &self.translator.name())
            .field("extractor", &self.extractor.name())
            .finish()
    }
}

impl ProviderSet {
    /// Resolve providers named in configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unknown provider or detector name.
    pub fn from_config(
        translation: &TranslationConfig,
        extraction: &ExtractionConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            detector: language_detector_from_config(translation)?,
            translator: translation_provider_from_config(translation)?,
            extractor: extraction_provider_from_config(extraction)?,
        })
    }
}

/// Resolve the configured language detector.
pub fn language_detector_from_config(
    config: &TranslationConfig,
) -> Result<Arc<dyn LanguageDetector>, ConfigError> {
    match config.language_detector().trim().to_lowercase().as_str() {
        "heuristic" | "heuristic.v2" => Ok(Arc::new(HeuristicLanguageDetector)),
        other => Err(ConfigError::new(format!(
            "Unknown translation.language_detector '{}'",
            other
        ))),
    }
}

/// Resolve the configured translation provider.
pub fn translation_provider_from_config(
    config: &TranslationConfig,
) -> Result<Arc<dyn TranslationProvider>, ConfigError> {
    match config.provider().trim().to_lowercase().as_str() {
        "lexicon" | "lexicon.v2" => Ok(Arc::new(LexiconTranslationProvider)),
        "identity" | "identity.v1" => Ok(Arc::new(IdentityTranslationProvider)),
        "unavailable" => Ok(Arc::new(UnavailableTranslationProvider)),
        other => Err(ConfigError::new(format!(
            "Unknown translation.provider '{}'",
            other
        ))),
    }
}

/// Resolve the configured extraction provider.
pub fn extraction_provider_from_config(
    config: &ExtractionConfig,
) -> Result<Arc<dyn ExtractionProvider>, ConfigError> {
    match config.provider().trim().to_lowercase().as_str() {
        "rules" | "rules.v1" => Ok(Arc::new(RuleExtractionProvider)),
        "unavailable" => Ok(Arc::new(UnavailableExtractionProvider)),
        other => Err(ConfigError::new(format!(
            "Unknown extraction.provider '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_words_keeps_punctuation() {
        assert_eq!(
            replace_words("La historia, la guerra.", SPANISH_TO_ENGLISH),
            "La story, la war."
        );
    }

    #[test]
    fn test_lookup_result_outlives_queried_word() {
        let translated = {
            let word = String::from("guerre");
            lookup(FRENCH_TO_ENGLISH, &word)
        };
        assert_eq!(translated, Some("war"));
        assert_eq!(lookup(FRENCH_TO_ENGLISH, "bateau"), None);
    }

    #[test]
    fn test_lexicon_supports_only_known_languages_into_english() {
        let provider = LexiconTranslationProvider;
        assert!(provider.supports("es", "en"));
        assert!(provider.supports("fr", "en"));
        assert!(!provider.supports("ja", "en"));
        assert!(!provider.supports("es", "fr"));
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let config = TranslationConfig::default().with_provider("oracle");
        assert!(translation_provider_from_config(&config).is_err());
    }
}
