//! Configuration and provider resilience for Storylens.
//!
//! This crate provides:
//! - [`StorylensConfig`]: layered TOML configuration with validation
//! - [`CircuitBreakerRegistry`]: per-provider circuit breakers shared across runs
//! - [`ResilientTranslator`]: retry, timeout, rate limiting and bounded
//!   concurrency around a [`storylens_interface::TranslationProvider`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod circuit;
mod config;
mod translator;

pub use circuit::{CircuitBreakerRegistry, CircuitSettings, CircuitState};
pub use config::{
    ExtractionConfig, GateConfig, IngestionConfig, StorylensConfig, TimelineConfig,
    TranslationConfig,
};
pub use translator::{AttemptFailure, ResilientTranslator, RetryPolicy, TranslationAttempt};
