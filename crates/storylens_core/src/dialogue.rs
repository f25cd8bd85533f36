//! Dialogue, monologue, and narrative-mode records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dominant narrative mode of a segment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeMode {
    /// Quoted or transcribed speech
    #[display("dialogue")]
    Dialogue,
    /// Physical action
    #[display("action")]
    Action,
    /// Description and background
    #[display("exposition")]
    Exposition,
    /// A character's inner voice
    #[display("monologue")]
    Monologue,
}

/// How a speaker was attributed to an utterance.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum AttributionMethod {
    /// `Name:` transcript prefix
    #[display("transcript_prefix")]
    TranscriptPrefix,
    /// `Name said` before the quote
    #[display("speaker_before_quote")]
    SpeakerBeforeQuote,
    /// `said Name` or `Name said` after the quote
    #[display("speaker_after_quote")]
    SpeakerAfterQuote,
    /// No speaker found
    #[display("unknown")]
    Unknown,
}

/// One attributed utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueTurn {
    /// Source segment
    pub segment_id: String,
    /// Speaker name, or `unknown`
    pub speaker: String,
    /// Spoken text without quotes
    pub utterance: String,
    /// How the speaker was found
    pub attribution_method: AttributionMethod,
}

/// A first-person reflective passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonologueSignal {
    /// Source segment
    pub segment_id: String,
    /// Sentence that carried the signal
    pub excerpt: String,
    /// Thought verbs found in the sentence
    pub cues: Vec<String>,
    /// Confidence in `(0, 1]`
    pub confidence: f64,
}

/// Mode assigned to a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMode {
    /// Segment
    pub segment_id: String,
    /// Dominant mode
    pub mode: NarrativeMode,
}

/// Share of dialogue against narration across the story.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NarrativeBalance {
    /// Share of segments whose dominant mode is dialogue
    pub dialogue_ratio: f64,
    /// `1 - dialogue_ratio`, or zero for an empty story
    pub narration_ratio: f64,
    /// Share of segments per mode; keys are mode names
    pub mode_ratios: BTreeMap<String, f64>,
}

/// Dialogue details for a whole story.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DialogueAnalysis {
    /// Attributed utterances in story order
    pub turns: Vec<DialogueTurn>,
    /// Internal monologue signals in story order
    pub monologues: Vec<MonologueSignal>,
    /// Dominant mode per segment
    pub segment_modes: Vec<SegmentMode>,
    /// Story-wide balance
    pub balance: NarrativeBalance,
}
