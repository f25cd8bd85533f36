//! Stage-aware narrative signals: beats, themes, arcs, conflict and emotion.

use serde::{Deserialize, Serialize};

/// Canonical narrative stage.
///
/// Stages are ordered: `Setup < Escalation < Climax < Resolution`.
///
/// # Examples
///
/// ```
/// use storylens_core::StoryStage;
///
/// assert!(StoryStage::Setup < StoryStage::Climax);
/// assert_eq!(StoryStage::for_position(1, 3), StoryStage::Setup);
/// assert_eq!(StoryStage::for_position(2, 3), StoryStage::Climax);
/// assert_eq!(StoryStage::for_position(3, 3), StoryStage::Resolution);
/// ```
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
pub enum StoryStage {
    /// Characters and stakes are introduced
    #[display("setup")]
    Setup,
    /// Tension rises
    #[display("escalation")]
    Escalation,
    /// Turning point
    #[display("climax")]
    Climax,
    /// Aftermath
    #[display("resolution")]
    Resolution,
}

impl StoryStage {
    /// All stages in narrative order.
    pub const ALL: [StoryStage; 4] = [
        StoryStage::Setup,
        StoryStage::Escalation,
        StoryStage::Climax,
        StoryStage::Resolution,
    ];

    /// Zero-based rank in narrative order.
    pub fn rank(&self) -> usize {
        match self {
            StoryStage::Setup => 0,
            StoryStage::Escalation => 1,
            StoryStage::Climax => 2,
            StoryStage::Resolution => 3,
        }
    }

    /// Stage at `rank`, saturating at `Resolution`.
    pub fn from_rank(rank: usize) -> Self {
        match rank {
            0 => StoryStage::Setup,
            1 => StoryStage::Escalation,
            2 => StoryStage::Climax,
            _ => StoryStage::Resolution,
        }
    }

    /// Stage for the one-based `position` of `total` items.
    ///
    /// Three or fewer items map to setup, climax, and resolution.
    /// Longer stories are split into quarters.
    pub fn for_position(position: usize, total: usize) -> Self {
        if total <= 3 {
            if position <= 1 {
                return StoryStage::Setup;
            }
            if position >= total {
                return StoryStage::Resolution;
            }
            return StoryStage::Climax;
        }
        let quarter = (total / 4).max(1);
        if position <= quarter {
            StoryStage::Setup
        } else if position <= quarter * 2 {
            StoryStage::Escalation
        } else if position <= quarter * 3 {
            StoryStage::Climax
        } else {
            StoryStage::Resolution
        }
    }

    /// String form used in records.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryStage::Setup => "setup",
            StoryStage::Escalation => "escalation",
            StoryStage::Climax => "climax",
            StoryStage::Resolution => "resolution",
        }
    }
}

/// A structurally significant stage marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    /// Stable identifier
    pub beat_id: String,
    /// Assigned stage
    pub stage: StoryStage,
    /// One-based position in story order
    pub narrative_order: usize,
    /// Events the beat was built from
    pub event_ids: Vec<String>,
    /// Summary taken from the event description
    pub summary: String,
    /// Segments supporting the beat; never empty
    pub evidence_segment_ids: Vec<String>,
    /// Confidence in `(0, 1]`
    pub confidence: f64,
}

/// Trend of a theme across the story.
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
pub enum ThemeDirection {
    /// First appearance
    #[display("emerging")]
    Emerging,
    /// More hits than the previous stage
    #[display("strengthening")]
    Strengthening,
    /// Same hits as the previous stage
    #[display("steady")]
    Steady,
    /// Fewer hits than the previous stage
    #[display("fading")]
    Fading,
}

/// A named theme observed in one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSignal {
    /// Stable identifier
    pub signal_id: String,
    /// Theme name
    pub label: String,
    /// Stage the signal belongs to
    pub stage: StoryStage,
    /// Strength in `[0, 1]`
    pub value: f64,
    /// Trend relative to the previous populated stage
    pub direction: ThemeDirection,
    /// Keywords that triggered the signal
    pub keywords: Vec<String>,
    /// Confidence in `(0, 1]`
    pub confidence: f64,
    /// Segments containing the theme keywords
    pub evidence_segment_ids: Vec<String>,
    /// Segments the signal was computed from
    pub provenance_segment_ids: Vec<String>,
}

/// One point of a character, conflict, or emotion trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcPoint {
    /// Lane: `character:<name>`, `conflict`, or `emotion`
    pub lane: String,
    /// State label, e.g. `active`, `rising`, `positive`
    pub label: String,
    /// Stage of the point
    pub stage: StoryStage,
    /// Value in `[0, 1]`
    pub value: f64,
    /// Confidence in `(0, 1]`
    pub confidence: f64,
    /// Supporting segments
    pub evidence_segment_ids: Vec<String>,
    /// Segments the point was computed from
    pub provenance_segment_ids: Vec<String>,
}

/// Change of conflict intensity entering a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictShift {
    /// `rising`, `falling`, or `steady`
    pub label: String,
    /// Stage the shift enters
    pub stage: StoryStage,
    /// Stage the shift leaves
    pub from_stage: StoryStage,
    /// Intensity of the entered stage in `[0, 1]`
    pub intensity: f64,
    /// Change against the previous stage
    pub delta: f64,
    /// Confidence in `(0, 1]`
    pub confidence: f64,
    /// Supporting segments
    pub evidence_segment_ids: Vec<String>,
    /// Segments the shift was computed from
    pub provenance_segment_ids: Vec<String>,
}

/// Emotional tone of one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionSignal {
    /// `positive`, `negative`, or `neutral`
    pub label: String,
    /// Stage
    pub stage: StoryStage,
    /// Valence in `[0, 1]`; `0.5` is neutral
    pub value: f64,
    /// Confidence in `(0, 1]`
    pub confidence: f64,
    /// Supporting segments
    pub evidence_segment_ids: Vec<String>,
    /// Segments the signal was computed from
    pub provenance_segment_ids: Vec<String>,
}
