//! Workflow stage and view label identifiers.
//!
//! [`WorkflowStage`] is the state machine's state set. [`ViewLabel`]
//! names the four rendered angles and owns the canonical order the
//! finished view set is published in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the workflow currently stands.
///
/// ```text
/// Idle ──start──▶ AnalyzingAndSuggesting ──ok──▶ AwaitingSelection
///  ▲                      │ err                     │ select    ▲
///  └──────────────────────┘                         ▼           │ err / go back
///                                             RenderingViews ───┤
///                                                   │ ok        │
///                                                   ▼           │
///                                                Complete ──────┘
/// ```
///
/// Reset or a new upload returns to `Idle` from anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStage {
    /// No run in progress. A photo may or may not be uploaded.
    #[default]
    Idle,
    /// Stages 1–3: analysis, suggestion, and preview rendering.
    AnalyzingAndSuggesting,
    /// Candidates are published and the caller must pick one.
    AwaitingSelection,
    /// Stages 4–5: consistency description and remaining views.
    RenderingViews,
    /// All four views are published.
    Complete,
}

impl WorkflowStage {
    /// All stages in forward order.
    pub const ALL: [Self; 5] = [
        Self::Idle,
        Self::AnalyzingAndSuggesting,
        Self::AwaitingSelection,
        Self::RenderingViews,
        Self::Complete,
    ];

    /// Display label for the stage.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AnalyzingAndSuggesting => "analyzing and suggesting",
            Self::AwaitingSelection => "awaiting selection",
            Self::RenderingViews => "rendering views",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One of the four viewing angles of a hairstyle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewLabel {
    /// Facing the camera. Comes from the selected candidate's preview.
    Front,
    /// From behind.
    Back,
    /// The subject's left profile.
    #[serde(rename = "Left Side")]
    LeftSide,
    /// The subject's right profile.
    #[serde(rename = "Right Side")]
    RightSide,
}

impl ViewLabel {
    /// Every label in canonical presentation order.
    pub const ALL: [Self; 4] = [Self::Front, Self::Back, Self::LeftSide, Self::RightSide];

    /// The labels rendered after selection, in canonical order.
    pub const REMAINING: [Self; 3] = [Self::Back, Self::LeftSide, Self::RightSide];

    /// Display label, e.g. `"Left Side"`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Front => "Front",
            Self::Back => "Back",
            Self::LeftSide => "Left Side",
            Self::RightSide => "Right Side",
        }
    }

    /// Position in the canonical order. The finished view set is
    /// sorted by this key and nothing else.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Front => 0,
            Self::Back => 1,
            Self::LeftSide => 2,
            Self::RightSide => 3,
        }
    }

    /// Short file-name friendly slug, e.g. `"left-side"`.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
            Self::LeftSide => "left-side",
            Self::RightSide => "right-side",
        }
    }
}

impl fmt::Display for ViewLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
