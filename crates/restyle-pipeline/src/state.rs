//! The published workflow state and its transitions.
//!
//! [`WorkflowState`] is what the presentation layer reads. Its fields are
//! private: every change goes through one of the transition methods below,
//! which are crate-private and only called by the orchestrator through
//! [`WorkflowStore`](crate::store::WorkflowStore). Each transition leaves
//! the state satisfying the run invariants:
//!
//! - candidates, selection, canonical description, and views never exist
//!   without a photo;
//! - the selection is always one of the current candidates;
//! - a finished view set holds each label once, in [`ViewLabel::ALL`] order;
//! - reset and upload discard every derived entity together.

use serde::Serialize;

use crate::stage::{ViewLabel, WorkflowStage};
use crate::types::{
    ErrorDescriptor, RunId, SourcePhoto, StyleCandidate, TransitionError, ViewResult,
};

/// Progress label published while stage 1 runs.
pub const ANALYZING_LABEL: &str = "Analyzing your facial features...";
/// Progress label published while stage 2 runs.
pub const SUGGESTING_LABEL: &str = "Dreaming up some new looks...";
/// Progress label published while stage 3 runs.
pub const PREVIEWING_LABEL: &str = "Generating style previews...";
/// Progress label published while stage 4 runs.
pub const DESCRIBING_LABEL: &str = "Ensuring style consistency...";
/// Progress label published while stage 5 runs.
pub const RENDERING_LABEL: &str = "Generating remaining views...";

/// Immutable snapshot of one workflow instance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowState {
    run: RunId,
    stage: WorkflowStage,
    in_flight: bool,
    progress_label: String,
    error: Option<ErrorDescriptor>,
    #[serde(skip)]
    photo: Option<SourcePhoto>,
    candidates: Vec<StyleCandidate>,
    selected: Option<StyleCandidate>,
    canonical_description: Option<String>,
    views: Vec<ViewResult>,
}

impl WorkflowState {
    /// The run this snapshot belongs to.
    #[must_use]
    pub const fn run(&self) -> RunId {
        self.run
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> WorkflowStage {
        self.stage
    }

    /// Whether generation calls are outstanding for this run.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Human-readable progress, empty when nothing is running.
    #[must_use]
    pub fn progress_label(&self) -> &str {
        &self.progress_label
    }

    /// The last stage failure, kept until the next successful
    /// transition or reset.
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorDescriptor> {
        self.error.as_ref()
    }

    /// The uploaded photo, if any.
    #[must_use]
    pub const fn photo(&self) -> Option<&SourcePhoto> {
        self.photo.as_ref()
    }

    /// Style candidates of the current run.
    #[must_use]
    pub fn candidates(&self) -> &[StyleCandidate] {
        &self.candidates
    }

    /// Look up a current candidate by name.
    #[must_use]
    pub fn candidate(&self, name: &str) -> Option<&StyleCandidate> {
        self.candidates.iter().find(|c| c.name == name)
    }

    /// The committed candidate, if one has been selected.
    #[must_use]
    pub const fn selected(&self) -> Option<&StyleCandidate> {
        self.selected.as_ref()
    }

    /// Description re-derived from the selected preview.
    #[must_use]
    pub fn canonical_description(&self) -> Option<&str> {
        self.canonical_description.as_deref()
    }

    /// Rendered views. While rendering this holds only the seeded front
    /// view; once complete it holds all four in canonical order.
    #[must_use]
    pub fn views(&self) -> &[ViewResult] {
        &self.views
    }

    // ───────────────────────── transitions ─────────────────────────

    /// Any state → `Idle`, discarding everything including the photo.
    pub(crate) fn reset(&mut self) {
        *self = Self {
            run: self.run.next(),
            ..Self::default()
        };
    }

    /// Any state → `Idle` with a fresh photo installed.
    pub(crate) fn upload(&mut self, photo: SourcePhoto) {
        self.reset();
        self.photo = Some(photo);
    }

    /// `Idle` → `AnalyzingAndSuggesting`. Returns the photo to analyze.
    pub(crate) fn begin_suggestions(&mut self) -> Result<SourcePhoto, TransitionError> {
        if self.stage != WorkflowStage::Idle {
            return Err(TransitionError::NotIdle(self.stage));
        }
        let photo = self.photo.clone().ok_or(TransitionError::NoPhoto)?;

        self.clear_selection();
        self.candidates.clear();
        self.error = None;
        self.stage = WorkflowStage::AnalyzingAndSuggesting;
        self.in_flight = true;
        self.progress_label = ANALYZING_LABEL.to_owned();
        Ok(photo)
    }

    pub(crate) fn set_progress(&mut self, label: &str) {
        label.clone_into(&mut self.progress_label);
    }

    /// `AnalyzingAndSuggesting` → `AwaitingSelection`.
    pub(crate) fn publish_candidates(&mut self, candidates: Vec<StyleCandidate>) {
        debug_assert_eq!(self.stage, WorkflowStage::AnalyzingAndSuggesting);
        self.candidates = candidates;
        self.stage = WorkflowStage::AwaitingSelection;
        self.settle();
    }

    /// `AnalyzingAndSuggesting` → `Idle`, discarding partial candidates.
    pub(crate) fn fail_suggestions(&mut self, error: ErrorDescriptor) {
        debug_assert_eq!(self.stage, WorkflowStage::AnalyzingAndSuggesting);
        self.candidates.clear();
        self.clear_selection();
        self.error = Some(error);
        self.stage = WorkflowStage::Idle;
        self.settle();
    }

    /// `AwaitingSelection` → `RenderingViews`, seeding the front view from
    /// the candidate's preview. Returns the photo and the selection.
    pub(crate) fn select(
        &mut self,
        name: &str,
    ) -> Result<(SourcePhoto, StyleCandidate), TransitionError> {
        if self.stage != WorkflowStage::AwaitingSelection {
            return Err(TransitionError::NotAwaitingSelection(self.stage));
        }
        let candidate = self
            .candidate(name)
            .cloned()
            .ok_or_else(|| TransitionError::UnknownCandidate(name.to_owned()))?;
        let photo = self.photo.clone().ok_or(TransitionError::NoPhoto)?;

        self.views = vec![ViewResult {
            label: ViewLabel::Front,
            image: candidate.preview.clone(),
        }];
        self.selected = Some(candidate.clone());
        self.canonical_description = None;
        self.error = None;
        self.stage = WorkflowStage::RenderingViews;
        self.in_flight = true;
        self.progress_label = DESCRIBING_LABEL.to_owned();
        Ok((photo, candidate))
    }

    pub(crate) fn record_canonical_description(&mut self, description: String) {
        debug_assert_eq!(self.stage, WorkflowStage::RenderingViews);
        self.canonical_description = Some(description);
    }

    /// `RenderingViews` → `Complete`: merge the seeded front view with the
    /// remaining views and publish them in canonical order.
    pub(crate) fn complete_views(&mut self, remaining: Vec<ViewResult>) {
        debug_assert_eq!(self.stage, WorkflowStage::RenderingViews);
        let mut views: Vec<ViewResult> = self
            .views
            .drain(..)
            .filter(|v| v.label == ViewLabel::Front)
            .chain(remaining)
            .collect();
        sort_views(&mut views);
        self.views = views;
        self.stage = WorkflowStage::Complete;
        self.settle();
    }

    /// `RenderingViews` → `AwaitingSelection`, keeping the candidates.
    pub(crate) fn fail_views(&mut self, error: ErrorDescriptor) {
        debug_assert_eq!(self.stage, WorkflowStage::RenderingViews);
        self.clear_selection();
        self.error = Some(error);
        self.stage = WorkflowStage::AwaitingSelection;
        self.settle();
    }

    /// `Complete` → `AwaitingSelection`, keeping the candidates.
    pub(crate) fn go_back(&mut self) -> Result<(), TransitionError> {
        if self.stage != WorkflowStage::Complete {
            return Err(TransitionError::NotComplete(self.stage));
        }
        self.clear_selection();
        self.error = None;
        self.stage = WorkflowStage::AwaitingSelection;
        Ok(())
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.canonical_description = None;
        self.views.clear();
    }

    fn settle(&mut self) {
        self.in_flight = false;
        self.progress_label.clear();
    }
}

/// Sort views by the fixed label order, independent of how they arrived.
pub fn sort_views(views: &mut [ViewResult]) {
    views.sort_by_key(|v| v.label.rank());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::tests::tiny_png;
    use crate::types::{EncodedImage, ErrorKind};

    fn photo() -> SourcePhoto {
        SourcePhoto::capture(tiny_png()).unwrap()
    }

    fn candidate(name: &str) -> StyleCandidate {
        StyleCandidate {
            name: name.to_owned(),
            description: format!("{name} description"),
            preview: EncodedImage::new("image/png", format!("{name}-front")),
        }
    }

    fn view(label: ViewLabel) -> ViewResult {
        ViewResult {
            label,
            image: EncodedImage::new("image/png", label.slug()),
        }
    }

    fn upstream(message: &str) -> ErrorDescriptor {
        ErrorDescriptor {
            kind: ErrorKind::Upstream,
            message: message.to_owned(),
        }
    }

    fn awaiting_selection() -> WorkflowState {
        let mut state = WorkflowState::default();
        state.upload(photo());
        state.begin_suggestions().unwrap();
        state.publish_candidates(vec![candidate("Textured Crop"), candidate("Bob")]);
        state
    }

    fn complete() -> WorkflowState {
        let mut state = awaiting_selection();
        state.select("Textured Crop").unwrap();
        state.record_canonical_description("crop".into());
        state.complete_views(ViewLabel::REMAINING.map(view).to_vec());
        state
    }

    #[test]
    fn default_state_is_idle_and_empty() {
        let state = WorkflowState::default();
        assert_eq!(state.stage(), WorkflowStage::Idle);
        assert!(!state.is_in_flight());
        assert!(state.photo().is_none());
        assert!(state.candidates().is_empty());
        assert!(state.views().is_empty());
    }

    #[test]
    fn start_requires_photo() {
        let mut state = WorkflowState::default();
        assert_eq!(state.begin_suggestions(), Err(TransitionError::NoPhoto));
        assert_eq!(state.stage(), WorkflowStage::Idle);
    }

    #[test]
    fn start_only_from_idle() {
        let mut state = awaiting_selection();
        let before = state.candidates().to_vec();
        assert_eq!(
            state.begin_suggestions(),
            Err(TransitionError::NotIdle(WorkflowStage::AwaitingSelection))
        );
        assert_eq!(state.candidates(), before.as_slice());
    }

    #[test]
    fn start_marks_busy_with_first_label() {
        let mut state = WorkflowState::default();
        state.upload(photo());
        state.begin_suggestions().unwrap();
        assert_eq!(state.stage(), WorkflowStage::AnalyzingAndSuggesting);
        assert!(state.is_in_flight());
        assert_eq!(state.progress_label(), ANALYZING_LABEL);
    }

    #[test]
    fn publishing_candidates_settles() {
        let state = awaiting_selection();
        assert_eq!(state.stage(), WorkflowStage::AwaitingSelection);
        assert_eq!(state.candidates().len(), 2);
        assert!(!state.is_in_flight());
        assert!(state.progress_label().is_empty());
    }

    #[test]
    fn failed_suggestions_return_to_idle_keeping_photo() {
        let mut state = WorkflowState::default();
        state.upload(photo());
        state.begin_suggestions().unwrap();
        state.fail_suggestions(upstream("boom"));
        assert_eq!(state.stage(), WorkflowStage::Idle);
        assert!(state.candidates().is_empty());
        assert!(state.photo().is_some());
        assert_eq!(state.error().unwrap().message, "boom");
    }

    #[test]
    fn retry_after_failure_clears_error() {
        let mut state = WorkflowState::default();
        state.upload(photo());
        state.begin_suggestions().unwrap();
        state.fail_suggestions(upstream("boom"));
        state.begin_suggestions().unwrap();
        assert!(state.error().is_none());
    }

    #[test]
    fn select_seeds_front_view() {
        let mut state = awaiting_selection();
        let (_, selected) = state.select("Textured Crop").unwrap();
        assert_eq!(selected.name, "Textured Crop");
        assert_eq!(state.stage(), WorkflowStage::RenderingViews);
        assert_eq!(state.views().len(), 1);
        assert_eq!(state.views()[0].label, ViewLabel::Front);
        assert_eq!(state.views()[0].image, selected.preview);
        assert_eq!(state.progress_label(), DESCRIBING_LABEL);
    }

    #[test]
    fn select_unknown_candidate_leaves_state_untouched() {
        let mut state = awaiting_selection();
        let err = state.select("Mohawk").unwrap_err();
        assert_eq!(err, TransitionError::UnknownCandidate("Mohawk".into()));
        assert_eq!(state.stage(), WorkflowStage::AwaitingSelection);
        assert!(state.selected().is_none());
        assert!(state.views().is_empty());
    }

    #[test]
    fn select_outside_awaiting_selection_rejected() {
        let mut state = WorkflowState::default();
        assert_eq!(
            state.select("Bob").unwrap_err(),
            TransitionError::NotAwaitingSelection(WorkflowStage::Idle)
        );
    }

    #[test]
    fn complete_views_sorts_canonically() {
        let mut state = awaiting_selection();
        state.select("Bob").unwrap();
        state.complete_views(vec![
            view(ViewLabel::RightSide),
            view(ViewLabel::Back),
            view(ViewLabel::LeftSide),
        ]);
        let labels: Vec<_> = state.views().iter().map(|v| v.label).collect();
        assert_eq!(labels, ViewLabel::ALL);
        assert_eq!(state.stage(), WorkflowStage::Complete);
        assert!(!state.is_in_flight());
    }

    #[test]
    fn failed_views_keep_candidates() {
        let mut state = awaiting_selection();
        state.select("Bob").unwrap();
        state.record_canonical_description("bob".into());
        state.fail_views(upstream("render failed"));
        assert_eq!(state.stage(), WorkflowStage::AwaitingSelection);
        assert_eq!(state.candidates().len(), 2);
        assert!(state.selected().is_none());
        assert!(state.views().is_empty());
        assert!(state.canonical_description().is_none());
        assert!(state.error().is_some());
    }

    #[test]
    fn go_back_from_complete() {
        let mut state = complete();
        state.go_back().unwrap();
        assert_eq!(state.stage(), WorkflowStage::AwaitingSelection);
        assert_eq!(state.candidates().len(), 2);
        assert!(state.selected().is_none());
        assert!(state.views().is_empty());
    }

    #[test]
    fn go_back_only_from_complete() {
        let mut state = awaiting_selection();
        assert_eq!(
            state.go_back(),
            Err(TransitionError::NotComplete(WorkflowStage::AwaitingSelection))
        );
    }

    #[test]
    fn reset_discards_everything_and_bumps_run() {
        let mut state = complete();
        let run = state.run();
        state.reset();
        assert!(state.run() > run);
        assert_eq!(state.stage(), WorkflowStage::Idle);
        assert!(state.photo().is_none());
        assert!(state.candidates().is_empty());
        assert!(state.selected().is_none());
        assert!(state.canonical_description().is_none());
        assert!(state.views().is_empty());
    }

    #[test]
    fn upload_replaces_photo_and_clears_run() {
        let mut state = complete();
        let run = state.run();
        state.upload(photo());
        assert!(state.run() > run);
        assert!(state.photo().is_some());
        assert!(state.candidates().is_empty());
        assert!(state.views().is_empty());
    }

    #[test]
    fn sort_views_uses_label_rank() {
        let mut views = vec![
            view(ViewLabel::LeftSide),
            view(ViewLabel::RightSide),
            view(ViewLabel::Front),
            view(ViewLabel::Back),
        ];
        sort_views(&mut views);
        let labels: Vec<_> = views.iter().map(|v| v.label).collect();
        assert_eq!(labels, ViewLabel::ALL);
    }
}
