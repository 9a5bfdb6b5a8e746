//! The pipeline orchestrator: drives the stage graph against a
//! [`GenerationClient`] and publishes progress through a
//! [`WorkflowStore`].
//!
//! # Stage graph
//!
//! ```text
//! start ─▶ 1 analyze ─▶ 2 suggest(n) ─▶ 3 render n previews (fan-out)
//!                                              │ fan-in
//!                                              ▼
//!                                      AwaitingSelection
//!                                              │ select
//!                                              ▼
//!          4 describe selected preview ─▶ 5 render Back / Left / Right (fan-out)
//!                                              │ fan-in + sort
//!                                              ▼
//!                                           Complete
//! ```
//!
//! Inbound operations ([`start`](Orchestrator::start),
//! [`select_candidate`](Orchestrator::select_candidate), ...) apply their
//! synchronous transition immediately and hand the network work to a
//! spawned task. Callers observe completion through
//! [`subscribe`](Orchestrator::subscribe) or by awaiting the returned
//! [`JoinHandle`].
//!
//! A fan-out step waits for every member call to settle and fails as a
//! whole if any member failed; sibling results are discarded. Every call
//! is bounded by [`OrchestratorConfig::call_timeout`].

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument as _;

use crate::client::GenerationClient;
use crate::prompt;
use crate::stage::{ViewLabel, WorkflowStage};
use crate::state::{PREVIEWING_LABEL, RENDERING_LABEL, SUGGESTING_LABEL, WorkflowState};
use crate::store::WorkflowStore;
use crate::types::{
    ConfigError, ErrorDescriptor, GenerationError, OrchestratorConfig, RunId, SourcePhoto,
    StyleCandidate, StyleSuggestion, TransitionError, ViewResult,
};

/// Coordinates one photo-to-hairstyles workflow at a time.
///
/// Must be used from within a Tokio runtime: stage work is spawned with
/// [`tokio::spawn`].
pub struct Orchestrator<C> {
    client: Arc<C>,
    store: Arc<WorkflowStore>,
    config: OrchestratorConfig,
}

impl<C> Orchestrator<C>
where
    C: GenerationClient + 'static,
{
    /// Create an orchestrator around a generation client.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn new(client: C, config: OrchestratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            client: Arc::new(client),
            store: Arc::new(WorkflowStore::new()),
            config,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Receive a snapshot after every published change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.store.subscribe()
    }

    /// Clone of the current state.
    #[must_use]
    pub fn snapshot(&self) -> WorkflowState {
        self.store.snapshot()
    }

    /// Install a new photo, discarding the current run from any stage.
    ///
    /// Work still in flight for the previous run keeps going at the
    /// network layer but its results are dropped.
    pub fn upload(&self, photo: SourcePhoto) -> RunId {
        self.store.update(|state| state.upload(photo));
        let run = self.store.current_run();
        tracing::info!(%run, "photo uploaded");
        run
    }

    /// Discard everything, including the photo, from any stage.
    pub fn reset(&self) -> RunId {
        self.store.update(WorkflowState::reset);
        let run = self.store.current_run();
        tracing::info!(%run, "workflow reset");
        run
    }

    /// Start stages 1–3 for the uploaded photo.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotIdle`] unless the workflow is idle
    /// and [`TransitionError::NoPhoto`] if nothing has been uploaded.
    pub fn start(&self) -> Result<JoinHandle<()>, TransitionError> {
        let (run, photo) = self.store.transition(|state| {
            let photo = state.begin_suggestions()?;
            Ok((state.run(), photo))
        })?;
        Ok(self.spawn_suggestions(run, photo))
    }

    /// Install `photo` and start stages 1–3 in one step.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotIdle`] unless the workflow is idle.
    /// Use [`upload`](Self::upload) to force a new run mid-flight.
    pub fn start_workflow(&self, photo: SourcePhoto) -> Result<JoinHandle<()>, TransitionError> {
        let (run, photo) = self.store.transition(|state| {
            if state.stage() != WorkflowStage::Idle {
                return Err(TransitionError::NotIdle(state.stage()));
            }
            state.upload(photo);
            let photo = state.begin_suggestions()?;
            Ok((state.run(), photo))
        })?;
        Ok(self.spawn_suggestions(run, photo))
    }

    /// Commit to the named candidate and start stages 4–5.
    ///
    /// The front view is published immediately from the candidate's
    /// preview; no network call happens before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotAwaitingSelection`] outside the
    /// selection stage and [`TransitionError::UnknownCandidate`] if the
    /// name is not one of the current run's candidates. Neither mutates
    /// the state.
    pub fn select_candidate(&self, name: &str) -> Result<JoinHandle<()>, TransitionError> {
        let (run, photo, selected) = self.store.transition(|state| {
            let (photo, selected) = state.select(name)?;
            Ok((state.run(), photo, selected))
        })?;
        tracing::info!(%run, style = %selected.name, "style selected");

        let task = self.task(run);
        let span = tracing::info_span!("views", %run);
        Ok(tokio::spawn(
            async move { task.render_views(photo, selected).await }.instrument(span),
        ))
    }

    /// Leave the completed view set and return to the candidate list.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotComplete`] unless the workflow is
    /// complete.
    pub fn go_back(&self) -> Result<(), TransitionError> {
        self.store.transition(WorkflowState::go_back)
    }

    fn spawn_suggestions(&self, run: RunId, photo: SourcePhoto) -> JoinHandle<()> {
        tracing::info!(%run, "run started");
        let task = self.task(run);
        let span = tracing::info_span!("suggestions", %run);
        tokio::spawn(async move { task.suggest(photo).await }.instrument(span))
    }

    fn task(&self, run: RunId) -> RunTask<C> {
        RunTask {
            run,
            client: Arc::clone(&self.client),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

/// Why a stage sequence stopped early.
enum Interrupt {
    /// A reset or upload replaced the run.
    Superseded,
    /// A generation call failed.
    Failed(GenerationError),
}

impl From<GenerationError> for Interrupt {
    fn from(err: GenerationError) -> Self {
        Self::Failed(err)
    }
}

/// Background work for one run.
struct RunTask<C> {
    run: RunId,
    client: Arc<C>,
    store: Arc<WorkflowStore>,
    config: OrchestratorConfig,
}

impl<C: GenerationClient> RunTask<C> {
    /// Stages 1–3, then publish or fail.
    async fn suggest(self, photo: SourcePhoto) {
        match self.analyze_and_preview(&photo).await {
            Ok(candidates) => {
                tracing::info!(count = candidates.len(), "candidates ready");
                self.store
                    .apply(self.run, |state| state.publish_candidates(candidates));
            }
            Err(Interrupt::Superseded) => {
                tracing::debug!("run superseded before candidates were ready");
            }
            Err(Interrupt::Failed(err)) => {
                self.report("suggestions", &err);
                let descriptor = ErrorDescriptor::from(&err);
                self.store
                    .apply(self.run, |state| state.fail_suggestions(descriptor));
            }
        }
    }

    /// Stages 4–5, then publish or fail.
    async fn render_views(self, photo: SourcePhoto, selected: StyleCandidate) {
        match self.describe_and_render(&photo, &selected).await {
            Ok(remaining) => {
                tracing::info!(style = %selected.name, "views ready");
                self.store
                    .apply(self.run, |state| state.complete_views(remaining));
            }
            Err(Interrupt::Superseded) => {
                tracing::debug!("run superseded before views were ready");
            }
            Err(Interrupt::Failed(err)) => {
                self.report("views", &err);
                let descriptor = ErrorDescriptor::from(&err);
                self.store
                    .apply(self.run, |state| state.fail_views(descriptor));
            }
        }
    }

    async fn analyze_and_preview(
        &self,
        photo: &SourcePhoto,
    ) -> Result<Vec<StyleCandidate>, Interrupt> {
        let image = photo.encoded();
        let count = self.config.candidate_count;

        let features = self
            .call("analyze_features", self.client.analyze_features(image))
            .await?;
        tracing::debug!(%features, "facial features analyzed");
        self.advance(|state| state.set_progress(SUGGESTING_LABEL))?;

        let suggestions = self
            .call("suggest_styles", self.client.suggest_styles(&features, count))
            .await?;
        let suggestions = check_suggestions(suggestions, count)?;
        self.advance(|state| state.set_progress(PREVIEWING_LABEL))?;

        let renders = suggestions.iter().map(|suggestion| {
            let prompt = prompt::front_view(&suggestion.description);
            async move {
                self.call("render_image", self.client.render_image(&prompt, image))
                    .await
            }
        });
        let previews = settle_all(renders).await?;

        Ok(suggestions
            .into_iter()
            .zip(previews)
            .map(|(suggestion, preview)| StyleCandidate::from_suggestion(suggestion, preview))
            .collect())
    }

    async fn describe_and_render(
        &self,
        photo: &SourcePhoto,
        selected: &StyleCandidate,
    ) -> Result<Vec<ViewResult>, Interrupt> {
        let canonical = self
            .call("describe_image", self.client.describe_image(&selected.preview))
            .await?;
        tracing::debug!(%canonical, "canonical description derived");
        let recorded = canonical.clone();
        self.advance(|state| {
            state.record_canonical_description(recorded);
            state.set_progress(RENDERING_LABEL);
        })?;

        let image = photo.encoded();
        let canonical = canonical.as_str();
        let renders = ViewLabel::REMAINING.map(|label| async move {
            let prompt = prompt::remaining_view(label, canonical);
            let image = self
                .call("render_image", self.client.render_image(&prompt, image))
                .await?;
            Ok::<_, GenerationError>(ViewResult { label, image })
        });
        Ok(settle_all(renders).await?)
    }

    /// Write an intermediate update, or stop if the run is stale.
    fn advance(&self, f: impl FnOnce(&mut WorkflowState)) -> Result<(), Interrupt> {
        if self.store.apply(self.run, f) {
            Ok(())
        } else {
            Err(Interrupt::Superseded)
        }
    }

    /// Await one client call under the configured timeout.
    async fn call<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, GenerationError>>,
    ) -> Result<T, GenerationError> {
        let timeout = self.config.call_timeout();
        tokio::time::timeout(timeout, call).await.unwrap_or_else(|_| {
            Err(GenerationError::Upstream(format!(
                "{operation} timed out after {}s",
                timeout.as_secs()
            )))
        })
    }

    fn report(&self, step: &'static str, err: &GenerationError) {
        if err.is_contract_violation() {
            tracing::warn!(
                run = %self.run,
                step,
                contract_violation = true,
                error = %err,
                "generation client broke its contract"
            );
        } else {
            tracing::warn!(run = %self.run, step, error = %err, "stage failed");
        }
    }
}

/// Fan-in: wait for every call to settle, then fail with the first error
/// in input order if any call failed.
async fn settle_all<T, F>(calls: impl IntoIterator<Item = F>) -> Result<Vec<T>, GenerationError>
where
    F: Future<Output = Result<T, GenerationError>>,
{
    join_all(calls).await.into_iter().collect()
}

/// Enforce the suggestion contract: exactly `count` uniquely named styles.
///
/// Surplus suggestions are dropped.
fn check_suggestions(
    mut suggestions: Vec<StyleSuggestion>,
    count: usize,
) -> Result<Vec<StyleSuggestion>, GenerationError> {
    if suggestions.len() < count {
        return Err(GenerationError::InsufficientResults {
            requested: count,
            received: suggestions.len(),
        });
    }
    if suggestions.len() > count {
        tracing::warn!(
            requested = count,
            received = suggestions.len(),
            "dropping surplus hairstyle suggestions"
        );
        suggestions.truncate(count);
    }

    let mut names = HashSet::with_capacity(count);
    for suggestion in &suggestions {
        if suggestion.name.trim().is_empty() {
            return Err(GenerationError::InvalidResponse(
                "hairstyle suggestion without a name".into(),
            ));
        }
        if !names.insert(suggestion.name.as_str()) {
            return Err(GenerationError::InvalidResponse(format!(
                "duplicate hairstyle name {:?}",
                suggestion.name
            )));
        }
    }
    Ok(suggestions)
}
