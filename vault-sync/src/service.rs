//! SyncService - the entry point applications call.
//!
//! Owns the collaborators, the feedback sink and the [`SyncGate`]. Every
//! operation acquires the gate, runs one story to completion and releases
//! the gate through its guard.

use std::sync::Arc;
use vault_core::{run_chain, Feedback, MergeDirection, NoFeedback, NoteMergeOutcome, UiMode};
use vault_types::NoteId;

use crate::error::SyncError;
use crate::gate::SyncGate;
use crate::note_transfer::{NoteTransferModel, NoteTransferStep, NoteTransferStory};
use crate::steps::SyncContext;
use crate::sync_story::{SyncModel, SyncOutcome, SyncPolicy, SyncRequest, SyncStep, SyncStory};

/// Runs synchronization stories one at a time.
#[derive(Clone)]
pub struct SyncService {
    ctx: SyncContext,
    feedback: Arc<dyn Feedback>,
    gate: SyncGate,
}

impl SyncService {
    /// Service over `ctx` without user feedback.
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx,
            feedback: Arc::new(NoFeedback),
            gate: SyncGate::new(),
        }
    }

    /// Send feedback to `feedback`.
    pub fn with_feedback(mut self, feedback: Arc<dyn Feedback>) -> Self {
        self.feedback = feedback;
        self
    }

    /// Share a gate with other services on the same repository.
    pub fn with_gate(mut self, gate: SyncGate) -> Self {
        self.gate = gate;
        self
    }

    /// The collaborators.
    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Whether a story is running.
    pub fn is_running(&self) -> bool {
        self.gate.is_active()
    }

    /// Full interactive sync.
    pub async fn synchronize(
        &self,
        request: SyncRequest,
        mode: UiMode,
    ) -> Result<SyncOutcome, SyncError> {
        self.run_sync(request, SyncPolicy::Interactive, mode).await
    }

    /// Background sync: skips unchanged repositories, never asks the user
    /// and reports problems as toasts.
    pub async fn auto_synchronize(&self) -> Result<SyncOutcome, SyncError> {
        let request = SyncRequest {
            skip_unchanged: true,
            ..SyncRequest::default()
        };
        self.run_sync(request, SyncPolicy::Automatic, UiMode::Silent)
            .await
    }

    /// Replace the local copy of a note with the cloud copy.
    pub async fn pull_note(
        &self,
        note_id: NoteId,
        mode: UiMode,
    ) -> Result<NoteMergeOutcome, SyncError> {
        self.run_transfer(note_id, MergeDirection::Pull, mode).await
    }

    /// Replace the cloud copy of a note with the local copy.
    pub async fn push_note(
        &self,
        note_id: NoteId,
        mode: UiMode,
    ) -> Result<NoteMergeOutcome, SyncError> {
        self.run_transfer(note_id, MergeDirection::Push, mode).await
    }

    async fn run_sync(
        &self,
        request: SyncRequest,
        policy: SyncPolicy,
        mode: UiMode,
    ) -> Result<SyncOutcome, SyncError> {
        let _guard = self.gate.try_acquire().ok_or(SyncError::AlreadyRunning)?;
        let story = SyncStory::new(self.ctx.clone(), policy);
        let mut model = SyncModel::new(request);

        let mode = policy.effective_mode(mode);
        tracing::debug!(?policy, ?mode, "starting sync");
        let chain = run_chain(
            &story,
            SyncStep::IsModified,
            &mut model,
            mode,
            self.feedback.as_ref(),
        )
        .await;

        if let Some(error) = chain.error {
            tracing::warn!(%error, "sync failed");
            return Err(error);
        }
        model
            .outcome
            .ok_or_else(|| SyncError::Internal("sync ended without outcome".into()))
    }

    async fn run_transfer(
        &self,
        note_id: NoteId,
        direction: MergeDirection,
        mode: UiMode,
    ) -> Result<NoteMergeOutcome, SyncError> {
        let _guard = self.gate.try_acquire().ok_or(SyncError::AlreadyRunning)?;
        let story = NoteTransferStory::new(self.ctx.clone());
        let mut model = NoteTransferModel::new(note_id, direction);

        let chain = run_chain(
            &story,
            NoteTransferStep::ExistsCloudRepository,
            &mut model,
            mode,
            self.feedback.as_ref(),
        )
        .await;

        if let Some(error) = chain.error {
            tracing::warn!(%error, %note_id, "note transfer failed");
            return Err(error);
        }
        model
            .outcome
            .ok_or_else(|| SyncError::Internal("transfer ended without outcome".into()))
    }
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("ctx", &self.ctx)
            .field("running", &self.is_running())
            .finish()
    }
}
