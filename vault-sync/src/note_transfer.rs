//! Single-note transfer.
//!
//! Pulls one note from the cloud or pushes one note to it without merging
//! the whole repository. The story requires a completed full sync: it never
//! creates a cloud repository and never asks for a transfer code.

use async_trait::async_trait;
use vault_core::{
    merge_single_note, same_repository, MergeDirection, MergeError, NoteMergeOutcome, StepResult,
    Story, UiMode,
};
use vault_types::NoteId;

use crate::error::SyncError;
use crate::steps::{CloudCheck, CloudSession, SyncContext};
use crate::text::TextKey;

/// Steps of the note transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteTransferStep {
    /// Look for the cloud repository.
    ExistsCloudRepository,
    /// Fetch the cloud repository.
    DownloadCloudRepository,
    /// Open the cloud repository with the stored transfer codes.
    DecryptCloudRepository,
    /// Compare identities.
    IsSameRepository,
    /// Check the cloud copy can serve the transfer.
    MergeNote,
    /// Merge, store locally and, for pushes, upload.
    StoreAndQuit,
}

/// State threaded through the note transfer.
#[derive(Debug)]
pub struct NoteTransferModel {
    /// The note to transfer.
    pub note_id: NoteId,
    /// Pull or push.
    pub direction: MergeDirection,
    /// Cloud side state.
    pub session: CloudSession,
    /// How the merge ended.
    pub outcome: Option<NoteMergeOutcome>,
}

impl NoteTransferModel {
    /// Model transferring `note_id` in `direction`.
    pub fn new(note_id: NoteId, direction: MergeDirection) -> Self {
        Self {
            note_id,
            direction,
            session: CloudSession::default(),
            outcome: None,
        }
    }
}

/// The note transfer story.
#[derive(Debug, Clone)]
pub struct NoteTransferStory {
    ctx: SyncContext,
}

type TransferStepResult = Result<StepResult<NoteTransferStep, SyncError>, SyncError>;

impl NoteTransferStory {
    /// Story over `ctx`.
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    async fn exists_cloud_repository(&self, model: &mut NoteTransferModel) -> TransferStepResult {
        match model.session.check_cloud(&self.ctx).await? {
            CloudCheck::Present if model.session.settings.transfer_code.is_some() => {
                Ok(StepResult::next(NoteTransferStep::DownloadCloudRepository))
            }
            _ => Err(SyncError::MustSyncFullyFirst),
        }
    }

    async fn download(&self, model: &mut NoteTransferModel) -> TransferStepResult {
        model.session.download(&self.ctx).await?;
        Ok(StepResult::next(NoteTransferStep::DecryptCloudRepository))
    }

    async fn decrypt(&self, model: &mut NoteTransferModel) -> TransferStepResult {
        if model.session.decrypt(&self.ctx, None).await? {
            Ok(StepResult::next(NoteTransferStep::IsSameRepository))
        } else {
            Err(SyncError::MustSyncFirst)
        }
    }

    async fn is_same_repository(&self, model: &mut NoteTransferModel) -> TransferStepResult {
        let local = self.ctx.repositories.load().await?;
        let same = model
            .session
            .cloud_repository
            .as_ref()
            .is_some_and(|cloud| same_repository(&local, cloud));
        if same {
            Ok(StepResult::next(NoteTransferStep::MergeNote))
        } else {
            Err(SyncError::MustSyncFirst)
        }
    }

    async fn merge_note(&self, model: &mut NoteTransferModel) -> TransferStepResult {
        let cloud = model
            .session
            .cloud_repository
            .as_ref()
            .ok_or_else(|| SyncError::Internal("merge before decrypt".into()))?;
        if cloud.find_note(model.note_id).is_none() {
            return Err(SyncError::NoteNotFound(model.note_id));
        }
        Ok(StepResult::next(NoteTransferStep::StoreAndQuit))
    }

    async fn store(&self, model: &mut NoteTransferModel) -> TransferStepResult {
        // Load, merge and save back to back so edits made while the cloud
        // was being fetched are not overwritten.
        let mut local = self.ctx.repositories.load().await?;
        let cloud = model
            .session
            .cloud_repository
            .as_mut()
            .ok_or_else(|| SyncError::Internal("store before decrypt".into()))?;

        let outcome = merge_single_note(&mut local, cloud, model.note_id, model.direction)
            .map_err(|e| match e {
                MergeError::MissingInCloud(id) | MergeError::MissingInLocal(id) => {
                    SyncError::NoteNotFound(id)
                }
            })?;
        model.outcome = Some(outcome);
        if outcome == NoteMergeOutcome::Unchanged {
            return Ok(StepResult::done().with_toast(self.ctx.text(TextKey::NoteUnchanged)));
        }
        self.ctx.repositories.save(&local).await?;

        let text = match model.direction {
            MergeDirection::Pull => TextKey::NotePulled,
            MergeDirection::Push => {
                let cloud = model
                    .session
                    .cloud_repository
                    .as_ref()
                    .ok_or_else(|| SyncError::Internal("upload before decrypt".into()))?;
                model.session.upload(&self.ctx, cloud).await?;
                TextKey::NotePushed
            }
        };
        tracing::info!(note = %model.note_id, direction = ?model.direction, "transferred note");
        Ok(StepResult::done().with_toast(self.ctx.text(text)))
    }
}

#[async_trait]
impl Story for NoteTransferStory {
    type Model = NoteTransferModel;
    type Step = NoteTransferStep;
    type Error = SyncError;

    async fn run_step(
        &self,
        step: NoteTransferStep,
        model: &mut NoteTransferModel,
        _mode: UiMode,
    ) -> TransferStepResult {
        match step {
            NoteTransferStep::ExistsCloudRepository => self.exists_cloud_repository(model).await,
            NoteTransferStep::DownloadCloudRepository => self.download(model).await,
            NoteTransferStep::DecryptCloudRepository => self.decrypt(model).await,
            NoteTransferStep::IsSameRepository => self.is_same_repository(model).await,
            NoteTransferStep::MergeNote => self.merge_note(model).await,
            NoteTransferStep::StoreAndQuit => self.store(model).await,
        }
    }

    fn describe_error(&self, error: &SyncError) -> String {
        self.ctx.describe(error)
    }
}
