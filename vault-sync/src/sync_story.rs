//! Full repository synchronization.
//!
//! ```text
//! IsModified ─► ExistsCloudRepository ─┬─► StoreLocalRepositoryToCloudAndQuit
//!                                      └─► DownloadCloudRepository
//!                                            └─► DecryptCloudRepository
//!                                                  └─► IsSameRepository
//!                                                        └─► StoreMergedRepositoryAndQuit
//! ```
//!
//! Whenever the story would need to ask the user something (set up the
//! cloud, enter a transfer code, choose between two unrelated
//! repositories) the [`SyncPolicy`] decides: an interactive sync ends with
//! a dialog and a `Needs*` outcome, an automatic sync ends with an error.

use async_trait::async_trait;
use vault_core::{
    merge_repositories, modification_fingerprint, same_repository, StepResult, Story, UiMode,
};

use crate::error::SyncError;
use crate::steps::{CloudCheck, CloudSession, SyncContext};
use crate::text::TextKey;
use crate::transfer_code::{format_transfer_code, generate_transfer_code, normalize_transfer_code};

/// How the story handles situations that need the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Ask the user through a dialog and stop.
    Interactive,
    /// Fail with an error; shown as a toast.
    Automatic,
}

impl SyncPolicy {
    /// The UI mode a story under this policy runs in.
    pub fn effective_mode(self, requested: UiMode) -> UiMode {
        match self {
            Self::Interactive => requested,
            Self::Automatic => UiMode::OnlyMessages,
        }
    }
}

/// Which repository to keep when local and cloud are unrelated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryChoice {
    /// Overwrite the cloud with the local repository.
    KeepLocal,
    /// Overwrite the local repository with the cloud.
    KeepCloud,
}

/// Input of a full sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRequest {
    /// Skip the sync when nothing changed since the last one.
    pub skip_unchanged: bool,
    /// Transfer code the user just entered.
    pub transfer_code: Option<String>,
    /// Answer to the repository choice dialog.
    pub choice: Option<RepositoryChoice>,
}

/// How a full sync ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing changed since the last sync.
    Unchanged,
    /// The cloud had no repository; the local one was uploaded.
    CreatedCloudRepository {
        /// Code to enter on other devices, formatted for display.
        transfer_code: String,
    },
    /// Local and cloud were merged.
    Merged {
        /// Whether the local repository changed.
        stored_local: bool,
        /// Whether the merged repository was uploaded.
        uploaded: bool,
    },
    /// The unrelated cloud repository was replaced by the local one.
    KeptLocal,
    /// The local repository was replaced by the unrelated cloud one.
    KeptCloud,
    /// Cloud storage must be set up first.
    NeedsCloudSetup,
    /// No known transfer code decrypts the cloud repository.
    NeedsTransferCode,
    /// Local and cloud are unrelated; the user must choose one.
    NeedsRepositoryChoice,
}

/// Steps of the full sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    /// Skip unchanged repositories.
    IsModified,
    /// Look for the cloud repository.
    ExistsCloudRepository,
    /// First upload from this device.
    StoreLocalRepositoryToCloudAndQuit,
    /// Fetch the cloud repository.
    DownloadCloudRepository,
    /// Open the cloud repository with the transfer codes.
    DecryptCloudRepository,
    /// Compare identities.
    IsSameRepository,
    /// Merge, store and upload.
    StoreMergedRepositoryAndQuit,
}

/// State threaded through the full sync.
#[derive(Debug, Default)]
pub struct SyncModel {
    /// What the caller asked for.
    pub request: SyncRequest,
    /// Cloud side state.
    pub session: CloudSession,
    /// How the story ended.
    pub outcome: Option<SyncOutcome>,
}

impl SyncModel {
    /// Model for `request`.
    pub fn new(request: SyncRequest) -> Self {
        Self {
            request,
            ..Self::default()
        }
    }
}

/// The full sync story.
#[derive(Debug, Clone)]
pub struct SyncStory {
    ctx: SyncContext,
    policy: SyncPolicy,
}

type SyncStepResult = Result<StepResult<SyncStep, SyncError>, SyncError>;

impl SyncStory {
    /// Story over `ctx` following `policy`.
    pub fn new(ctx: SyncContext, policy: SyncPolicy) -> Self {
        Self { ctx, policy }
    }

    /// The policy.
    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// End the story asking the user, or fail under the automatic policy.
    fn ask_user(
        &self,
        model: &mut SyncModel,
        outcome: SyncOutcome,
        text: TextKey,
        automatic_error: SyncError,
    ) -> SyncStepResult {
        match self.policy {
            SyncPolicy::Interactive => {
                model.outcome = Some(outcome);
                Ok(StepResult::done().with_message(self.ctx.text(text)))
            }
            SyncPolicy::Automatic => Err(automatic_error),
        }
    }

    async fn is_modified(&self, model: &mut SyncModel) -> SyncStepResult {
        if !model.request.skip_unchanged {
            return Ok(StepResult::next(SyncStep::ExistsCloudRepository));
        }
        let local = self.ctx.repositories.load().await?;
        let settings = self.ctx.settings.load().await?;
        if settings.last_sync_fingerprint == Some(modification_fingerprint(&local)) {
            tracing::debug!("repository unchanged since last sync");
            model.outcome = Some(SyncOutcome::Unchanged);
            return Ok(StepResult::done());
        }
        Ok(StepResult::next(SyncStep::ExistsCloudRepository))
    }

    async fn exists_cloud_repository(&self, model: &mut SyncModel) -> SyncStepResult {
        match model.session.check_cloud(&self.ctx).await? {
            CloudCheck::NotConfigured => self.ask_user(
                model,
                SyncOutcome::NeedsCloudSetup,
                TextKey::NeedsCloudSetup,
                SyncError::MustSyncFullyFirst,
            ),
            CloudCheck::Missing => Ok(StepResult::next(
                SyncStep::StoreLocalRepositoryToCloudAndQuit,
            )),
            CloudCheck::Present => Ok(StepResult::next(SyncStep::DownloadCloudRepository)),
        }
    }

    async fn store_local_to_cloud(&self, model: &mut SyncModel) -> SyncStepResult {
        let local = self.ctx.repositories.load().await?;
        let session = &mut model.session;

        let code = match (&model.request.transfer_code, &session.settings.transfer_code) {
            (Some(entered), _) => normalize_transfer_code(entered),
            (None, Some(current)) => current.clone(),
            (None, None) => normalize_transfer_code(&generate_transfer_code()?),
        };
        session.settings.adopt_transfer_code(&code);
        session.upload(&self.ctx, &local).await?;

        session.settings.last_sync_fingerprint = Some(modification_fingerprint(&local));
        self.ctx.settings.save(&session.settings).await?;

        let display = format_transfer_code(&code);
        tracing::info!("created cloud repository");
        let message = format!("{} {}", self.ctx.text(TextKey::TransferCodeCreated), display);
        model.outcome = Some(SyncOutcome::CreatedCloudRepository {
            transfer_code: display,
        });
        Ok(StepResult::done().with_message(message))
    }

    async fn download(&self, model: &mut SyncModel) -> SyncStepResult {
        model.session.download(&self.ctx).await?;
        Ok(StepResult::next(SyncStep::DecryptCloudRepository))
    }

    async fn decrypt(&self, model: &mut SyncModel) -> SyncStepResult {
        let entered = model.request.transfer_code.clone();
        if model.session.decrypt(&self.ctx, entered.as_deref()).await? {
            return Ok(StepResult::next(SyncStep::IsSameRepository));
        }
        self.ask_user(
            model,
            SyncOutcome::NeedsTransferCode,
            TextKey::NeedsTransferCode,
            SyncError::MustSyncFirst,
        )
    }

    async fn is_same_repository(&self, model: &mut SyncModel) -> SyncStepResult {
        let local = self.ctx.repositories.load().await?;
        let cloud = model
            .session
            .cloud_repository
            .as_ref()
            .ok_or_else(|| SyncError::Internal("compare before decrypt".into()))?;
        if same_repository(&local, cloud) {
            return Ok(StepResult::next(SyncStep::StoreMergedRepositoryAndQuit));
        }

        tracing::warn!(local = %local.id, cloud = %cloud.id, "repository identities differ");
        match model.request.choice {
            Some(RepositoryChoice::KeepLocal) => {
                model.session.upload(&self.ctx, &local).await?;
                self.finish(model, &local, SyncOutcome::KeptLocal).await
            }
            Some(RepositoryChoice::KeepCloud) => {
                let cloud = model
                    .session
                    .cloud_repository
                    .take()
                    .ok_or_else(|| SyncError::Internal("cloud repository vanished".into()))?;
                self.ctx.repositories.save(&cloud).await?;
                self.finish(model, &cloud, SyncOutcome::KeptCloud).await
            }
            None => self.ask_user(
                model,
                SyncOutcome::NeedsRepositoryChoice,
                TextKey::NeedsRepositoryChoice,
                SyncError::RepositoryMismatch,
            ),
        }
    }

    async fn store_merged(&self, model: &mut SyncModel) -> SyncStepResult {
        let cloud = model
            .session
            .cloud_repository
            .take()
            .ok_or_else(|| SyncError::Internal("merge before decrypt".into()))?;
        // Reload so edits made while the story ran are not lost.
        let local = self.ctx.repositories.load().await?;
        let merged = merge_repositories(&local, &cloud);

        let stored_local = merged != local;
        if stored_local {
            self.ctx.repositories.save(&merged).await?;
        }
        let uploaded = merged != cloud;
        if uploaded {
            model.session.upload(&self.ctx, &merged).await?;
        }

        tracing::info!(stored_local, uploaded, notes = merged.notes.len(), "synchronized");
        self.finish(
            model,
            &merged,
            SyncOutcome::Merged {
                stored_local,
                uploaded,
            },
        )
        .await
    }

    async fn finish(
        &self,
        model: &mut SyncModel,
        repo: &vault_types::Repository,
        outcome: SyncOutcome,
    ) -> SyncStepResult {
        model.session.settings.last_sync_fingerprint = Some(modification_fingerprint(repo));
        self.ctx.settings.save(&model.session.settings).await?;
        model.outcome = Some(outcome);
        Ok(StepResult::done().with_toast(self.ctx.text(TextKey::SyncSuccess)))
    }
}

#[async_trait]
impl Story for SyncStory {
    type Model = SyncModel;
    type Step = SyncStep;
    type Error = SyncError;

    async fn run_step(
        &self,
        step: SyncStep,
        model: &mut SyncModel,
        _mode: UiMode,
    ) -> SyncStepResult {
        match step {
            SyncStep::IsModified => self.is_modified(model).await,
            SyncStep::ExistsCloudRepository => self.exists_cloud_repository(model).await,
            SyncStep::StoreLocalRepositoryToCloudAndQuit => self.store_local_to_cloud(model).await,
            SyncStep::DownloadCloudRepository => self.download(model).await,
            SyncStep::DecryptCloudRepository => self.decrypt(model).await,
            SyncStep::IsSameRepository => self.is_same_repository(model).await,
            SyncStep::StoreMergedRepositoryAndQuit => self.store_merged(model).await,
        }
    }

    fn describe_error(&self, error: &SyncError) -> String {
        self.ctx.describe(error)
    }
}
