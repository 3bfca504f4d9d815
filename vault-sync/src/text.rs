//! User-facing text.
//!
//! Steps never build sentences themselves; they look texts up by key so a
//! host application can plug in its own translations.

/// Keys of all texts the synchronization stories show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKey {
    /// A full sync finished.
    SyncSuccess,
    /// Nothing changed since the last sync.
    SyncUnchanged,
    /// No cloud storage has been configured.
    NeedsCloudSetup,
    /// A new cloud repository was created; followed by the code.
    TransferCodeCreated,
    /// The cloud repository could not be decrypted with any known code.
    NeedsTransferCode,
    /// Local and cloud repositories are different repositories.
    NeedsRepositoryChoice,
    /// The cloud copy must be decrypted by a full sync first.
    MustSyncFirst,
    /// Cloud storage and a transfer code must be set up by a full sync.
    MustSyncFullyFirst,
    /// Local and cloud repositories do not match.
    RepositoryMismatch,
    /// A note was pulled from the cloud.
    NotePulled,
    /// A note was pushed to the cloud.
    NotePushed,
    /// A note was already identical on both sides.
    NoteUnchanged,
    /// A note is missing on one side.
    NoteNotFound,
    /// Cloud storage failed.
    CloudFailure,
    /// Encryption or decryption failed.
    CryptoFailure,
    /// Local storage failed.
    StoreFailure,
    /// Another sync is running.
    AlreadyRunning,
    /// Anything unexpected.
    InternalFailure,
}

/// Looks up user-facing text.
pub trait TextCatalog: Send + Sync {
    /// Text for `key`.
    fn text(&self, key: TextKey) -> String;
}

/// Built-in English texts.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishCatalog;

impl TextCatalog for EnglishCatalog {
    fn text(&self, key: TextKey) -> String {
        match key {
            TextKey::SyncSuccess => "Synchronization finished.",
            TextKey::SyncUnchanged => "Nothing to synchronize.",
            TextKey::NeedsCloudSetup => "Please set up a cloud storage before synchronizing.",
            TextKey::TransferCodeCreated => {
                "Your notes are now stored in the cloud. Enter this transfer code on your other devices:"
            }
            TextKey::NeedsTransferCode => {
                "The cloud repository could not be opened. Please enter the transfer code shown on the device that created it."
            }
            TextKey::NeedsRepositoryChoice => {
                "The cloud contains a different repository. Choose whether to keep the local or the cloud notes."
            }
            TextKey::MustSyncFirst => "Please synchronize the whole repository first.",
            TextKey::MustSyncFullyFirst => {
                "Please set up synchronization with a full sync first."
            }
            TextKey::RepositoryMismatch => "The cloud contains a different repository.",
            TextKey::NotePulled => "The note was updated from the cloud.",
            TextKey::NotePushed => "The note was sent to the cloud.",
            TextKey::NoteUnchanged => "The note is already up to date.",
            TextKey::NoteNotFound => "The note does not exist on both sides.",
            TextKey::CloudFailure => "The cloud storage could not be reached.",
            TextKey::CryptoFailure => "The repository could not be encrypted or decrypted.",
            TextKey::StoreFailure => "The local repository could not be read or written.",
            TextKey::AlreadyRunning => "A synchronization is already running.",
            TextKey::InternalFailure => "Synchronization failed unexpectedly.",
        }
        .to_string()
    }
}
