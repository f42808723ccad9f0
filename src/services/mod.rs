pub mod backup;
pub mod markdown;

pub use backup::{BackupCoordinator, BackupError, BackupReceipt, GistPayload};
pub use markdown::{CommonMarkRenderer, MarkdownRenderer};
