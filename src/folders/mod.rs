//! Admin chat folder maintenance.
//!
//! Keeps one Telegram folder listing every group and supergroup the account
//! administers, minus the chats the operator excluded.

mod dialogs;
mod filter;
mod records;
mod sync;

pub use dialogs::{DIALOG_PAGE_SIZE, DialogIter};
pub use filter::is_admin_group;
pub use records::{ADMIN_CHATS, ChatRecord, ChatRecords, EXCLUDED_CHATS, FolderStores};
pub use sync::{
    ExcludeReport, ExcludeTarget, FolderError, FolderSlot, FolderStatus, FolderSync,
    RebuildReport, ReloadOutcome, ReloadReport,
};
