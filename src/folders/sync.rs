//! Admin folder synchronization.
//!
//! The folder on the server is authoritative. Every mutating operation reads
//! it, edits a local copy and pushes the whole object back; the tracking
//! collection only mirrors the outcome for status reports.
//!
//! Mutating operations are serialized through a single-flight lock so two
//! commands in flight cannot overwrite each other's folder push.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::dialogs::DialogIter;
use super::filter::is_admin_group;
use super::records::{ChatRecord, FolderStores};
use crate::store::StoreError;
use crate::telegram::{AccessToken, ChatApi, ChatKind, Folder, RemoteFilter, Resolution, TelegramError};

/// Folder ids the server accepts for user folders.
const FOLDER_ID_RANGE: std::ops::Range<i32> = 2..256;

/// Errors raised by folder operations.
#[derive(Debug, Error)]
pub enum FolderError {
    #[error("No Folder ID available.")]
    NoFreeSlot,

    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where the admin folder lives, or where it would be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderSlot {
    Existing(Folder),
    Free(i32),
}

/// Result of a full rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    /// Whether the server accepted the folder push.
    pub pushed: bool,
    pub total_admin_groups: usize,
    pub in_folder: usize,
    pub excluded: usize,
    pub new_added: usize,
}

impl fmt::Display for RebuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "📁 <b>Admin Chats Folder {}</b>\n\n\
             <b>Total Admin Groups:</b> {}\n\
             <b>In Folder:</b> {}\n\
             <b>Excluded:</b> {}\n\
             <b>New Added:</b> {}",
            if self.pushed { "Updated" } else { "Failed" },
            self.total_admin_groups,
            self.in_folder,
            self.excluded,
            self.new_added,
        )
    }
}

/// Result of an incremental reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    pub pushed: bool,
    pub removed: usize,
    pub added: usize,
    pub in_folder: usize,
    pub excluded: usize,
}

impl fmt::Display for ReloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "🔄 <b>Admin Chats Folder {}</b>\n\n\
             <b>Removed:</b> {} (no longer admin/excluded)\n\
             <b>Added:</b> {} (new admin groups)\n\
             <b>Total in Folder:</b> {}\n\
             <b>Excluded:</b> {}",
            if self.pushed { "Reloaded" } else { "Failed" },
            self.removed,
            self.added,
            self.in_folder,
            self.excluded,
        )
    }
}

/// Outcome of a reload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Reloaded(ReloadReport),
    /// There is no folder to reload yet.
    FolderMissing,
}

/// The chat an exclusion applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludeTarget {
    pub chat_id: i64,
    pub title: String,
    pub kind: ChatKind,
}

/// Result of excluding a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludeReport {
    /// Whether the chat was in the folder and got removed.
    pub removed_from_folder: bool,
}

/// Read-only view of the folder and its collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderStatus {
    pub folder_found: bool,
    pub in_folder: usize,
    pub admin_records: usize,
    pub excluded_records: usize,
}

impl fmt::Display for FolderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "📊 <b>Admin Folder Status</b>\n\n\
             <b>Folder:</b> {}\n\
             <b>Chats in Folder:</b> {}\n\
             <b>Admin Chats in DB:</b> {}\n\
             <b>Excluded Chats:</b> {}",
            if self.folder_found { "Found" } else { "Not Found" },
            self.in_folder,
            self.admin_records,
            self.excluded_records,
        )
    }
}

/// Keeps the admin folder in line with the account's admin groups.
pub struct FolderSync {
    api: Arc<dyn ChatApi>,
    stores: FolderStores,
    title: String,
    lock: Mutex<()>,
}

impl FolderSync {
    #[must_use]
    pub fn new(api: Arc<dyn ChatApi>, stores: FolderStores, title: impl Into<String>) -> Self {
        Self {
            api,
            stores,
            title: title.into(),
            lock: Mutex::new(()),
        }
    }

    /// Title of the managed folder.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Finds the folder by exact title, or the lowest free folder id.
    ///
    /// # Errors
    ///
    /// [`FolderError::NoFreeSlot`] when every id is taken.
    pub async fn locate(&self) -> Result<FolderSlot, FolderError> {
        let filters = self.api.get_dialog_filters().await?;
        let mut taken = HashSet::new();

        for filter in filters {
            match filter {
                RemoteFilter::Default => {}
                RemoteFilter::Folder(folder) if folder.title == self.title => {
                    debug!("Found folder \"{}\" at id {}", folder.title, folder.id);
                    return Ok(FolderSlot::Existing(folder));
                }
                RemoteFilter::Folder(folder) | RemoteFilter::Chatlist(folder) => {
                    taken.insert(folder.id);
                }
            }
        }

        FOLDER_ID_RANGE
            .into_iter()
            .find(|id| !taken.contains(id))
            .map(FolderSlot::Free)
            .ok_or(FolderError::NoFreeSlot)
    }

    /// Rebuilds the folder from a full scan of the dialog list.
    ///
    /// The tracking collection is cleared first and refilled with every
    /// admin group seen, including excluded ones; excluded chats are never
    /// added to the folder and are stripped from it if present.
    ///
    /// # Errors
    ///
    /// Any failure aborts the run. Records written before the failure stay.
    pub async fn rebuild(&self) -> Result<RebuildReport, FolderError> {
        let _guard = self.lock.lock().await;

        let mut folder = match self.locate().await? {
            FolderSlot::Existing(folder) => folder,
            FolderSlot::Free(id) => {
                info!("Creating folder \"{}\" at id {}", self.title, id);
                Folder::new(id, self.title.clone())
            }
        };

        let excluded = self.stores.excluded_ids().await?;
        self.stores.admin_chats.drop_all().await?;

        let mut known: HashSet<AccessToken> = folder
            .include_peers
            .iter()
            .chain(&folder.exclude_peers)
            .chain(&folder.pinned_peers)
            .map(|peer| peer.access_token())
            .collect();

        let mut total_admin_groups = 0;
        let mut new_added = 0;
        let mut dialogs = DialogIter::new(self.api.as_ref());

        while let Some(chat) = dialogs.next().await? {
            if !is_admin_group(&chat) {
                continue;
            }
            total_admin_groups += 1;

            if excluded.contains(&chat.id) || known.contains(&chat.peer.access_token()) {
                self.stores.admin_chats.upsert(ChatRecord::from(&chat)).await?;
                continue;
            }

            let peer = self.api.resolve_peer(chat.id).await?;
            known.insert(peer.access_token());
            folder.include_peers.push(peer);
            self.stores.admin_chats.upsert(ChatRecord::from(&chat)).await?;
            new_added += 1;
            debug!("Adding {} ({}) to folder", chat.title, chat.id);
        }

        folder
            .include_peers
            .retain(|peer| !excluded.contains(&peer.marked_id()));

        let pushed = self.api.update_dialog_filter(&folder).await?;

        let report = RebuildReport {
            pushed,
            total_admin_groups,
            in_folder: folder.include_peers.len(),
            excluded: excluded.len(),
            new_added,
        };
        info!(
            "Folder rebuild: {} admin groups, {} in folder, {} new",
            report.total_admin_groups, report.in_folder, report.new_added
        );
        Ok(report)
    }

    /// Drops folder members that are no longer admin groups (or got
    /// excluded) and adds admin groups that are missing.
    ///
    /// # Errors
    ///
    /// Any failure aborts the run. Records written before the failure stay.
    pub async fn reload(&self) -> Result<ReloadOutcome, FolderError> {
        let _guard = self.lock.lock().await;

        let FolderSlot::Existing(mut folder) = self.locate().await? else {
            return Ok(ReloadOutcome::FolderMissing);
        };

        let excluded = self.stores.excluded_ids().await?;

        let mut stale = HashSet::new();
        for peer in &folder.include_peers {
            let keep = match self.api.resolve_chat(peer).await? {
                Resolution::Found(chat) => is_admin_group(&chat) && !excluded.contains(&chat.id),
                Resolution::Unreachable => false,
            };
            if !keep {
                debug!("Removing peer {} from folder", peer.marked_id());
                self.stores.admin_chats.delete(peer.marked_id()).await?;
                stale.insert(peer.access_token());
            }
        }

        let before = folder.include_peers.len();
        folder
            .include_peers
            .retain(|peer| !stale.contains(&peer.access_token()));
        let removed = before - folder.include_peers.len();

        let mut known: HashSet<AccessToken> = folder
            .include_peers
            .iter()
            .map(|peer| peer.access_token())
            .collect();

        let mut added = 0;
        let mut dialogs = DialogIter::new(self.api.as_ref());
        while let Some(chat) = dialogs.next().await? {
            if !is_admin_group(&chat)
                || excluded.contains(&chat.id)
                || known.contains(&chat.peer.access_token())
            {
                continue;
            }

            let peer = self.api.resolve_peer(chat.id).await?;
            known.insert(peer.access_token());
            folder.include_peers.push(peer);
            self.stores.admin_chats.upsert(ChatRecord::from(&chat)).await?;
            added += 1;
        }

        let pushed = self.api.update_dialog_filter(&folder).await?;

        info!("Folder reload: {} removed, {} added", removed, added);
        Ok(ReloadOutcome::Reloaded(ReloadReport {
            pushed,
            removed,
            added,
            in_folder: folder.include_peers.len(),
            excluded: excluded.len(),
        }))
    }

    /// Opts a chat out of the folder.
    ///
    /// Idempotent: excluding an excluded chat changes nothing. The folder is
    /// only pushed when the chat was actually in it.
    ///
    /// # Errors
    ///
    /// Store and transport failures are returned; callers decide whether to
    /// surface them.
    pub async fn exclude(&self, target: &ExcludeTarget) -> Result<ExcludeReport, FolderError> {
        let _guard = self.lock.lock().await;

        self.stores
            .excluded_chats
            .upsert(ChatRecord::new(target.chat_id, target.title.clone(), target.kind))
            .await?;
        self.stores.admin_chats.delete(target.chat_id).await?;

        let FolderSlot::Existing(mut folder) = self.locate().await? else {
            return Ok(ExcludeReport {
                removed_from_folder: false,
            });
        };

        let token = self
            .api
            .resolve_peer(target.chat_id)
            .await
            .ok()
            .map(|peer| peer.access_token());

        let before = folder.include_peers.len();
        folder.include_peers.retain(|peer| {
            peer.marked_id() != target.chat_id && token.as_ref() != Some(&peer.access_token())
        });
        let removed_from_folder = folder.include_peers.len() != before;

        if removed_from_folder {
            self.api.update_dialog_filter(&folder).await?;
        }

        Ok(ExcludeReport {
            removed_from_folder,
        })
    }

    /// Counts records and folder members without changing anything.
    ///
    /// # Errors
    ///
    /// Store and transport failures.
    pub async fn status(&self) -> Result<FolderStatus, FolderError> {
        let admin_records = self.stores.admin_chats.count().await?;
        let excluded_records = self.stores.excluded_chats.count().await?;

        let (folder_found, in_folder) = match self.locate().await {
            Ok(FolderSlot::Existing(folder)) => (true, folder.include_peers.len()),
            Ok(FolderSlot::Free(_)) | Err(FolderError::NoFreeSlot) => (false, 0),
            Err(e) => return Err(e),
        };

        Ok(FolderStatus {
            folder_found,
            in_folder,
            admin_records,
            excluded_records,
        })
    }
}

impl fmt::Debug for FolderSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderSync")
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Collection, MemoryCollection};
    use crate::telegram::PeerRef;
    use crate::testing::{basic_group, broadcast, entry, private, supergroup, FakeApi};

    const TITLE: &str = "Admin Chats";

    struct Harness {
        api: Arc<FakeApi>,
        stores: FolderStores,
        sync: FolderSync,
    }

    fn harness(api: FakeApi) -> Harness {
        let api = Arc::new(api);
        let stores = FolderStores::new(
            Arc::new(MemoryCollection::new()),
            Arc::new(MemoryCollection::new()),
        );
        let sync = FolderSync::new(api.clone(), stores.clone(), TITLE);
        Harness { api, stores, sync }
    }

    fn included_ids(api: &FakeApi) -> Vec<i64> {
        api.state()
            .folder(TITLE)
            .map(|f| f.include_peers.iter().map(PeerRef::marked_id).collect())
            .unwrap_or_default()
    }

    async fn exclude(h: &Harness, chat_id: i64) {
        h.stores
            .excluded_chats
            .upsert(ChatRecord::new(chat_id, "x", ChatKind::Supergroup))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rebuild_creates_folder_with_single_admin_group() {
        let h = harness(FakeApi::with_dialogs(vec![
            entry(supergroup(1, "ops", true), 20),
            entry(supergroup(2, "chatter", false), 10),
        ]));

        let report = h.sync.rebuild().await.unwrap();
        assert_eq!(report.total_admin_groups, 1);
        assert_eq!(report.new_added, 1);
        assert_eq!(report.in_folder, 1);
        assert!(report.pushed);

        let text = report.to_string();
        assert!(text.contains("Total Admin Groups:</b> 1"));
        assert!(text.contains("New Added:</b> 1"));

        let state = h.api.state();
        let folder = state.folder(TITLE).unwrap();
        assert_eq!(folder.id, 2);
        assert_eq!(folder.include_peers, vec![supergroup(1, "", true).peer]);
    }

    #[tokio::test]
    async fn test_rebuild_allocates_lowest_free_slot() {
        let h = harness(FakeApi::with_dialogs(vec![entry(supergroup(1, "ops", true), 1)]));
        {
            let mut state = h.api.state();
            state.filters.push(RemoteFilter::Folder(Folder::new(2, "Work")));
            state.filters.push(RemoteFilter::Chatlist(Folder::new(3, "Shared")));
            state.filters.push(RemoteFilter::Folder(Folder::new(5, "News")));
        }

        h.sync.rebuild().await.unwrap();
        assert_eq!(h.api.state().folder(TITLE).unwrap().id, 4);
    }

    #[tokio::test]
    async fn test_no_free_slot() {
        let h = harness(FakeApi::new());
        h.api.state().filters = FOLDER_ID_RANGE
            .map(|id| RemoteFilter::Folder(Folder::new(id, format!("f{id}"))))
            .collect();

        assert!(matches!(h.sync.rebuild().await, Err(FolderError::NoFreeSlot)));
        assert!(h.api.state().pushes.is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_filters_channels_and_private_chats() {
        let h = harness(FakeApi::with_dialogs(vec![
            entry(broadcast(1, "news", true), 50),
            entry(basic_group(2, "family", true), 40),
            entry(private(3, "alice"), 30),
            entry(supergroup(4, "ops", true), 20),
        ]));

        let report = h.sync.rebuild().await.unwrap();
        assert_eq!(report.total_admin_groups, 2);
        assert_eq!(included_ids(&h.api), vec![-2, supergroup(4, "", true).id]);
    }

    #[tokio::test]
    async fn test_rebuild_never_includes_excluded_chats() {
        let ops = supergroup(1, "ops", true);
        let h = harness(FakeApi::with_dialogs(vec![
            entry(ops.clone(), 20),
            entry(supergroup(2, "dev", true), 10),
        ]));
        exclude(&h, ops.id).await;

        // Pre-existing folder already (wrongly) holding the excluded chat.
        let mut existing = Folder::new(7, TITLE);
        existing.include_peers.push(ops.peer);
        h.api.state().filters.push(RemoteFilter::Folder(existing));

        let report = h.sync.rebuild().await.unwrap();
        assert_eq!(report.total_admin_groups, 2);
        assert_eq!(report.excluded, 1);
        assert_eq!(report.new_added, 1);
        assert!(!included_ids(&h.api).contains(&ops.id));

        // Counted and tracked, just not included.
        let tracked = h.stores.admin_chats.all().await.unwrap();
        assert!(tracked.iter().any(|r| r.id == ops.id));
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let h = harness(FakeApi::with_dialogs(vec![
            entry(supergroup(1, "a", true), 30),
            entry(basic_group(2, "b", true), 20),
            entry(supergroup(3, "c", false), 10),
        ]));

        let first = h.sync.rebuild().await.unwrap();
        let before = included_ids(&h.api);
        let second = h.sync.rebuild().await.unwrap();

        assert_eq!(first.new_added, 2);
        assert_eq!(second.new_added, 0);
        assert_eq!(included_ids(&h.api), before);
        assert_eq!(h.stores.admin_chats.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rebuild_keeps_existing_folder_lists_and_clears_stale_records() {
        let pinned = private(9, "me");
        let h = harness(FakeApi::with_dialogs(vec![entry(supergroup(1, "a", true), 1)]));
        let mut existing = Folder::new(3, TITLE);
        existing.pinned_peers.push(pinned.peer);
        existing.emoticon = Some("⭐".to_owned());
        h.api.state().filters.push(RemoteFilter::Folder(existing));
        h.stores
            .admin_chats
            .upsert(ChatRecord::new(-555, "gone", ChatKind::Group))
            .await
            .unwrap();

        h.sync.rebuild().await.unwrap();

        let state = h.api.state();
        let folder = state.folder(TITLE).unwrap();
        assert_eq!(folder.id, 3);
        assert_eq!(folder.pinned_peers, vec![pinned.peer]);
        assert_eq!(folder.emoticon.as_deref(), Some("⭐"));
        drop(state);

        let tracked: Vec<i64> = h
            .stores
            .admin_chats
            .all()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(tracked, vec![supergroup(1, "", true).id]);
    }

    #[tokio::test]
    async fn test_rebuild_reports_failed_push() {
        let h = harness(FakeApi::with_dialogs(vec![entry(supergroup(1, "a", true), 1)]));
        h.api.state().push_result = false;

        let report = h.sync.rebuild().await.unwrap();
        assert!(!report.pushed);
        assert!(report.to_string().contains("Admin Chats Folder Failed"));
        // Local records already reflect the intended state.
        assert_eq!(h.stores.admin_chats.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_aborts_on_transport_error_without_push() {
        let h = harness(FakeApi::new());
        h.api.state().fail_dialogs = true;

        assert!(matches!(
            h.sync.rebuild().await,
            Err(FolderError::Telegram(TelegramError::Connection(_)))
        ));
        assert!(h.api.state().pushes.is_empty());
    }

    #[tokio::test]
    async fn test_reload_without_folder() {
        let h = harness(FakeApi::with_dialogs(vec![entry(supergroup(1, "a", true), 1)]));
        assert_eq!(h.sync.reload().await.unwrap(), ReloadOutcome::FolderMissing);
        assert!(h.api.state().pushes.is_empty());
    }

    #[tokio::test]
    async fn test_reload_removes_demoted_chat() {
        let a = supergroup(1, "a", true);
        let h = harness(FakeApi::with_dialogs(vec![entry(a.clone(), 1)]));
        h.sync.rebuild().await.unwrap();
        assert_eq!(h.stores.admin_chats.count().await.unwrap(), 1);

        // A loses admin rights.
        {
            let mut state = h.api.state();
            let mut demoted = a.clone();
            demoted.is_admin = false;
            state.chats.insert(a.id, demoted.clone());
            state.dialogs = vec![entry(demoted, 1)];
        }

        let ReloadOutcome::Reloaded(report) = h.sync.reload().await.unwrap() else {
            panic!("folder should exist");
        };
        assert_eq!(report.removed, 1);
        assert_eq!(report.added, 0);
        assert!(report.to_string().contains("Removed:</b> 1"));
        assert!(included_ids(&h.api).is_empty());
        assert_eq!(h.stores.admin_chats.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reload_removes_unreachable_and_excluded_keeps_valid() {
        let keep = supergroup(1, "keep", true);
        let gone = supergroup(2, "gone", true);
        let opted_out = basic_group(3, "opted", true);
        let fresh = supergroup(4, "fresh", true);

        let h = harness(FakeApi::with_dialogs(vec![
            entry(keep.clone(), 40),
            entry(gone.clone(), 30),
            entry(opted_out.clone(), 20),
        ]));
        h.sync.rebuild().await.unwrap();

        {
            let mut state = h.api.state();
            state.unreachable.insert(gone.id);
            state.dialogs = vec![entry(keep.clone(), 40), entry(opted_out.clone(), 20), entry(fresh.clone(), 10)];
        }
        exclude(&h, opted_out.id).await;

        let ReloadOutcome::Reloaded(report) = h.sync.reload().await.unwrap() else {
            panic!("folder should exist");
        };
        assert_eq!(report.removed, 2);
        assert_eq!(report.added, 1);
        assert_eq!(report.in_folder, 2);
        assert_eq!(report.excluded, 1);
        assert_eq!(included_ids(&h.api), vec![keep.id, fresh.id]);

        let tracked: Vec<i64> = h
            .stores
            .admin_chats
            .all()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert!(tracked.contains(&keep.id));
        assert!(tracked.contains(&fresh.id));
        assert!(!tracked.contains(&gone.id));
        assert!(!tracked.contains(&opted_out.id));
    }

    #[tokio::test]
    async fn test_reload_never_removes_valid_members() {
        let chats: Vec<_> = (1..=5).map(|i| supergroup(i, "g", true)).collect();
        let h = harness(FakeApi::with_dialogs(
            chats.iter().cloned().zip(1..).map(|(c, top)| entry(c, top)).collect(),
        ));
        h.sync.rebuild().await.unwrap();
        let before = included_ids(&h.api);

        let ReloadOutcome::Reloaded(report) = h.sync.reload().await.unwrap() else {
            panic!("folder should exist");
        };
        assert_eq!(report.removed, 0);
        assert_eq!(report.added, 0);
        assert_eq!(included_ids(&h.api), before);
    }

    #[tokio::test]
    async fn test_exclude_removes_included_chat() {
        let a = supergroup(1, "a", true);
        let h = harness(FakeApi::with_dialogs(vec![entry(a.clone(), 1)]));
        h.sync.rebuild().await.unwrap();

        let target = ExcludeTarget {
            chat_id: a.id,
            title: a.title.clone(),
            kind: a.kind,
        };
        let report = h.sync.exclude(&target).await.unwrap();

        assert!(report.removed_from_folder);
        assert!(included_ids(&h.api).is_empty());
        assert_eq!(h.stores.admin_chats.count().await.unwrap(), 0);
        assert_eq!(h.stores.excluded_chats.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exclude_is_idempotent() {
        let a = supergroup(1, "a", true);
        let b = supergroup(2, "b", true);
        let h = harness(FakeApi::with_dialogs(vec![entry(a.clone(), 2), entry(b, 1)]));
        h.sync.rebuild().await.unwrap();

        let target = ExcludeTarget {
            chat_id: a.id,
            title: a.title.clone(),
            kind: a.kind,
        };
        h.sync.exclude(&target).await.unwrap();
        let folder_after_first = h.api.state().folder(TITLE).cloned();
        let pushes_after_first = h.api.state().pushes.len();

        let second = h.sync.exclude(&target).await.unwrap();
        assert!(!second.removed_from_folder);
        assert_eq!(h.stores.excluded_chats.count().await.unwrap(), 1);
        assert_eq!(h.api.state().folder(TITLE).cloned(), folder_after_first);
        assert_eq!(h.api.state().pushes.len(), pushes_after_first);
    }

    #[tokio::test]
    async fn test_exclude_without_folder_only_records() {
        let h = harness(FakeApi::new());
        let target = ExcludeTarget {
            chat_id: -42,
            title: "g".to_owned(),
            kind: ChatKind::Group,
        };

        let report = h.sync.exclude(&target).await.unwrap();
        assert!(!report.removed_from_folder);
        assert_eq!(h.stores.excluded_chats.count().await.unwrap(), 1);
        assert!(h.api.state().pushes.is_empty());
    }

    #[tokio::test]
    async fn test_status_is_read_only() {
        let h = harness(FakeApi::with_dialogs(vec![
            entry(supergroup(1, "a", true), 2),
            entry(supergroup(2, "b", true), 1),
        ]));

        let empty = h.sync.status().await.unwrap();
        assert!(!empty.folder_found);
        assert!(empty.to_string().contains("Not Found"));

        h.sync.rebuild().await.unwrap();
        exclude(&h, -99).await;
        let pushes = h.api.state().pushes.len();

        let status = h.sync.status().await.unwrap();
        assert_eq!(
            status,
            FolderStatus {
                folder_found: true,
                in_folder: 2,
                admin_records: 2,
                excluded_records: 1,
            }
        );
        assert_eq!(h.api.state().pushes.len(), pushes);
    }
}
