//! Tracked set of discovered fix packages.

use crate::archive::{ArchiveKey, LocalInventory};
use crate::discovery::RemoteArtifact;

use super::state::{FixEntry, FixState};

/// Fix packages seen across passes, in discovery order.
///
/// Entries are identified by artifact name. A rediscovered name keeps its
/// entry (and its selection); only entries not yet downloaded are
/// reclassified against the local inventory.
#[derive(Debug, Default, Clone)]
pub struct FixTracker {
    entries: Vec<FixEntry>,
}

impl FixTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one discovery result into the set; returns the names added.
    ///
    /// A new entry is `AlreadyDownloaded` when the inventory holds its key
    /// (or, for unparsable names, its exact file name), otherwise `New`
    /// and selected when `auto_select` is set.
    pub fn merge_discovered(
        &mut self,
        artifacts: Vec<RemoteArtifact>,
        inventory: &LocalInventory,
        auto_select: bool,
    ) -> Vec<String> {
        for entry in &mut self.entries {
            if entry.state == FixState::New && is_present(entry, inventory) {
                entry.state = FixState::AlreadyDownloaded;
                entry.selected = false;
            }
        }

        let mut added = Vec::new();
        for artifact in artifacts {
            if self.position(&artifact.name).is_some() {
                continue;
            }
            let key = artifact.key();
            let mut entry = FixEntry {
                artifact,
                key,
                selected: false,
                state: FixState::New,
            };
            if is_present(&entry, inventory) {
                entry.state = FixState::AlreadyDownloaded;
            } else {
                entry.selected = auto_select;
                added.push(entry.artifact.name.clone());
            }
            self.entries.push(entry);
        }
        added
    }

    pub fn entries(&self) -> &[FixEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&FixEntry> {
        self.position(name).map(|i| &self.entries[i])
    }

    /// Toggle selection; returns false for an unknown name.
    pub fn set_selected(&mut self, name: &str, selected: bool) -> bool {
        match self.position(name) {
            Some(i) => {
                self.entries[i].selected = selected;
                true
            }
            None => false,
        }
    }

    /// Select or clear every entry that can still be downloaded.
    pub fn select_all(&mut self, selected: bool) {
        for entry in &mut self.entries {
            if entry.state.is_pending() {
                entry.selected = selected;
            }
        }
    }

    pub fn set_state(&mut self, name: &str, state: FixState) {
        if let Some(i) = self.position(name) {
            self.entries[i].state = state;
        }
    }

    /// Selected entries still waiting for a download, in tracked order.
    pub fn pending_selection(&self) -> Vec<RemoteArtifact> {
        self.entries
            .iter()
            .filter(|e| e.selected && e.state.is_pending())
            .map(|e| e.artifact.clone())
            .collect()
    }

    /// Keys of selected entries, used to restrict repackaging.
    pub fn selected_keys(&self) -> Vec<ArchiveKey> {
        self.entries
            .iter()
            .filter(|e| e.selected)
            .filter_map(|e| e.key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.artifact.name == name)
    }
}

fn is_present(entry: &FixEntry, inventory: &LocalInventory) -> bool {
    match &entry.key {
        Some(key) => inventory.contains_key(key),
        None => inventory.contains_file_name(&entry.artifact.name),
    }
}
