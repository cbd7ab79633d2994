//! Interactive session state: the loaded groups, which one is selected and the
//! option toggles for the next update run. Front ends own a `Session` and pass
//! it explicitly; nothing here is global.

use chrono::NaiveDate;

use crate::contract::{GroupStore, WatchGroup};
use crate::error::{Result, WatchError};
use crate::update::UpdateOptions;

#[derive(Debug, Clone, Default)]
pub struct Session {
    groups: Vec<WatchGroup>,
    selected: Option<usize>,
    pub options: UpdateOptions,
    pub since: Option<NaiveDate>,
}

impl Session {
    /// Loads all groups and selects the first one, if any.
    pub fn load<G: GroupStore + ?Sized>(store: &G) -> Result<Self> {
        let groups = store.load_all()?;
        let selected = if groups.is_empty() { None } else { Some(0) };
        Ok(Self {
            groups,
            selected,
            ..Self::default()
        })
    }

    pub fn groups(&self) -> &[WatchGroup] {
        &self.groups
    }

    /// Selects a group by positional id or, failing that, by name.
    pub fn select_group(&mut self, key: &str) -> Result<&WatchGroup> {
        let key = key.trim();
        let idx = key
            .parse::<usize>()
            .ok()
            .filter(|id| *id < self.groups.len())
            .or_else(|| self.groups.iter().position(|g| g.name == key))
            .ok_or_else(|| WatchError::GroupNotFound(key.to_string()))?;
        self.selected = Some(idx);
        Ok(&self.groups[idx])
    }

    pub fn selected_group(&self) -> Option<&WatchGroup> {
        self.selected.and_then(|i| self.groups.get(i))
    }

    /// Re-reads the store. Group ids may be renumbered; the selection follows the
    /// previously selected group by name and is cleared if it disappeared.
    pub fn reload<G: GroupStore + ?Sized>(&mut self, store: &G) -> Result<()> {
        let previous = self.selected_group().map(|g| g.name.clone());
        self.groups = store.load_all()?;
        self.selected = previous.and_then(|name| self.groups.iter().position(|g| g.name == name));
        Ok(())
    }

    pub fn toggle_snapshot(&mut self) -> bool {
        self.options.snapshot = !self.options.snapshot;
        self.options.snapshot
    }

    pub fn toggle_clear_target(&mut self) -> bool {
        self.options.clear_target = !self.options.clear_target;
        self.options.clear_target
    }

    pub fn toggle_append_new(&mut self) -> bool {
        self.options.append_new = !self.options.append_new;
        self.options.append_new
    }
}
