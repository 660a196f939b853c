//! Home window tabs.
//!
//! A [`TabManager`] keeps the ordered list of open tabs and which of them is
//! active. Tabs are opened from a table of [`TabDefinition`]s by id. The open
//! tabs can be saved as JSON and reopened later:
//!
//! ```text
//! [{"id": "home", "active": false}, {"id": "history", "active": true}]
//! ```
//!
//! When the manager is created with a home tab, that tab sits at index 0
//! for the manager's whole life and cannot be removed.

use serde::{Deserialize, Serialize};

use eez_outline_core::Signal;
use eez_outline_core::logging::targets;

use crate::error::TabError;

/// Prefix of the ids of tabs contributed by extension home sections.
pub const HOME_SECTION_PREFIX: &str = "homeSection_";

/// A tab that can be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabDefinition {
    pub id: String,
    pub title: String,
}

impl TabDefinition {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// An open tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    id: String,
    title: String,
    active: bool,
}

impl Tab {
    fn open(definition: &TabDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            title: definition.title.clone(),
            active: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Saved form of an open tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTab {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub active: bool,
}

/// Ordered open tabs with at most one active.
#[derive(Debug)]
pub struct TabManager {
    tabs: Vec<Tab>,
    definitions: Vec<TabDefinition>,
    has_home: bool,
    fallback: Option<String>,
    /// Emitted with the saved form of the tabs after every change.
    pub changed: Signal<Vec<SavedTab>>,
}

impl TabManager {
    /// A manager without a home tab. Every tab can be closed.
    pub fn new(definitions: Vec<TabDefinition>) -> Self {
        Self {
            tabs: Vec::new(),
            definitions,
            has_home: false,
            fallback: None,
            changed: Signal::new(),
        }
    }

    /// A manager whose first tab is `home`, open and active.
    pub fn with_home(home: TabDefinition, definitions: Vec<TabDefinition>) -> Self {
        let mut tab = Tab::open(&home);
        tab.active = true;
        let mut manager = Self::new(definitions);
        manager.tabs.push(tab);
        manager.has_home = true;
        manager
    }

    /// Tab opened by [`TabManager::restore_tabs`] when nothing was restored.
    pub fn set_fallback_tab(&mut self, id: impl Into<String>) {
        self.fallback = Some(id.into());
    }

    /// Open tabs in order.
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.active)
    }

    /// Open tab with `id`.
    pub fn find_tab(&self, id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    fn tab_index(&self, id: &str) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.id == id)
    }

    /// Definition for `id`. Home section tabs also match without their
    /// prefix.
    pub fn find_tab_definition(&self, id: &str) -> Option<&TabDefinition> {
        self.definitions.iter().find(|definition| {
            definition.id == id
                || definition
                    .id
                    .strip_prefix(HOME_SECTION_PREFIX)
                    .is_some_and(|section| section == id)
        })
    }

    /// Open the tab with `id`, reusing it if it is already open, and
    /// optionally make it active. Returns its index.
    pub fn open_tab_by_id(&mut self, id: &str, make_active: bool) -> Result<usize, TabError> {
        let index = match self.tab_index(id) {
            Some(index) => index,
            None => {
                let definition = self
                    .find_tab_definition(id)
                    .ok_or_else(|| TabError::NotFound(id.to_string()))?;
                let index = match self.tab_index(&definition.id) {
                    Some(index) => index,
                    None => {
                        let tab = Tab::open(definition);
                        tracing::debug!(target: targets::TABS, id = %tab.id, "tab opened");
                        self.tabs.push(tab);
                        self.tabs.len() - 1
                    }
                };
                if !make_active {
                    self.notify();
                }
                index
            }
        };
        if make_active {
            self.activate(index);
        }
        Ok(index)
    }

    /// Make the open tab with `id` active.
    pub fn make_active(&mut self, id: &str) -> Result<(), TabError> {
        let index = self
            .tab_index(id)
            .ok_or_else(|| TabError::NotFound(id.to_string()))?;
        self.activate(index);
        Ok(())
    }

    fn activate(&mut self, index: usize) {
        for (i, tab) in self.tabs.iter_mut().enumerate() {
            tab.active = i == index;
        }
        tracing::trace!(target: targets::TABS, index, "tab activated");
        self.notify();
    }

    /// Close the tab with `id`. Closing the active tab activates the tab
    /// that takes its place, or the previous one when it was the last.
    pub fn remove_tab(&mut self, id: &str) -> Result<Tab, TabError> {
        let index = self
            .tab_index(id)
            .ok_or_else(|| TabError::NotFound(id.to_string()))?;
        if self.has_home && index == 0 {
            return Err(TabError::PermanentTab(id.to_string()));
        }

        let tab = self.tabs.remove(index);
        tracing::debug!(target: targets::TABS, id = %tab.id, "tab removed");
        if tab.active && !self.tabs.is_empty() {
            self.activate(index.min(self.tabs.len() - 1));
        } else {
            self.notify();
        }
        Ok(tab)
    }

    /// Saved form of the open tabs.
    pub fn saved_tabs(&self) -> Vec<SavedTab> {
        self.tabs
            .iter()
            .map(|tab| SavedTab {
                id: tab.id.clone(),
                active: tab.active,
            })
            .collect()
    }

    /// Open tabs as JSON.
    pub fn save_tabs(&self) -> Result<String, TabError> {
        Ok(serde_json::to_string(&self.saved_tabs())?)
    }

    /// Reopen tabs saved by [`TabManager::save_tabs`]. Unknown ids are
    /// skipped. When no tab could be reopened the fallback tab is opened
    /// and made active.
    pub fn restore_tabs(&mut self, json: &str) -> Result<(), TabError> {
        let saved: Vec<SavedTab> = serde_json::from_str(json)?;
        let mut restored = 0;
        for tab in saved.iter().filter(|tab| !tab.id.is_empty()) {
            match self.open_tab_by_id(&tab.id, tab.active) {
                Ok(_) => restored += 1,
                Err(err) => tracing::warn!(target: targets::TABS, error = %err, "saved tab skipped"),
            }
        }

        if restored == 0 {
            if let Some(fallback) = self.fallback.clone() {
                self.open_tab_by_id(&fallback, true)?;
            }
        }
        Ok(())
    }

    fn notify(&self) {
        self.changed.emit(self.saved_tabs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definitions() -> Vec<TabDefinition> {
        vec![
            TabDefinition::new("workbench", "Workbench"),
            TabDefinition::new("history", "History"),
            TabDefinition::new("homeSection_instruments", "Instruments"),
        ]
    }

    fn manager() -> TabManager {
        TabManager::with_home(TabDefinition::new("home", "Home"), definitions())
    }

    fn ids(manager: &TabManager) -> Vec<&str> {
        manager.tabs().iter().map(Tab::id).collect()
    }

    #[test]
    fn test_home_tab_is_first_and_active() {
        let manager = manager();
        assert_eq!(ids(&manager), vec!["home"]);
        assert_eq!(manager.active_tab().map(Tab::id), Some("home"));
    }

    #[test]
    fn test_open_reuses_tabs() {
        let mut manager = manager();
        assert_eq!(manager.open_tab_by_id("history", false).unwrap(), 1);
        assert_eq!(manager.open_tab_by_id("history", true).unwrap(), 1);
        assert_eq!(manager.active_tab().map(Tab::title), Some("History"));
        assert_eq!(manager.open_tab_by_id("instruments", false).unwrap(), 2);
        assert_eq!(manager.tabs()[2].id(), "homeSection_instruments");
        assert!(matches!(
            manager.open_tab_by_id("nope", true),
            Err(TabError::NotFound(_))
        ));
    }

    #[test]
    fn test_home_tab_is_permanent() {
        let mut manager = manager();
        assert!(matches!(manager.remove_tab("home"), Err(TabError::PermanentTab(_))));
        assert_eq!(ids(&manager), vec!["home"]);
    }

    #[test]
    fn test_remove_active_tab_activates_neighbor() {
        let mut manager = manager();
        manager.open_tab_by_id("workbench", false).unwrap();
        manager.open_tab_by_id("history", true).unwrap();

        // last tab: the previous one becomes active
        manager.remove_tab("history").unwrap();
        assert_eq!(manager.active_tab().map(Tab::id), Some("workbench"));

        manager.open_tab_by_id("history", false).unwrap();
        manager.remove_tab("workbench").unwrap();
        assert_eq!(manager.active_tab().map(Tab::id), Some("history"));
    }

    #[test]
    fn test_without_home_every_tab_closes() {
        let mut manager = TabManager::new(definitions());
        manager.open_tab_by_id("workbench", true).unwrap();
        manager.remove_tab("workbench").unwrap();
        assert!(manager.tabs().is_empty());
        assert!(manager.active_tab().is_none());
    }

    #[test]
    fn test_save_and_restore() {
        let mut original = manager();
        original.open_tab_by_id("history", true).unwrap();
        let json = original.save_tabs().unwrap();
        assert_eq!(
            json,
            r#"[{"id":"home","active":false},{"id":"history","active":true}]"#
        );

        let mut restored = manager();
        restored.restore_tabs(&json).unwrap();
        assert_eq!(ids(&restored), vec!["home", "history"]);
        assert_eq!(restored.active_tab().map(Tab::id), Some("history"));
    }

    fn manager_with_fallback() -> TabManager {
        let mut manager = TabManager::new(definitions());
        manager.set_fallback_tab("workbench");
        manager
    }

    #[test]
    fn test_restore_skips_unknown_and_falls_back() {
        let mut manager = manager_with_fallback();
        manager
            .restore_tabs(r#"[{"id":"gone","active":true},{"active":false}]"#)
            .unwrap();
        assert_eq!(ids(&manager), vec!["workbench"]);
        assert_eq!(manager.active_tab().map(Tab::id), Some("workbench"));

        assert!(matches!(
            manager.restore_tabs("{"),
            Err(TabError::InvalidState(_))
        ));
    }

    #[test]
    fn test_changed_signal() {
        let mut manager = manager();
        manager.open_tab_by_id("history", true).unwrap();
        manager.make_active("home").unwrap();
        manager.remove_tab("history").unwrap();
        assert_eq!(manager.changed.emit_count(), 3);
    }
}
