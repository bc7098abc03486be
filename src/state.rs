use crate::executor::Dispatcher;
use crate::matcher::ShortcutMatcher;
use crate::model::{Settings, SettingsPatch, Shortcut, ShortcutInput, ShortcutPatch};
use crate::store::RecordStore;
use crate::window::WindowControl;
use std::sync::Arc;

/// The surface the palette (or the CLI) talks to.
pub struct Launchpad {
    store: RecordStore,
    dispatcher: Dispatcher,
    window: Arc<dyn WindowControl>,
    matcher: ShortcutMatcher,
}

impl Launchpad {
    pub fn new(store: RecordStore, dispatcher: Dispatcher, window: Arc<dyn WindowControl>) -> Self {
        Self {
            store,
            dispatcher,
            window,
            matcher: ShortcutMatcher::new(),
        }
    }

    pub fn get_shortcuts(&self) -> &[Shortcut] {
        self.store.shortcuts()
    }

    pub fn add_shortcut(&mut self, input: ShortcutInput) -> &[Shortcut] {
        self.store.add(input)
    }

    /// Negative indices are out of range, like any other.
    pub fn delete_shortcut(&mut self, index: i64) -> &[Shortcut] {
        match usize::try_from(index) {
            Ok(index) => self.store.delete(index),
            Err(_) => self.store.shortcuts(),
        }
    }

    pub fn update_shortcut(&mut self, index: i64, patch: ShortcutPatch) -> &[Shortcut] {
        match usize::try_from(index) {
            Ok(index) => self.store.update(index, patch),
            Err(_) => self.store.shortcuts(),
        }
    }

    pub fn execute_shortcut(&self, shortcut: &Shortcut) {
        self.dispatcher.execute(shortcut);
    }

    pub fn search_fallback(&self, query: &str) {
        self.dispatcher.search_fallback(query);
    }

    pub fn get_settings(&self) -> &Settings {
        self.store.settings()
    }

    pub fn update_settings(&mut self, patch: SettingsPatch) -> &Settings {
        self.store.update_settings(patch)
    }

    pub fn request_hide_window(&self) {
        self.window.hide();
    }

    /// Matching indices, best first, capped at `maxResults`.
    pub fn find(&mut self, query: &str) -> Vec<usize> {
        let limit = self.store.settings().max_results as usize;
        let mut indices = self.matcher.filter(query, self.store.shortcuts());
        indices.truncate(limit);
        log::info!("Launchpad: query='{}', match_count={}", query, indices.len());
        indices
    }

    /// Runs the best match for `query`, or searches the web when nothing
    /// matches. A blank query with no shortcuts only hides.
    pub fn launch(&mut self, query: &str) {
        match self.find(query).first() {
            Some(&index) => self.dispatcher.execute(&self.store.shortcuts()[index]),
            None if !query.trim().is_empty() => self.dispatcher.search_fallback(query),
            None => self.request_hide_window(),
        }
    }
}
