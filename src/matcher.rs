use crate::model::Shortcut;
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32Str};

pub struct ShortcutMatcher {
    matcher: Matcher,
}

impl Default for ShortcutMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ShortcutMatcher {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
        }
    }

    /// Indices of shortcuts whose name or path matches `query`, best first.
    /// Ties keep display order. A blank query matches everything in order.
    pub fn filter(&mut self, query: &str, shortcuts: &[Shortcut]) -> Vec<usize> {
        if query.trim().is_empty() {
            return (0..shortcuts.len()).collect();
        }

        let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);
        let mut buf = Vec::new();

        let mut scored: Vec<(usize, u32)> = shortcuts
            .iter()
            .enumerate()
            .filter_map(|(i, shortcut)| {
                let name = pattern.score(Utf32Str::new(&shortcut.name, &mut buf), &mut self.matcher);
                let path = pattern.score(Utf32Str::new(&shortcut.path, &mut buf), &mut self.matcher);
                name.max(path).map(|score| (i, score))
            })
            .collect();

        // stable sort, so equal scores stay in display order
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.into_iter().map(|(i, _)| i).collect()
    }
}
