use serde::Serialize;

use crate::config::DEFAULT_THEME;
use crate::models::Theme;
use crate::store::Store;

/// Selected mode plus the last reported system preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemeState {
    pub mode: Theme,
    pub system_prefers_dark: bool,
}

impl ThemeState {
    /// Always `Light` or `Dark`.
    pub fn effective(&self) -> Theme {
        match self.mode {
            Theme::System if self.system_prefers_dark => Theme::Dark,
            Theme::System => Theme::Light,
            explicit => explicit,
        }
    }
}

impl Default for ThemeState {
    fn default() -> Self {
        Self {
            mode: DEFAULT_THEME,
            system_prefers_dark: false,
        }
    }
}

/// In-memory only; the mode is not persisted between runs.
pub struct ThemeStore {
    state: Store<ThemeState>,
}

impl Default for ThemeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeStore {
    pub fn new() -> Self {
        Self {
            state: Store::new(ThemeState::default()),
        }
    }

    pub fn store(&self) -> &Store<ThemeState> {
        &self.state
    }

    pub fn state(&self) -> ThemeState {
        self.state.get()
    }

    pub fn set_theme(&self, mode: Theme) {
        self.state.update(|s| s.mode = mode);
    }

    /// Flips the effective theme and pins it as an explicit mode.
    pub fn toggle_theme(&self) {
        self.state.update(|s| {
            s.mode = match s.effective() {
                Theme::Dark => Theme::Light,
                _ => Theme::Dark,
            };
        });
    }

    pub fn set_system_preference(&self, prefers_dark: bool) {
        self.state.update(|s| s.system_prefers_dark = prefers_dark);
    }

    pub fn effective_theme(&self) -> Theme {
        self.state.with(ThemeState::effective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_mode_follows_preference() {
        let theme = ThemeStore::new();
        assert_eq!(theme.state().mode, Theme::System);
        assert_eq!(theme.effective_theme(), Theme::Light);
        theme.set_system_preference(true);
        assert_eq!(theme.effective_theme(), Theme::Dark);
    }

    #[test]
    fn explicit_mode_ignores_preference() {
        let theme = ThemeStore::new();
        theme.set_system_preference(true);
        theme.set_theme(Theme::Light);
        assert_eq!(theme.effective_theme(), Theme::Light);
    }

    #[test]
    fn toggle_pins_the_opposite_of_effective() {
        let theme = ThemeStore::new();
        theme.set_system_preference(true);
        theme.toggle_theme();
        assert_eq!(theme.state().mode, Theme::Light);
        theme.toggle_theme();
        assert_eq!(theme.state().mode, Theme::Dark);
    }

    #[test]
    fn listeners_see_changes() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let theme = ThemeStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        theme.store().listen(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        theme.set_theme(Theme::Dark);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
