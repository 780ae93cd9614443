use tracing::{info, warn};

use crate::core::db::DocumentStore;
use crate::core::kv::KeyValue;
use crate::models::models::Theme;
use crate::mutations::Mutation;
use crate::store::Store;

impl<D: DocumentStore, S: KeyValue> Store<D, S> {
    /// Flips between light and dark and remembers the choice locally.
    /// Persisting is best-effort; the in-memory theme changes regardless.
    pub fn toggle_theme(&mut self) -> Theme {
        let theme = self.state().theme().toggled();
        self.set_theme(theme);
        theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if let Err(e) = self
            .storage
            .set(&self.config.theme_key, theme.as_str().as_bytes())
        {
            warn!(%theme, error = %e, "Failed to persist theme");
        }
        self.commit(Mutation::SetTheme(theme));
        info!(%theme, "Theme changed");
    }
}
