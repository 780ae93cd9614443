//! The application store: owns state, the database handle and local storage.
//!
//! Actions are split by feature across `users`, `auth`, `follow`, `posts`,
//! `comments` and `theme`; each one talks to the database first and commits
//! a mutation only from the confirmed result.

use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::core::db::DocumentStore;
use crate::core::errors::{StoreError, StoreResult};
use crate::core::hasher::CredentialHasher;
use crate::core::kv::KeyValue;
use crate::models::models::{Theme, User};
use crate::mutations::Mutation;
use crate::state::AppState;

/// Result of a read that logs and swallows failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// State now reflects the database.
    Fresh,
    /// The fetch failed; state kept its previous contents.
    Stale,
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Freshness::Fresh)
    }
}

pub struct Store<D, S> {
    pub(crate) db: D,
    pub(crate) storage: S,
    pub(crate) hasher: CredentialHasher,
    pub(crate) config: StoreConfig,
    state: AppState,
}

impl<D: DocumentStore, S: KeyValue> Store<D, S> {
    /// Builds a store, restoring the theme from local storage.
    pub fn new(db: D, storage: S, config: StoreConfig) -> StoreResult<Self> {
        let hasher = CredentialHasher::from_config(&config)?;
        let theme = load_theme(&storage, &config.theme_key);
        debug!(%theme, "Store initialised");

        Ok(Self {
            db,
            storage,
            hasher,
            config,
            state: AppState::with_theme(theme),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    pub(crate) fn commit(&mut self, mutation: Mutation) {
        self.state.commit(mutation);
    }

    pub(crate) fn require_current_user(&self) -> StoreResult<&User> {
        self.state.current_user().ok_or(StoreError::NotSignedIn)
    }
}

fn load_theme<S: KeyValue>(storage: &S, key: &str) -> Theme {
    match storage.get_string(key) {
        Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring stored theme");
            Theme::default()
        }),
        Ok(None) => Theme::default(),
        Err(e) => {
            warn!(error = %e, "Failed to read theme from local storage");
            Theme::default()
        }
    }
}
