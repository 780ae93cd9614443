use tracing_subscriber::EnvFilter;

// === Collections ===
pub const USERS_COLLECTION: &str = "users";
pub const POSTS_COLLECTION: &str = "posts";
pub const COMMENTS_COLLECTION: &str = "comments";

// === Local storage keys ===
pub const SESSION_KEY: &str = "session";
/// Where older front-ends kept the signed-in email.
pub const LEGACY_SESSION_KEY: &str = "loggedInUser";
pub const THEME_KEY: &str = "theme";

// === Validation limits ===
pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 2000;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 50;

// === Hashing work factor (Argon2id defaults) ===
pub const DEFAULT_HASH_ITERATIONS: u32 = 2;
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19 * 1024;

pub fn document_key(collection: &str, id: &str) -> String {
    format!("{}:{}", collection, id)
}

pub fn index_key(collection: &str) -> String {
    format!("{}_list", collection)
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|v| v.parse::<u32>().ok())
}

/// Runtime settings for a [`Store`](crate::store::Store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Argon2 passes over memory.
    pub hash_iterations: u32,
    /// Argon2 memory size in KiB.
    pub hash_memory_kib: u32,
    pub session_key: String,
    pub theme_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            hash_iterations: DEFAULT_HASH_ITERATIONS,
            hash_memory_kib: DEFAULT_HASH_MEMORY_KIB,
            session_key: SESSION_KEY.to_string(),
            theme_key: THEME_KEY.to_string(),
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by `FEEDSTORE_HASH_ITERATIONS` and
    /// `FEEDSTORE_HASH_MEMORY_KIB` when they parse.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hash_iterations: env_u32("FEEDSTORE_HASH_ITERATIONS")
                .unwrap_or(defaults.hash_iterations),
            hash_memory_kib: env_u32("FEEDSTORE_HASH_MEMORY_KIB")
                .unwrap_or(defaults.hash_memory_kib),
            ..defaults
        }
    }
}

/// Installs the fmt subscriber. `RUST_LOG` wins over the built-in filter.
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,feedstore=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        assert_eq!(document_key(USERS_COLLECTION, "abc"), "users:abc");
        assert_eq!(index_key(POSTS_COLLECTION), "posts_list");
    }

    #[test]
    fn defaults_use_argon2_work_factor() {
        let config = StoreConfig::default();
        assert_eq!(config.hash_iterations, 2);
        assert_eq!(config.hash_memory_kib, 19456);
        assert_eq!(config.session_key, "session");
        assert_eq!(config.theme_key, "theme");
    }
}
