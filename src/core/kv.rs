//! Key-value backends.
//!
//! [`KeyValue`] is the byte-level contract shared by durable local storage
//! (session marker, theme) and [`KvDocumentStore`](crate::core::db::KvDocumentStore).

use std::collections::HashMap;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub trait KeyValue {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        self.set(key, &serde_json::to_vec(value)?)
    }

    fn get_string(&self, key: &str) -> anyhow::Result<Option<String>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes)?)),
            None => Ok(None),
        }
    }
}

/// Process-local backend. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValue for MemoryKv {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| anyhow::anyhow!("lock poisoned: {}", e))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| anyhow::anyhow!("lock poisoned: {}", e))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| anyhow::anyhow!("lock poisoned: {}", e))?;
        entries.remove(key);
        Ok(())
    }
}

/// Spin key-value store, for builds running as a Spin component.
pub struct SpinKv {
    store: spin_sdk::key_value::Store,
}

impl SpinKv {
    pub fn open_default() -> anyhow::Result<Self> {
        let store = spin_sdk::key_value::Store::open_default()
            .map_err(|e| anyhow::anyhow!("KV store must exist: {}", e))?;
        Ok(Self { store })
    }

    pub fn open(label: &str) -> anyhow::Result<Self> {
        let store = spin_sdk::key_value::Store::open(label)
            .map_err(|e| anyhow::anyhow!("Failed to open KV store {}: {}", label, e))?;
        Ok(Self { store })
    }
}

impl KeyValue for SpinKv {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.store.get(key)?)
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        Ok(self.store.set(key, value)?)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        Ok(self.store.delete(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_kv_round_trips_json() {
        let kv = MemoryKv::new();
        kv.set_json("list", &vec!["a".to_string(), "b".to_string()]).unwrap();

        let list: Option<Vec<String>> = kv.get_json("list").unwrap();
        assert_eq!(list, Some(vec!["a".to_string(), "b".to_string()]));

        kv.delete("list").unwrap();
        assert!(kv.get("list").unwrap().is_none());
        assert!(kv.is_empty());
    }

    #[test]
    fn missing_keys_read_as_none() {
        let kv = MemoryKv::new();
        assert!(kv.get_string("theme").unwrap().is_none());
        assert!(kv.get_json::<String>("session").unwrap().is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let kv = MemoryKv::new();
        kv.set("broken", b"{not json").unwrap();
        assert!(kv.get_json::<Vec<String>>("broken").is_err());
    }
}
