//! Document store adapter.
//!
//! Collections hold JSON-object documents addressed by a store-assigned id.
//! Every document handed back to callers has its id merged in under `"id"`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::{document_key, index_key};
use crate::core::kv::KeyValue;

pub type Document = Map<String, Value>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch_all(&self, collection: &str) -> anyhow::Result<Vec<Document>>;

    /// Documents whose `field` equals `value`.
    async fn fetch_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> anyhow::Result<Vec<Document>>;

    async fn fetch_by_id(&self, collection: &str, id: &str) -> anyhow::Result<Option<Document>>;

    /// Stores a new document and returns its generated id.
    async fn insert(&self, collection: &str, data: Document) -> anyhow::Result<String>;

    /// Merges `patch` into an existing document. Fails if it does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Document) -> anyhow::Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn fetch_all(&self, collection: &str) -> anyhow::Result<Vec<Document>> {
        (**self).fetch_all(collection).await
    }

    async fn fetch_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> anyhow::Result<Vec<Document>> {
        (**self).fetch_where(collection, field, value).await
    }

    async fn fetch_by_id(&self, collection: &str, id: &str) -> anyhow::Result<Option<Document>> {
        (**self).fetch_by_id(collection, id).await
    }

    async fn insert(&self, collection: &str, data: Document) -> anyhow::Result<String> {
        (**self).insert(collection, data).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> anyhow::Result<()> {
        (**self).update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> anyhow::Result<()> {
        (**self).delete(collection, id).await
    }
}

/// Serializes a record into a document body. Records must serialize to an object.
pub fn encode<T: Serialize>(record: &T) -> anyhow::Result<Document> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("Expected a JSON object, got {}", other),
    }
}

pub fn decode<T: DeserializeOwned>(doc: Document) -> anyhow::Result<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// [`DocumentStore::fetch_all`] decoded into records.
pub async fn fetch_all_as<T, D>(db: &D, collection: &str) -> anyhow::Result<Vec<T>>
where
    T: DeserializeOwned,
    D: DocumentStore + ?Sized,
{
    db.fetch_all(collection).await?.into_iter().map(decode).collect()
}

/// [`DocumentStore::fetch_where`] decoded into records.
pub async fn fetch_where_as<T, D>(
    db: &D,
    collection: &str,
    field: &str,
    value: &Value,
) -> anyhow::Result<Vec<T>>
where
    T: DeserializeOwned,
    D: DocumentStore + ?Sized,
{
    db.fetch_where(collection, field, value)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}

fn with_id(id: &str, mut data: Document) -> Document {
    data.insert("id".to_string(), Value::String(id.to_string()));
    data
}

/// Document store laid out over a key-value backend.
///
/// Each document lives at `{collection}:{id}`; `{collection}_list` keeps the
/// ids in insertion order.
pub struct KvDocumentStore<K> {
    kv: K,
    writes: Mutex<()>,
}

impl<K: KeyValue> KvDocumentStore<K> {
    pub fn new(kv: K) -> Self {
        Self {
            kv,
            writes: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &K {
        &self.kv
    }

    fn ids(&self, collection: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.kv.get_json(&index_key(collection))?.unwrap_or_default())
    }

    fn load(&self, collection: &str, id: &str) -> anyhow::Result<Option<Document>> {
        let doc: Option<Document> = self.kv.get_json(&document_key(collection, id))?;
        Ok(doc.map(|d| with_id(id, d)))
    }
}

#[async_trait]
impl<K: KeyValue + Send + Sync> DocumentStore for KvDocumentStore<K> {
    async fn fetch_all(&self, collection: &str) -> anyhow::Result<Vec<Document>> {
        let mut docs = Vec::new();
        for id in self.ids(collection)? {
            if let Some(doc) = self.load(collection, &id)? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    async fn fetch_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> anyhow::Result<Vec<Document>> {
        let docs = self.fetch_all(collection).await?;
        Ok(docs
            .into_iter()
            .filter(|doc| doc.get(field) == Some(value))
            .collect())
    }

    async fn fetch_by_id(&self, collection: &str, id: &str) -> anyhow::Result<Option<Document>> {
        self.load(collection, id)
    }

    async fn insert(&self, collection: &str, mut data: Document) -> anyhow::Result<String> {
        let _guard = self.writes.lock().await;
        let id = Uuid::new_v4().to_string();
        data.remove("id");
        self.kv.set_json(&document_key(collection, &id), &data)?;

        let mut ids = self.ids(collection)?;
        ids.push(id.clone());
        self.kv.set_json(&index_key(collection), &ids)?;

        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> anyhow::Result<()> {
        let _guard = self.writes.lock().await;
        let key = document_key(collection, id);
        let mut doc: Document = self
            .kv
            .get_json(&key)?
            .ok_or_else(|| anyhow::anyhow!("No document to update: {}", key))?;

        for (field, value) in patch {
            if field != "id" {
                doc.insert(field, value);
            }
        }
        self.kv.set_json(&key, &doc)
    }

    async fn delete(&self, collection: &str, id: &str) -> anyhow::Result<()> {
        let _guard = self.writes.lock().await;
        self.kv.delete(&document_key(collection, id))?;

        let mut ids = self.ids(collection)?;
        ids.retain(|existing| existing != id);
        self.kv.set_json(&index_key(collection), &ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kv::MemoryKv;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn insert_assigns_fresh_ids_and_merges_them_on_read() {
        let db = KvDocumentStore::new(MemoryKv::new());
        let a = db.insert("posts", doc(json!({"content": "a"}))).await.unwrap();
        let b = db.insert("posts", doc(json!({"content": "b"}))).await.unwrap();
        assert_ne!(a, b);

        let all = db.fetch_all("posts").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["id"], json!(a));
        assert_eq!(all[1]["content"], json!("b"));
    }

    #[tokio::test]
    async fn fetch_where_filters_by_equality() {
        let db = KvDocumentStore::new(MemoryKv::new());
        db.insert("comments", doc(json!({"idPost": "p1", "content": "x"}))).await.unwrap();
        db.insert("comments", doc(json!({"idPost": "p2", "content": "y"}))).await.unwrap();

        let hits = db.fetch_where("comments", "idPost", &json!("p1")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["content"], json!("x"));
    }

    #[tokio::test]
    async fn update_merges_fields_and_requires_the_document() {
        let db = KvDocumentStore::new(MemoryKv::new());
        let id = db.insert("users", doc(json!({"email": "a@b.c", "userName": "A"}))).await.unwrap();

        db.update("users", &id, doc(json!({"userName": "B"}))).await.unwrap();
        let user = db.fetch_by_id("users", &id).await.unwrap().unwrap();
        assert_eq!(user["email"], json!("a@b.c"));
        assert_eq!(user["userName"], json!("B"));

        assert!(db.update("users", "missing", doc(json!({"x": 1}))).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_document_and_index_entry() {
        let db = KvDocumentStore::new(MemoryKv::new());
        let keep = db.insert("posts", doc(json!({"content": "keep"}))).await.unwrap();
        let gone = db.insert("posts", doc(json!({"content": "gone"}))).await.unwrap();

        db.delete("posts", &gone).await.unwrap();
        db.delete("posts", "never-existed").await.unwrap();

        let ids: Vec<Value> = db
            .fetch_all("posts")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!(keep)]);
        assert!(db.fetch_by_id("posts", &gone).await.unwrap().is_none());
    }

    #[test]
    fn encode_rejects_non_objects() {
        assert!(encode(&"just a string").is_err());
        assert!(encode(&json!({"a": 1})).is_ok());
    }
}
