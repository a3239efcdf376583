//! In-process [`Database`] used by tests, local development and the CLI's
//! dry runs.
//!
//! Follows the hosted store's semantics: nulls and empty objects are never
//! stored, deleting the last child removes the parent, and push keys sort in
//! creation order. One mutex guards the whole tree, so a transaction's update
//! function runs exactly once.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::paths::segments;
use super::{Database, DbError, TransactionResult, Transition, UpdateFn};

/// A JSON tree held in memory.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    root: Mutex<Value>,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing tree (fixtures, seed files).
    #[must_use]
    pub fn with_data(data: Value) -> Self {
        Self {
            root: Mutex::new(prune(data).unwrap_or_else(|| Value::Object(Map::new()))),
        }
    }

    /// A copy of the whole tree.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.root.lock().clone()
    }

    fn read_sync(&self, path: &str) -> Option<Value> {
        let root = self.root.lock();
        lookup(&root, path).cloned()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn read(&self, path: &str) -> Result<Option<Value>, DbError> {
        Ok(self.read_sync(path))
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), DbError> {
        let mut root = self.root.lock();
        store(&mut root, path, value);
        Ok(())
    }

    async fn patch(&self, path: &str, updates: BTreeMap<String, Value>) -> Result<(), DbError> {
        let mut root = self.root.lock();
        for (key, value) in updates {
            let full = join(path, &key);
            store(&mut root, &full, value);
        }
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, DbError> {
        let key = push_key();
        let mut root = self.root.lock();
        store(&mut root, &join(path, &key), value);
        Ok(key)
    }

    async fn delete(&self, path: &str) -> Result<(), DbError> {
        let mut root = self.root.lock();
        store(&mut root, path, Value::Null);
        Ok(())
    }

    async fn transaction(
        &self,
        path: &str,
        update: &UpdateFn<'_>,
    ) -> Result<TransactionResult, DbError> {
        let mut root = self.root.lock();
        let current = lookup(&root, path).cloned();
        match update(current.as_ref()) {
            Transition::Commit(value) => {
                store(&mut root, path, value);
                Ok(TransactionResult {
                    committed: true,
                    value: lookup(&root, path).cloned(),
                })
            }
            Transition::Abort => Ok(TransactionResult {
                committed: false,
                value: current,
            }),
        }
    }
}

/// Time-ordered key: uuid v7 in its hex form sorts by creation time.
fn push_key() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

fn join(base: &str, key: &str) -> String {
    let base = base.trim_matches('/');
    let key = key.trim_matches('/');
    if base.is_empty() {
        key.to_owned()
    } else if key.is_empty() {
        base.to_owned()
    } else {
        format!("{base}/{key}")
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(root, |node, seg| node.as_object()?.get(seg))
}

/// Drop nulls and empty objects, recursively. `None` means "nothing to store".
fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| prune(v).map(|v| (k, v)))
                .collect();
            (!kept.is_empty()).then_some(Value::Object(kept))
        }
        other => Some(other),
    }
}

fn store(root: &mut Value, path: &str, value: Value) {
    let segs: Vec<&str> = segments(path).collect();
    match prune(value) {
        Some(value) => insert_at(root, &segs, value),
        None => remove_at(root, &segs),
    }
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
}

fn insert_at(node: &mut Value, segs: &[&str], value: Value) {
    let Some((first, rest)) = segs.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map
            .entry((*first).to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        insert_at(child, rest, value);
    }
}

fn remove_at(node: &mut Value, segs: &[&str]) {
    let Some((first, rest)) = segs.split_first() else {
        *node = Value::Object(Map::new());
        return;
    };
    let Value::Object(map) = node else {
        return;
    };
    if rest.is_empty() {
        map.remove(*first);
        return;
    }
    let now_empty = match map.get_mut(*first) {
        Some(child) => {
            remove_at(child, rest);
            child.as_object().is_some_and(Map::is_empty)
        }
        None => false,
    };
    if now_empty {
        map.remove(*first);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_write_read_nested() {
        let db = MemoryDatabase::new();
        db.write("products/p1", json!({"name": "Mug", "stock": 3}))
            .await
            .unwrap();
        assert_eq!(db.read("products/p1/stock").await.unwrap(), Some(json!(3)));
        assert_eq!(db.read("products/p2").await.unwrap(), None);
        assert_eq!(db.read("products/p1/stock/deeper").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_prunes_empty_parents() {
        let db = MemoryDatabase::new();
        db.write("users/u1/cart/p1", json!({"quantity": 1}))
            .await
            .unwrap();
        db.delete("users/u1/cart/p1").await.unwrap();
        assert_eq!(db.read("users").await.unwrap(), None);
        db.delete("users/nobody").await.unwrap();
    }

    #[tokio::test]
    async fn test_nulls_are_not_stored() {
        let db = MemoryDatabase::new();
        db.write("a", json!({"b": null, "c": {}, "d": 1}))
            .await
            .unwrap();
        assert_eq!(db.read("a").await.unwrap(), Some(json!({"d": 1})));
        db.write("a", json!({})).await.unwrap();
        assert_eq!(db.read("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_patch_touches_only_named_children() {
        let db = MemoryDatabase::new();
        db.write("users/u1", json!({"name": "A", "phone": "1", "cart": {"p1": {"quantity": 1}}}))
            .await
            .unwrap();
        let mut updates = BTreeMap::new();
        updates.insert("name".to_owned(), json!("B"));
        updates.insert("phone".to_owned(), Value::Null);
        db.patch("users/u1", updates).await.unwrap();
        assert_eq!(
            db.read("users/u1").await.unwrap(),
            Some(json!({"name": "B", "cart": {"p1": {"quantity": 1}}}))
        );
    }

    #[tokio::test]
    async fn test_push_keys_are_ordered() {
        let db = MemoryDatabase::new();
        let first = db.push("orders", json!({"n": 1})).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = db.push("orders", json!({"n": 2})).await.unwrap();
        assert!(first < second);
        assert_eq!(
            db.read(&format!("orders/{second}/n")).await.unwrap(),
            Some(json!(2))
        );
    }

    #[tokio::test]
    async fn test_transaction_commit_and_abort() {
        let db = MemoryDatabase::with_data(json!({"products": {"p1": {"stock": 5}}}));
        let take = |n: i64| {
            move |current: Option<&Value>| match current.and_then(Value::as_i64) {
                Some(stock) if stock >= n => Transition::Commit(json!(stock - n)),
                _ => Transition::Abort,
            }
        };

        let result = db.transaction("products/p1/stock", &take(3)).await.unwrap();
        assert!(result.committed);
        assert_eq!(result.value, Some(json!(2)));

        let result = db.transaction("products/p1/stock", &take(3)).await.unwrap();
        assert!(!result.committed);
        assert_eq!(result.value, Some(json!(2)));

        let result = db.transaction("products/gone/stock", &take(1)).await.unwrap();
        assert!(!result.committed);
        assert_eq!(db.read("products/gone").await.unwrap(), None);
    }
}
