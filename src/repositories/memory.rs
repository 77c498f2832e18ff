use super::{KeyValueStore, Modifier};
use crate::error::AppResult;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// 进程内存键值存储（无持久化、无淘汰）
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: Arc<RwLock<HashMap<String, V>>>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for MemoryStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

#[async_trait::async_trait]
impl<V> KeyValueStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        self.entries.read().await.get(key).cloned()
    }

    async fn insert_if_absent(&self, key: &str, value: V) -> bool {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return false;
        }
        entries.insert(key.to_string(), value);
        true
    }

    async fn modify(&self, key: &str, modifier: Modifier<'_, V>) -> AppResult<Option<V>> {
        let mut entries = self.entries.write().await;
        let Some(current) = entries.get(key) else {
            return Ok(None);
        };

        let next = modifier(current)?;
        entries.insert(key.to_string(), next.clone());
        Ok(Some(next))
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
