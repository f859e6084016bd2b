//! Redis-backed store for deployments where several preview processes share state.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::info;

use super::{validate_key, PreferenceStore, StoreError};

/// Namespace prefix so preview keys never collide with other Redis tenants.
const KEY_PREFIX: &str = "cv:";

#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Redis preference store connected");
        Ok(Self { conn })
    }

    fn namespaced(key: &str) -> Result<String, StoreError> {
        validate_key(key)?;
        Ok(format!("{KEY_PREFIX}{key}"))
    }
}

#[async_trait]
impl PreferenceStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = Self::namespaced(key)?;
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(&key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = Self::namespaced(key)?;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(&key, value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = Self::namespaced(key)?;
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_key_has_prefix() {
        assert_eq!(
            RedisStore::namespaced("cv-max-pages").unwrap(),
            "cv:cv-max-pages"
        );
    }

    #[test]
    fn test_namespaced_rejects_invalid_key() {
        assert!(RedisStore::namespaced("cv max pages").is_err());
    }
}
