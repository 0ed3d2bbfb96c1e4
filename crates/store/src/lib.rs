//! Todo record stores for todoclaw.
//!
//! All stores implement `todoclaw_core::TodoStore`. Pick one at startup with
//! [`build_from_config`].

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryTodoStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTodoStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresTodoStore;

use std::sync::Arc;
use todoclaw_config::StoreConfig;
use todoclaw_core::TodoStore;
use todoclaw_core::error::StoreError;

/// Open the store described by `[store]` in the config.
pub async fn build_from_config(config: &StoreConfig) -> Result<Arc<dyn TodoStore>, StoreError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryTodoStore::new())),

        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(SqliteTodoStore::new(&config.url).await?)),

        #[cfg(feature = "postgres")]
        "postgres" => {
            let store = PostgresTodoStore::connect(&config.url).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }

        other => Err(StoreError::Storage(format!(
            "Store backend '{other}' is unknown or not compiled in"
        ))),
    }
}

/// Build a `LIKE` pattern matching `needle` anywhere, with wildcards in the
/// needle itself escaped by `\`.
#[cfg_attr(not(feature = "postgres"), allow(dead_code))]
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("market"), "%market%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[tokio::test]
    async fn build_memory_store() {
        let config = StoreConfig {
            backend: "memory".into(),
            url: String::new(),
        };
        let store = build_from_config(&config).await.unwrap();
        assert_eq!(store.name(), "in_memory");
    }

    #[tokio::test]
    async fn unknown_backend_is_an_error() {
        let config = StoreConfig {
            backend: "mongodb".into(),
            url: String::new(),
        };
        let err = build_from_config(&config).await.err().unwrap();
        assert!(err.to_string().contains("mongodb"));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn build_sqlite_store_in_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("todos.db");
        let config = StoreConfig {
            backend: "sqlite".into(),
            url: format!("sqlite://{}", path.display()),
        };

        let store = build_from_config(&config).await.unwrap();
        store.create("buy milk").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(path.exists());
    }
}
