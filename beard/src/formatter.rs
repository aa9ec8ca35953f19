//! Named formatters for paginated items.
//!
//! A pagination window outlives the handler that opened it, so it cannot hold
//! the formatting closure itself. It stores the formatter's name instead and
//! the name is resolved here on every render.
//!
//! Formatters are awaited, so rendering an item may do I/O. Plain functions
//! over a typed item can use [`FormatterRegistry::register_typed`].

use beard_core::BoxError;
use futures::future::{self, BoxFuture};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, PoisonError, RwLock},
};

/// Result of rendering one item.
pub type FormatterResult = Result<String, BoxError>;

/// Signature of a formatter: stored item in, message text out.
pub type FormatterFn = dyn Fn(Value) -> BoxFuture<'static, FormatterResult> + Send + Sync;

/// Formatters shared by every instance of a delegator.
#[derive(Default)]
pub struct FormatterRegistry {
    formatters: RwLock<HashMap<String, Arc<FormatterFn>>>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an awaitable formatter over raw stored values, replacing
    /// any previous one.
    pub fn register<F, Fut>(&self, name: impl Into<String>, formatter: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FormatterResult> + Send + 'static,
    {
        let formatter: Arc<FormatterFn> =
            Arc::new(move |value: Value| -> BoxFuture<'static, FormatterResult> {
                Box::pin(formatter(value))
            });
        let name = name.into();
        tracing::debug!(formatter = %name, "registered formatter");
        self.formatters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, formatter);
    }

    /// Registers a plain function over a typed item.
    ///
    /// Items that do not deserialize as `T` fail the render.
    pub fn register_typed<T, F>(&self, name: impl Into<String>, formatter: F)
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> String + Send + Sync + 'static,
    {
        self.register(name, move |value| {
            let rendered = serde_json::from_value::<T>(value)
                .map(&formatter)
                .map_err(BoxError::from);
            future::ready(rendered)
        });
    }

    pub fn get(&self, name: &str) -> Option<Arc<FormatterFn>> {
        self.formatters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formatters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let formatters = self
            .formatters
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = formatters.keys().collect();
        names.sort();
        f.debug_struct("FormatterRegistry")
            .field("formatters", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn typed_formatter_renders_and_rejects() {
        let registry = FormatterRegistry::new();
        registry.register_typed("bold", |n: u32| format!("<b>{n}</b>"));

        let bold = registry.get("bold").unwrap();
        assert_eq!(bold(json!(3)).await.unwrap(), "<b>3</b>");
        assert!(bold(json!("three")).await.is_err());
        assert!(registry.get("italic").is_none());
        assert!(registry.contains("bold"));
    }

    #[tokio::test]
    async fn awaitable_formatter_is_awaited() {
        let registry = FormatterRegistry::new();
        registry.register("lookup", |value: Value| async move {
            tokio::task::yield_now().await;
            let id = value.as_u64().ok_or("not an id")?;
            Ok::<_, BoxError>(format!("user #{id}"))
        });

        let lookup = registry.get("lookup").unwrap();
        assert_eq!(lookup(json!(42)).await.unwrap(), "user #42");
        assert_eq!(lookup(json!("x")).await.unwrap_err().to_string(), "not an id");
    }

    #[tokio::test]
    async fn later_registration_replaces() {
        let registry = FormatterRegistry::new();
        registry.register("f", |_| async { Ok::<_, BoxError>("one".to_owned()) });
        registry.register("f", |_| async { Ok::<_, BoxError>("two".to_owned()) });
        assert_eq!(registry.get("f").unwrap()(Value::Null).await.unwrap(), "two");
        assert_eq!(format!("{registry:?}"), "FormatterRegistry { formatters: [\"f\"] }");
    }
}
