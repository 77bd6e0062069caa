//! Opaque selection UI for chains and tokens

use async_trait::async_trait;

/// Presents `options` and resolves with the chosen one, or `None` if dismissed
#[async_trait]
pub trait Picker<T: Clone + Send + Sync>: Send + Sync {
    async fn pick(&self, options: &[T]) -> Option<T>;
}
