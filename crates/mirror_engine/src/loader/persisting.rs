use super::{Provider, Writer};
use crate::ResolveError;

/// Writes every value the inner provider produces before handing it back.
///
/// Nothing is written when the inner provider fails. A failed write fails the
/// whole load, so the cache never silently falls behind what callers were given.
pub struct PersistingProvider<P, W> {
    inner: P,
    writer: W,
}

impl<P, W> PersistingProvider<P, W> {
    pub fn new(inner: P, writer: W) -> Self {
        Self { inner, writer }
    }
}

#[async_trait::async_trait]
impl<Q, V, P, W> Provider<Q, V> for PersistingProvider<P, W>
where
    Q: Sync + 'static,
    V: Send + Sync + 'static,
    P: Provider<Q, V>,
    W: Writer<Q, V>,
{
    async fn load(&self, target: &Q) -> Result<V, ResolveError> {
        let value = self.inner.load(target).await?;
        self.writer.write(target, &value).await?;
        Ok(value)
    }
}
