use std::fmt;

use mirror_logging::mirror_debug;

use super::{Loader, Provider};
use crate::ResolveError;

/// Tries each loader in order and returns the first value found.
///
/// Later loaders are not invoked once one succeeds. Errors from a loader
/// propagate immediately; only absence moves on to the next one. When every
/// loader reports absence the result is [`ResolveError::Exhausted`] naming the target.
pub struct FallbackLoader<Q: Sync + 'static, V: Send + 'static> {
    loaders: Vec<Box<dyn Loader<Q, V>>>,
}

impl<Q: Sync + 'static, V: Send + 'static> FallbackLoader<Q, V> {
    pub fn new(loaders: Vec<Box<dyn Loader<Q, V>>>) -> Self {
        Self { loaders }
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

#[async_trait::async_trait]
impl<Q, V> Provider<Q, V> for FallbackLoader<Q, V>
where
    Q: fmt::Display + Sync + 'static,
    V: Send + 'static,
{
    async fn load(&self, target: &Q) -> Result<V, ResolveError> {
        for (index, loader) in self.loaders.iter().enumerate() {
            if let Some(value) = loader.load(target).await? {
                return Ok(value);
            }
            mirror_debug!("Source {} had nothing for {}", index, target);
        }
        Err(ResolveError::Exhausted {
            target: target.to_string(),
        })
    }
}
