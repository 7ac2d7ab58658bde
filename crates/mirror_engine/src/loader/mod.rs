//! Composable strategies that produce a TimeMap or a post for a target.
//!
//! A [`Loader`] may report absence (cache miss, markers missing); a [`Provider`]
//! must produce a value or fail. Policies are small structs composed by
//! construction: repository sources, live archive sources, [`FallbackLoader`]
//! and [`PersistingProvider`].
mod archive;
mod fallback;
mod persisting;
mod repository;

pub use archive::{
    order_alternates, ArchiveAlternatesLoader, ArchiveContentLoader, ArchiveTimeMapProvider,
};
pub use fallback::FallbackLoader;
pub use persisting::PersistingProvider;
pub use repository::{
    RepositoryContentLoader, RepositoryContentWriter, RepositoryTimeMapLoader,
    RepositoryTimeMapWriter,
};

use crate::ResolveError;

#[async_trait::async_trait]
pub trait Loader<Q: Sync + 'static, V: Send + 'static>: Send + Sync {
    async fn load(&self, target: &Q) -> Result<Option<V>, ResolveError>;
}

#[async_trait::async_trait]
pub trait Provider<Q: Sync + 'static, V: Send + 'static>: Send + Sync {
    async fn load(&self, target: &Q) -> Result<V, ResolveError>;
}

#[async_trait::async_trait]
pub trait Writer<Q: Sync + 'static, V: Sync + 'static>: Send + Sync {
    async fn write(&self, target: &Q, value: &V) -> Result<(), ResolveError>;
}

/// Adapts a [`Provider`] to the [`Loader`] interface so it can sit in a fallback
/// chain. It never reports absence.
pub struct ProviderLoader<P>(P);

impl<P> ProviderLoader<P> {
    pub fn new(provider: P) -> Self {
        Self(provider)
    }
}

#[async_trait::async_trait]
impl<Q, V, P> Loader<Q, V> for ProviderLoader<P>
where
    Q: Sync + 'static,
    V: Send + 'static,
    P: Provider<Q, V>,
{
    async fn load(&self, target: &Q) -> Result<Option<V>, ResolveError> {
        self.0.load(target).await.map(Some)
    }
}
