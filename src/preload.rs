//! Post-fetch hooks that fill in associated records.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::QueryResult;

/// Future returned by a preload callback.
pub type PreloadFuture<'a> = BoxFuture<'a, QueryResult<()>>;

/// A callback run over every freshly materialized batch.
///
/// Registered with [`crate::Queryable::add_preload`]; shared between every
/// queryable derived from the one it was registered on.
pub type Preload<M> = Arc<dyn for<'a> Fn(&'a mut Vec<M>) -> PreloadFuture<'a> + Send + Sync>;

/// Run `preloads` in registration order, stopping at the first failure.
pub(crate) async fn run_preloads<M>(preloads: &[Preload<M>], records: &mut Vec<M>) -> QueryResult<()> {
    for preload in preloads {
        preload(&mut *records).await?;
    }
    Ok(())
}
