//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use trellis_graph::Resolver;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds the resolver and, when running
/// against Postgres, the connection pool for readiness checks.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    resolver: Resolver,
    pool: Option<PgPool>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(resolver: Resolver, pool: Option<PgPool>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { resolver, pool }),
        }
    }

    /// Get a reference to the resolver.
    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.inner.resolver
    }

    /// Get the database connection pool, if the postgres store is in use.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }
}
