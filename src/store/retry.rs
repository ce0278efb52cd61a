//! Bounded-backoff retry decorator for graph stores
//!
//! Wraps any `GraphStore` so transient unavailability (busy/locked database,
//! unreachable remote) is retried with exponential backoff. Non-transient
//! errors pass through unchanged; a call that stays transient through every
//! attempt surfaces as `StoreError::Unavailable`, which the engine maps to
//! `ExternalUnavailable`.

use async_trait::async_trait;
use rusqlite::ErrorCode;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::traits::{GraphStore, StoreError, StoreResult, StoreStats};
use crate::graph::{Document, Domain, DomainId, NeighborEdge, ParagraphInfo, RelationMatch, UnitId};

fn is_transient(err: &StoreError) -> bool {
    match err {
        StoreError::Unavailable(_) => true,
        StoreError::Database(rusqlite::Error::SqliteFailure(f, _)) => {
            matches!(f.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        }
        _ => false,
    }
}

/// A `GraphStore` decorator adding bounded-backoff retries.
pub struct RetryingStore<S> {
    inner: S,
    max_attempts: usize,
    base_delay: Duration,
}

impl<S: GraphStore> RetryingStore<S> {
    pub fn new(inner: S, max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    async fn run<T, F, Fut>(&self, op: &'static str, f: F) -> StoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut delay = self.base_delay;
        let mut last_msg = String::new();
        for attempt in 1..=self.max_attempts {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) => {
                    warn!(op, attempt, error = %err, "transient store error, backing off");
                    last_msg = err.to_string();
                    if attempt < self.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Err(StoreError::Unavailable(format!(
            "{} failed after {} attempts: {}",
            op, self.max_attempts, last_msg
        )))
    }
}

#[async_trait]
impl<S: GraphStore> GraphStore for RetryingStore<S> {
    async fn vector_search_paragraphs(
        &self,
        query: &[f32],
        top_k: usize,
        scope: Option<&HashSet<UnitId>>,
    ) -> StoreResult<Vec<(UnitId, f32)>> {
        self.run("vector_search_paragraphs", || {
            self.inner.vector_search_paragraphs(query, top_k, scope)
        })
        .await
    }

    async fn neighbors(&self, id: &UnitId) -> StoreResult<Vec<(UnitId, NeighborEdge)>> {
        self.run("neighbors", || self.inner.neighbors(id)).await
    }

    async fn paragraph_info(&self, id: &UnitId) -> StoreResult<Option<ParagraphInfo>> {
        self.run("paragraph_info", || self.inner.paragraph_info(id))
            .await
    }

    async fn vector_search_relations(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> StoreResult<Vec<RelationMatch>> {
        self.run("vector_search_relations", || {
            self.inner.vector_search_relations(query, top_k)
        })
        .await
    }

    async fn upsert_domain(&self, domain: &Domain) -> StoreResult<()> {
        self.run("upsert_domain", || self.inner.upsert_domain(domain))
            .await
    }

    async fn assign_paragraph_to_domain(
        &self,
        paragraph: &UnitId,
        domain: &DomainId,
        similarity: f32,
    ) -> StoreResult<()> {
        self.run("assign_paragraph_to_domain", || {
            self.inner
                .assign_paragraph_to_domain(paragraph, domain, similarity)
        })
        .await
    }

    async fn delete_domain(&self, domain: &DomainId) -> StoreResult<()> {
        self.run("delete_domain", || self.inner.delete_domain(domain))
            .await
    }

    async fn load_domains(&self) -> StoreResult<Vec<Domain>> {
        self.run("load_domains", || self.inner.load_domains()).await
    }

    async fn insert_document(&self, document: &Document) -> StoreResult<()> {
        self.run("insert_document", || self.inner.insert_document(document))
            .await
    }

    async fn link_implements(&self, implementing: &str, implemented: &str) -> StoreResult<()> {
        self.run("link_implements", || {
            self.inner.link_implements(implementing, implemented)
        })
        .await
    }

    async fn set_paragraph_embedding(&self, id: &UnitId, embedding: &[f32]) -> StoreResult<()> {
        self.run("set_paragraph_embedding", || {
            self.inner.set_paragraph_embedding(id, embedding)
        })
        .await
    }

    async fn set_relation_context(
        &self,
        parent: &UnitId,
        child: &UnitId,
        context_text: &str,
        embedding: &[f32],
    ) -> StoreResult<()> {
        self.run("set_relation_context", || {
            self.inner
                .set_relation_context(parent, child, context_text, embedding)
        })
        .await
    }

    async fn paragraph_embeddings(&self) -> StoreResult<Vec<(UnitId, Vec<f32>)>> {
        self.run("paragraph_embeddings", || self.inner.paragraph_embeddings())
            .await
    }

    async fn paragraph_laws(&self) -> StoreResult<HashMap<UnitId, String>> {
        self.run("paragraph_laws", || self.inner.paragraph_laws())
            .await
    }

    async fn linked_law_pairs(&self) -> StoreResult<Vec<(String, String)>> {
        self.run("linked_law_pairs", || self.inner.linked_law_pairs())
            .await
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        self.run("stats", || self.inner.stats()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that fails transiently a fixed number of times, then succeeds.
    #[derive(Default)]
    struct FlakyStore {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
        permanent: bool,
    }

    impl FlakyStore {
        fn failing(n: usize) -> Self {
            Self {
                failures_left: AtomicUsize::new(n),
                calls: AtomicUsize::new(0),
                permanent: false,
            }
        }

        fn check(&self) -> StoreResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.permanent {
                return Err(StoreError::Corrupt("bad blob".into()));
            }
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(StoreError::Unavailable("flaky".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl GraphStore for FlakyStore {
        async fn vector_search_paragraphs(
            &self,
            _query: &[f32],
            _top_k: usize,
            _scope: Option<&HashSet<UnitId>>,
        ) -> StoreResult<Vec<(UnitId, f32)>> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn neighbors(&self, _id: &UnitId) -> StoreResult<Vec<(UnitId, NeighborEdge)>> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn paragraph_info(&self, _id: &UnitId) -> StoreResult<Option<ParagraphInfo>> {
            self.check()?;
            Ok(None)
        }

        async fn vector_search_relations(
            &self,
            _query: &[f32],
            _top_k: usize,
        ) -> StoreResult<Vec<RelationMatch>> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn upsert_domain(&self, _domain: &Domain) -> StoreResult<()> {
            self.check()
        }

        async fn assign_paragraph_to_domain(
            &self,
            _paragraph: &UnitId,
            _domain: &DomainId,
            _similarity: f32,
        ) -> StoreResult<()> {
            self.check()
        }

        async fn delete_domain(&self, _domain: &DomainId) -> StoreResult<()> {
            self.check()
        }

        async fn load_domains(&self) -> StoreResult<Vec<Domain>> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn insert_document(&self, _document: &Document) -> StoreResult<()> {
            self.check()
        }

        async fn link_implements(
            &self,
            _implementing: &str,
            _implemented: &str,
        ) -> StoreResult<()> {
            self.check()
        }

        async fn set_paragraph_embedding(
            &self,
            _id: &UnitId,
            _embedding: &[f32],
        ) -> StoreResult<()> {
            self.check()
        }

        async fn set_relation_context(
            &self,
            _parent: &UnitId,
            _child: &UnitId,
            _context_text: &str,
            _embedding: &[f32],
        ) -> StoreResult<()> {
            self.check()
        }

        async fn paragraph_embeddings(&self) -> StoreResult<Vec<(UnitId, Vec<f32>)>> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn paragraph_laws(&self) -> StoreResult<HashMap<UnitId, String>> {
            self.check()?;
            Ok(HashMap::new())
        }

        async fn linked_law_pairs(&self) -> StoreResult<Vec<(String, String)>> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn stats(&self) -> StoreResult<StoreStats> {
            self.check()?;
            Ok(StoreStats::default())
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let store = RetryingStore::new(FlakyStore::failing(2), 3, Duration::from_millis(1));
        store.neighbors(&UnitId::from("p")).await.unwrap();
        assert_eq!(store.into_inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_unavailable() {
        let store = RetryingStore::new(FlakyStore::failing(5), 3, Duration::from_millis(1));
        let err = store.neighbors(&UnitId::from("p")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.into_inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_pass_through_without_retry() {
        let inner = FlakyStore {
            permanent: true,
            ..Default::default()
        };
        let store = RetryingStore::new(inner, 3, Duration::from_millis(1));
        let err = store.stats().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert_eq!(store.into_inner().calls.load(Ordering::SeqCst), 1);
    }
}
