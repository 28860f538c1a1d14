//! Compiled plan cache.
//!
//! Plans are immutable, so the cache hands out `Arc<QueryPlan>` and is safe
//! to share between threads compiling concurrently. The cache is bounded; when
//! it is full it is cleared before the next insert.

mod hash;
pub use hash::PlanKey;

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{trace, warn};

use crate::error::QueryResult;
use crate::query::QueryPlan;

pub const DEFAULT_PLAN_CACHE_SIZE: usize = 256;

#[derive(Debug)]
pub struct PlanCache {
    plans: DashMap<String, Arc<QueryPlan>>,
    capacity: usize,
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::new(DEFAULT_PLAN_CACHE_SIZE)
    }
}

impl PlanCache {
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            plans: DashMap::new(),
            capacity,
        }
    }

    pub fn get(&self, key: &PlanKey<'_>) -> Option<Arc<QueryPlan>> {
        self.plans.get(&key.digest()).map(|entry| Arc::clone(entry.value()))
    }

    /// The cached plan for `key`, compiling and caching it on a miss. A failed
    /// compilation caches nothing.
    pub fn get_or_compile<F>(&self, key: &PlanKey<'_>, compile: F) -> QueryResult<Arc<QueryPlan>>
    where
        F: FnOnce() -> QueryResult<QueryPlan>,
    {
        let digest = key.digest();
        if let Some(plan) = self.plans.get(&digest) {
            trace!(key = %digest, "plan cache hit");
            return Ok(Arc::clone(plan.value()));
        }
        let plan = Arc::new(compile()?);
        if self.capacity == 0 {
            return Ok(plan);
        }
        if self.plans.len() >= self.capacity {
            warn!(capacity = self.capacity, "plan cache full, clearing");
            self.plans.clear();
        }
        // A concurrent compilation of the same key may have won; keep its plan.
        let entry = self.plans.entry(digest).or_insert(plan);
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn clear(&self) {
        self.plans.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{convert, ConversionOptions, LiteralRendering};
    use crate::error::QueryError;
    use crate::hql::HqlParser;
    use crate::metamodel::company;
    use crate::sql::{Dialect, SqlRenderer};
    use crate::sqm;

    fn key(query: &str) -> PlanKey<'_> {
        PlanKey {
            query,
            dialect: Dialect::Ansi,
            literal_rendering: LiteralRendering::AsParam,
            max_fetch_depth: 3,
            format_sql: false,
            quote_identifiers: false,
            metamodel_version: 1,
        }
    }

    fn compile(query: &str) -> QueryResult<QueryPlan> {
        let model = company();
        let sqm = sqm::build(&HqlParser::new().parse(query)?, &model)?;
        let conversion = convert(&sqm, &model, &ConversionOptions::new(Dialect::Ansi))?;
        Ok(QueryPlan::new(query, conversion, SqlRenderer::new(Dialect::Ansi)))
    }

    #[test]
    fn test_hit_returns_same_plan() {
        let cache = PlanCache::new(4);
        let query = "select p.name from Person p";
        let first = cache.get_or_compile(&key(query), || compile(query)).expect("compiles");
        let second = cache
            .get_or_compile(&key(query), || panic!("should be cached"))
            .expect("cached");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let cache = PlanCache::new(4);
        let query = "select x.name from Nothing x";
        let err = cache
            .get_or_compile(&key(query), || compile(query))
            .expect_err("unknown entity");
        assert!(matches!(err, QueryError::UnknownEntity { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_full_cache_is_cleared() {
        let cache = PlanCache::new(1);
        let a = "select p.name from Person p";
        let b = "select d.name from Department d";
        cache.get_or_compile(&key(a), || compile(a)).expect("compiles");
        cache.get_or_compile(&key(b), || compile(b)).expect("compiles");
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key(b)).is_some());
        assert!(cache.get(&key(a)).is_none());
    }
}
