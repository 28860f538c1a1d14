//! End-to-end compilation from query text to a cached plan.
//!
//! ```text
//! HQL text → Parse → SQM → Convert → SQL AST → Render → QueryPlan
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hqlc::compile::{CompileOptions, QueryCompiler};
//! use hqlc::metamodel::Metamodel;
//! use hqlc::sql::Dialect;
//!
//! let metamodel = Metamodel::from_file("metamodel.toml")?;
//! let options = CompileOptions::default().with_dialect(Dialect::Postgres);
//! let compiler = QueryCompiler::new(Arc::new(metamodel), options);
//!
//! let plan = compiler.compile("from Person p where p.name = :n")?;
//! println!("{}", plan.sql());
//! ```

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::cache::{PlanCache, PlanKey, DEFAULT_PLAN_CACHE_SIZE};
use crate::convert::{self, ConversionOptions, LiteralRendering, DEFAULT_MAX_FETCH_DEPTH};
use crate::error::QueryResult;
use crate::hql::HqlParser;
use crate::metamodel::MetamodelAccess;
use crate::query::QueryPlan;
use crate::sql::{Dialect, SqlRenderer};
use crate::sqm;

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// SQL dialect to generate.
    pub dialect: Dialect,

    /// Literal policy; `None` picks the dialect default.
    pub literal_rendering: Option<LiteralRendering>,

    pub max_fetch_depth: usize,

    pub format_sql: bool,

    pub quote_identifiers: bool,

    pub plan_cache_size: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            literal_rendering: None,
            max_fetch_depth: DEFAULT_MAX_FETCH_DEPTH,
            format_sql: false,
            quote_identifiers: false,
            plan_cache_size: DEFAULT_PLAN_CACHE_SIZE,
        }
    }
}

impl CompileOptions {
    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_literal_rendering(mut self, literal_rendering: LiteralRendering) -> Self {
        self.literal_rendering = Some(literal_rendering);
        self
    }

    pub fn with_max_fetch_depth(mut self, max_fetch_depth: usize) -> Self {
        self.max_fetch_depth = max_fetch_depth;
        self
    }

    pub fn with_format_sql(mut self, format_sql: bool) -> Self {
        self.format_sql = format_sql;
        self
    }

    pub fn with_quoted_identifiers(mut self, quote: bool) -> Self {
        self.quote_identifiers = quote;
        self
    }

    pub fn with_plan_cache_size(mut self, plan_cache_size: usize) -> Self {
        self.plan_cache_size = plan_cache_size;
        self
    }

    /// The literal policy actually applied.
    pub fn effective_literal_rendering(&self) -> LiteralRendering {
        self.literal_rendering
            .unwrap_or_else(|| LiteralRendering::default_for(self.dialect))
    }

    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions::new(self.dialect)
            .with_literal_rendering(self.effective_literal_rendering())
            .with_max_fetch_depth(self.max_fetch_depth)
    }

    pub fn renderer(&self) -> SqlRenderer {
        SqlRenderer::new(self.dialect)
            .with_format(self.format_sql)
            .with_quoted_identifiers(self.quote_identifiers)
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles query text against one metamodel and caches the resulting plans.
///
/// Shareable between threads: every compilation owns its own converter
/// state, and the plan cache is a concurrent map.
#[derive(Debug)]
pub struct QueryCompiler {
    metamodel: Arc<dyn MetamodelAccess>,
    options: CompileOptions,
    parser: HqlParser,
    cache: PlanCache,
}

impl QueryCompiler {
    pub fn new(metamodel: Arc<dyn MetamodelAccess>, options: CompileOptions) -> Self {
        Self {
            metamodel,
            options,
            parser: HqlParser::new(),
            cache: PlanCache::new(options.plan_cache_size),
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn metamodel(&self) -> &dyn MetamodelAccess {
        self.metamodel.as_ref()
    }

    pub fn cache(&self) -> &PlanCache {
        &self.cache
    }

    /// Compile `query`, reusing a cached plan when text, options and
    /// metamodel version all match.
    ///
    /// # Errors
    ///
    /// Any [`QueryError`](crate::error::QueryError) raised while parsing,
    /// resolving or converting. Failures are never cached.
    #[instrument(level = "debug", skip(self), fields(dialect = %self.options.dialect))]
    pub fn compile(&self, query: &str) -> QueryResult<Arc<QueryPlan>> {
        let key = PlanKey {
            query,
            dialect: self.options.dialect,
            literal_rendering: self.options.effective_literal_rendering(),
            max_fetch_depth: self.options.max_fetch_depth,
            format_sql: self.options.format_sql,
            quote_identifiers: self.options.quote_identifiers,
            metamodel_version: self.metamodel.version(),
        };
        self.cache.get_or_compile(&key, || self.compile_uncached(query))
    }

    /// Compile without consulting or filling the cache.
    pub fn compile_uncached(&self, query: &str) -> QueryResult<QueryPlan> {
        let statement = self.parser.parse(query)?;
        debug!("parsed query");

        let sqm = sqm::build(&statement, self.metamodel.as_ref())?;

        let conversion = convert::convert(
            &sqm,
            self.metamodel.as_ref(),
            &self.options.conversion_options(),
        )?;
        let plan = QueryPlan::new(query, conversion, self.options.renderer());
        debug!(sql = plan.sql(), "rendered plan");
        Ok(plan)
    }
}
