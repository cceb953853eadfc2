//! Symbolic locator resolution.

use std::sync::Arc;
use tracing::debug;

use crate::repository::ElementRepository;
use crate::result::{TenazError, TenazResult};
use crate::strategy::{DriverQuery, LocatorSpec, Strategy};

/// What a caller wants to locate: a symbolic name or an explicit locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Name looked up in the active repository, e.g. `"Login.Username"`
    Symbolic(String),
    /// Explicit `(strategy, value)` pair
    Spec(LocatorSpec),
    /// Already translated driver query
    Query(DriverQuery),
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::Symbolic(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Self::Symbolic(name)
    }
}

impl From<LocatorSpec> for Target {
    fn from(spec: LocatorSpec) -> Self {
        Self::Spec(spec)
    }
}

impl From<DriverQuery> for Target {
    fn from(query: DriverQuery) -> Self {
        Self::Query(query)
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Symbolic(name) => f.write_str(name),
            Self::Spec(spec) => spec.fmt(f),
            Self::Query(query) => query.fmt(f),
        }
    }
}

/// Resolves symbolic names against a repository.
///
/// Nothing is cached: every call re-reads the repository table, so changes to
/// a repository are visible on the next resolution.
#[derive(Debug, Clone)]
pub struct SymbolicLocatorResolver {
    repository: Arc<dyn ElementRepository>,
}

impl SymbolicLocatorResolver {
    /// Create a resolver over the given repository
    #[must_use]
    pub fn new(repository: Arc<dyn ElementRepository>) -> Self {
        Self { repository }
    }

    /// The repository names are resolved against
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn ElementRepository> {
        &self.repository
    }

    /// Resolve a symbolic name into a validated spec.
    ///
    /// Lookup is exact-match on the name; with duplicated names the first
    /// entry in table order wins.
    pub fn resolve(&self, name: &str) -> TenazResult<LocatorSpec> {
        let entry = self
            .repository
            .get_all()
            .into_iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| TenazError::LocatorNotFound {
                name: name.to_string(),
                repository: self.repository.name().to_string(),
            })?;

        let strategy =
            Strategy::parse(&entry.strategy).map_err(|_| TenazError::InvalidLocator {
                name: name.to_string(),
                strategy: entry.strategy.clone(),
            })?;

        debug!(
            locator = name,
            repository = self.repository.name(),
            strategy = %strategy,
            value = %entry.selector,
            "resolved symbolic locator"
        );
        Ok(LocatorSpec::of(strategy, entry.selector))
    }

    /// Resolve any target into a driver query
    pub fn query_for(&self, target: &Target) -> TenazResult<DriverQuery> {
        match target {
            Target::Symbolic(name) => self.resolve(name)?.to_query(),
            Target::Spec(spec) => spec.to_query(),
            Target::Query(query) => Ok(query.clone()),
        }
    }
}
