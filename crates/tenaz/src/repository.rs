//! Element Repositories
//!
//! A repository is a per-page table mapping symbolic element names
//! (`"Login.Username"`) to a raw `[strategy, selector]` pair. Repositories are
//! ordinary trait objects selected by name through a [`RepositoryRegistry`];
//! the active one travels explicitly inside a [`crate::Context`].
//!
//! Strategies are kept as raw strings here. They are validated when a name is
//! resolved, so a bad entry surfaces as [`TenazError::InvalidLocator`] for the
//! element that carries it instead of poisoning the whole table.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::result::{TenazError, TenazResult};

/// One row of a repository table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    /// Symbolic element name
    pub name: String,
    /// Strategy name, not yet validated
    pub strategy: String,
    /// Selector value
    pub selector: String,
}

impl RepositoryEntry {
    /// Create a new entry
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        strategy: impl Into<String>,
        selector: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            strategy: strategy.into(),
            selector: selector.into(),
        }
    }
}

/// Source of symbolic element definitions for one page or screen.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug)]
/// struct LoginPage;
///
/// impl ElementRepository for LoginPage {
///     fn name(&self) -> &str {
///         "Login"
///     }
///
///     fn get_all(&self) -> Vec<RepositoryEntry> {
///         vec![
///             RepositoryEntry::new("Login.Username", "id", "user"),
///             RepositoryEntry::new("Login.Submit", "css", "button[type='submit']"),
///         ]
///     }
/// }
/// ```
pub trait ElementRepository: fmt::Debug + Send + Sync {
    /// Repository name, used in diagnostics and for registry selection
    fn name(&self) -> &str;

    /// Every entry, in table order. Called on each resolution.
    fn get_all(&self) -> Vec<RepositoryEntry>;
}

/// A repository backed by an in-memory table
#[derive(Debug, Clone, Default)]
pub struct StaticRepository {
    name: String,
    entries: Vec<RepositoryEntry>,
}

impl StaticRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Add an entry
    pub fn add(
        &mut self,
        name: impl Into<String>,
        strategy: impl Into<String>,
        selector: impl Into<String>,
    ) {
        self.entries
            .push(RepositoryEntry::new(name, strategy, selector));
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a table of the form `Page.Element: [strategy, selector]` from YAML
    pub fn from_yaml_str(name: impl Into<String>, yaml: &str) -> TenazResult<Self> {
        let table: BTreeMap<String, (String, String)> = serde_yaml_ng::from_str(yaml)?;
        Ok(Self::from_table(name, table))
    }

    /// Load a table of the form `{"Page.Element": ["strategy", "selector"]}` from JSON
    pub fn from_json_str(name: impl Into<String>, json: &str) -> TenazResult<Self> {
        let table: BTreeMap<String, (String, String)> = serde_json::from_str(json)?;
        Ok(Self::from_table(name, table))
    }

    /// Load a table from a `.yaml`/`.yml` or `.json` file.
    ///
    /// The repository is named after the file stem.
    pub fn from_file(path: impl AsRef<Path>) -> TenazResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| TenazError::config(format!("bad repository path {}", path.display())))?
            .to_string();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(name, &content),
            Some("yaml" | "yml") => Self::from_yaml_str(name, &content),
            other => Err(TenazError::config(format!(
                "unsupported repository format {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    fn from_table(name: impl Into<String>, table: BTreeMap<String, (String, String)>) -> Self {
        Self {
            name: name.into(),
            entries: table
                .into_iter()
                .map(|(element, (strategy, selector))| {
                    RepositoryEntry::new(element, strategy, selector)
                })
                .collect(),
        }
    }
}

impl ElementRepository for StaticRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_all(&self) -> Vec<RepositoryEntry> {
        self.entries.clone()
    }
}

/// Builder for [`StaticRepository`]
#[derive(Debug, Clone, Default)]
pub struct RepositoryBuilder {
    repository: StaticRepository,
}

impl RepositoryBuilder {
    /// Start a repository with the given name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            repository: StaticRepository::new(name),
        }
    }

    /// Add an element definition
    #[must_use]
    pub fn with_element(
        mut self,
        name: impl Into<String>,
        strategy: impl Into<String>,
        selector: impl Into<String>,
    ) -> Self {
        self.repository.add(name, strategy, selector);
        self
    }

    /// Finish the repository
    #[must_use]
    pub fn build(self) -> StaticRepository {
        self.repository
    }
}

/// Named repositories, selectable at runtime
#[derive(Debug, Default)]
pub struct RepositoryRegistry {
    repositories: HashMap<String, Arc<dyn ElementRepository>>,
}

impl RepositoryRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository under its own name
    pub fn register<R: ElementRepository + 'static>(&mut self, repository: R) {
        let _ = self
            .repositories
            .insert(repository.name().to_string(), Arc::new(repository));
    }

    /// Register an already shared repository
    pub fn register_shared(&mut self, repository: Arc<dyn ElementRepository>) {
        let _ = self
            .repositories
            .insert(repository.name().to_string(), repository);
    }

    /// Get a repository by name
    pub fn get(&self, name: &str) -> TenazResult<Arc<dyn ElementRepository>> {
        self.repositories
            .get(name)
            .cloned()
            .ok_or_else(|| TenazError::config(format!("no repository named {name:?}")))
    }

    /// Names of all registered repositories, sorted
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.repositories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered repositories
    #[must_use]
    pub fn count(&self) -> usize {
        self.repositories.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod builder_tests {
        use super::*;

        #[test]
        fn test_builder_keeps_order() {
            let repo = RepositoryBuilder::new("Login")
                .with_element("Login.Username", "id", "user")
                .with_element("Login.Password", "name", "pass")
                .build();

            let entries = repo.get_all();
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].name, "Login.Username");
            assert_eq!(entries[1].strategy, "name");
            assert_eq!(ElementRepository::name(&repo), "Login");
        }

        #[test]
        fn test_empty_repository() {
            let repo = StaticRepository::new("Empty");
            assert!(repo.is_empty());
            assert_eq!(repo.len(), 0);
        }
    }

    mod loading_tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_from_yaml() {
            let yaml = "Login.Username: [id, user]\nLogin.Submit: [css, \"button[type='submit']\"]\n";
            let repo = StaticRepository::from_yaml_str("Login", yaml).unwrap();
            let entries = repo.get_all();
            assert_eq!(entries.len(), 2);
            let submit = entries.iter().find(|e| e.name == "Login.Submit").unwrap();
            assert_eq!(submit.strategy, "css");
            assert_eq!(submit.selector, "button[type='submit']");
        }

        #[test]
        fn test_from_json() {
            let json = r#"{"Cart.Items": ["xpath", "//li[@class='item']"]}"#;
            let repo = StaticRepository::from_json_str("Cart", json).unwrap();
            assert_eq!(repo.get_all()[0].selector, "//li[@class='item']");
        }

        #[test]
        fn test_pair_must_have_two_elements() {
            assert!(StaticRepository::from_yaml_str("Bad", "A.B: [id]\n").is_err());
        }

        #[test]
        fn test_from_file_uses_stem_as_name() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("Checkout.yaml");
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "Checkout.Pay: [id, pay]").unwrap();

            let repo = StaticRepository::from_file(&path).unwrap();
            assert_eq!(ElementRepository::name(&repo), "Checkout");
            assert_eq!(repo.len(), 1);
        }

        #[test]
        fn test_from_file_rejects_unknown_extension() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("Checkout.toml");
            std::fs::write(&path, "x").unwrap();
            let err = StaticRepository::from_file(&path).unwrap_err();
            assert!(matches!(err, TenazError::Config { .. }));
        }
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn test_register_and_get() {
            let mut registry = RepositoryRegistry::new();
            registry.register(StaticRepository::new("Login"));
            registry.register(StaticRepository::new("Cart"));

            assert_eq!(registry.count(), 2);
            assert_eq!(registry.list(), vec!["Cart", "Login"]);
            assert_eq!(registry.get("Cart").unwrap().name(), "Cart");
        }

        #[test]
        fn test_unknown_repository() {
            let registry = RepositoryRegistry::new();
            let err = registry.get("Missing").unwrap_err();
            assert!(err.to_string().contains("Missing"));
        }
    }
}
