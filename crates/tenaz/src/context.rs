//! Automation context.
//!
//! A [`Context`] bundles one driver session with the active element
//! repository and the synchronization settings. It is the surface test code
//! calls: resolve a target, find it, wait on it, read it.
//!
//! ```ignore
//! let mut ctx = Context::from_registry(session, &registry, "Login")?;
//! let user = ctx.resolve_one("Login.Username")?;
//! ctx.await_attribute(&user, "class", "valid", Relation::Contains, Duration::ZERO)?;
//! ctx.use_repository(&registry, "Dashboard")?;
//! ```

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::attribute_wait::{AttributeCondition, AttributeWait, Relation};
use crate::config::SyncConfig;
use crate::finder::{ElementFilter, ElementFinder};
use crate::handle::ElementHandle;
use crate::repository::{ElementRepository, RepositoryRegistry};
use crate::resolver::{SymbolicLocatorResolver, Target};
use crate::result::{TenazError, TenazResult};
use crate::session::Session;
use crate::strategy::DriverQuery;
use crate::wait::{ElementWaits, WaitKind, WaitResult};

/// One session, its active repository and its timing settings
#[derive(Debug)]
pub struct Context<S: Session> {
    session: S,
    resolver: SymbolicLocatorResolver,
    config: SyncConfig,
}

impl<S: Session> Context<S> {
    /// Create a context with default timing
    pub fn new(session: S, repository: Arc<dyn ElementRepository>) -> Self {
        Self {
            session,
            resolver: SymbolicLocatorResolver::new(repository),
            config: SyncConfig::default(),
        }
    }

    /// Replace the timing settings
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Create a context whose active repository is picked by name
    pub fn from_registry(session: S, registry: &RepositoryRegistry, name: &str) -> TenazResult<Self> {
        Ok(Self::new(session, registry.get(name)?))
    }

    /// Switch the active repository
    pub fn set_repository(&mut self, repository: Arc<dyn ElementRepository>) {
        info!(
            from = self.resolver.repository().name(),
            to = repository.name(),
            "switching element repository"
        );
        self.resolver = SymbolicLocatorResolver::new(repository);
    }

    /// Switch the active repository by registry name
    pub fn use_repository(&mut self, registry: &RepositoryRegistry, name: &str) -> TenazResult<()> {
        self.set_repository(registry.get(name)?);
        Ok(())
    }

    /// The driver session
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// Timing settings
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Resolver over the active repository
    pub const fn resolver(&self) -> &SymbolicLocatorResolver {
        &self.resolver
    }

    /// Finder over this session
    pub const fn finder(&self) -> ElementFinder<'_, S> {
        ElementFinder::new(&self.session, &self.config)
    }

    /// Translate a target into a driver query
    pub fn query(&self, target: impl Into<Target>) -> TenazResult<DriverQuery> {
        let target = target.into();
        self.resolver.query_for(&target).map_err(|err| {
            error!(target = %target, repository = self.resolver.repository().name(), error = %err, "cannot resolve locator");
            err
        })
    }

    /// Resolve and find exactly one element; absence is an error
    pub fn resolve_one(&self, target: impl Into<Target>) -> TenazResult<ElementHandle> {
        let query = self.query(target)?;
        self.finder()
            .find_one(&query, true)?
            .ok_or(TenazError::ElementNotFound {
                query: query.to_string(),
            })
    }

    /// Resolve and find one element; absence yields `None`
    pub fn try_resolve_one(&self, target: impl Into<Target>) -> TenazResult<Option<ElementHandle>> {
        let query = self.query(target)?;
        self.finder().find_one(&query, false)
    }

    /// Resolve and find every matching element, in document order
    pub fn resolve_all(
        &self,
        target: impl Into<Target>,
        filter: Option<ElementFilter<'_, S>>,
        throw_on_missing: bool,
        timeout: Duration,
    ) -> TenazResult<Vec<ElementHandle>> {
        let query = self.query(target)?;
        self.finder().find_all(&query, filter, throw_on_missing, timeout)
    }

    /// Wait until the target reaches `kind`. Returns whether it did.
    pub fn wait_until(
        &self,
        kind: &WaitKind,
        target: impl Into<Target>,
        timeout: Duration,
        throw_on_timeout: bool,
    ) -> TenazResult<bool> {
        let query = self.query(target)?;
        let result = self.waits().wait_for(kind, &query, timeout, throw_on_timeout)?;
        Ok(result.satisfied)
    }

    /// Wait until an already found element reaches `kind`
    pub fn wait_until_handle(
        &self,
        kind: &WaitKind,
        handle: &ElementHandle,
        timeout: Duration,
        throw_on_timeout: bool,
    ) -> TenazResult<bool> {
        let result = self
            .waits()
            .wait_for_handle(kind, handle, timeout, throw_on_timeout)?;
        Ok(result.satisfied)
    }

    /// Wait until `child` matches nothing under `parent`
    pub fn wait_for_child_not_visible(
        &self,
        parent: &ElementHandle,
        child: impl Into<Target>,
        timeout: Duration,
        throw_on_timeout: bool,
    ) -> TenazResult<bool> {
        let child = self.query(child)?;
        let result = self
            .waits()
            .wait_for_child_not_visible(parent, &child, timeout, throw_on_timeout)?;
        Ok(result.satisfied)
    }

    /// Block until an attribute of `handle` relates to `expected`
    pub fn await_attribute(
        &self,
        handle: &ElementHandle,
        attribute: &str,
        expected: &str,
        relation: Relation,
        timeout: Duration,
    ) -> TenazResult<WaitResult> {
        AttributeWait::new(&self.session, &self.config)
            .await_attribute(handle, attribute, expected, relation, timeout)
    }

    /// Block until `condition` holds on `handle`
    pub fn await_attribute_condition(
        &self,
        handle: &ElementHandle,
        condition: &AttributeCondition,
        timeout: Duration,
    ) -> TenazResult<WaitResult> {
        AttributeWait::new(&self.session, &self.config).await_condition(handle, condition, timeout)
    }

    /// Text of the element the target resolves to
    pub fn text(&self, target: impl Into<Target>) -> TenazResult<String> {
        let handle = self.resolve_one(target)?;
        self.finder().text_of(&handle)
    }

    /// Attribute of the element the target resolves to
    pub fn attribute(
        &self,
        target: impl Into<Target>,
        name: &str,
        throw_on_missing: bool,
    ) -> TenazResult<Option<String>> {
        let handle = self.resolve_one(target)?;
        self.finder().attribute_of(&handle, name, throw_on_missing)
    }

    const fn waits(&self) -> ElementWaits<'_, S> {
        ElementWaits::new(&self.session, &self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockNode, MockSession};
    use crate::repository::RepositoryBuilder;
    use crate::strategy::LocatorSpec;

    fn registry() -> RepositoryRegistry {
        let mut registry = RepositoryRegistry::new();
        registry.register(
            RepositoryBuilder::new("Login")
                .with_element("Login.Username", "id", "user")
                .with_element("Login.Submit", "css", "#submit")
                .with_element("Login.Missing", "id", "nowhere")
                .with_element("Login.Forgot", "linkText", "Forgot?")
                .build(),
        );
        registry.register(
            RepositoryBuilder::new("Dashboard")
                .with_element("Dashboard.Rows", "class", "row")
                .build(),
        );
        registry
    }

    fn login_page() -> MockSession {
        let session = MockSession::new();
        let form = session.add(None, MockNode::new("form"));
        session.add(
            Some(&form),
            MockNode::new("input").with_id("user").with_attr("value", "alice"),
        );
        session.add(Some(&form), MockNode::new("button").with_id("submit").with_text("Sign in"));
        session
    }

    fn quick() -> SyncConfig {
        SyncConfig::builder()
            .poll_interval_ms(5)
            .presence_probe_ms(20)
            .find_all_timeout_ms(20)
            .build()
            .unwrap()
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_resolve_symbolic() {
            let ctx = Context::from_registry(login_page(), &registry(), "Login")
                .unwrap()
                .with_config(quick());
            let handle = ctx.resolve_one("Login.Username").unwrap();
            assert_eq!(handle.chain().len(), 1);
            assert_eq!(ctx.text("Login.Username").unwrap(), "alice");
            assert_eq!(ctx.text("Login.Submit").unwrap(), "Sign in");
        }

        #[test]
        fn test_resolve_explicit_spec() {
            let ctx = Context::from_registry(login_page(), &registry(), "Login")
                .unwrap()
                .with_config(quick());
            let spec = LocatorSpec::new("tagName", "button").unwrap();
            assert!(ctx.try_resolve_one(spec).unwrap().is_some());
        }

        #[test]
        fn test_missing_element() {
            let ctx = Context::from_registry(login_page(), &registry(), "Login")
                .unwrap()
                .with_config(quick());
            assert!(ctx.try_resolve_one("Login.Missing").unwrap().is_none());
            let err = ctx.resolve_one("Login.Missing").unwrap_err();
            assert!(matches!(err, TenazError::ElementNotFound { .. }));
        }

        #[test]
        fn test_unknown_name_and_unwired_strategy() {
            let ctx = Context::from_registry(login_page(), &registry(), "Login").unwrap();
            assert!(matches!(
                ctx.query("Login.Nope").unwrap_err(),
                TenazError::LocatorNotFound { .. }
            ));
            assert!(matches!(
                ctx.query("Login.Forgot").unwrap_err(),
                TenazError::CaseNotImplemented { .. }
            ));
        }

        #[test]
        fn test_unknown_repository() {
            let err = Context::from_registry(MockSession::new(), &registry(), "Checkout").unwrap_err();
            assert!(matches!(err, TenazError::Config { .. }));
        }

        #[test]
        fn test_switch_repository() {
            let session = login_page();
            session.add(None, MockNode::new("div").with_class("row"));
            session.add(None, MockNode::new("div").with_class("row"));
            let mut ctx = Context::from_registry(session, &registry(), "Login")
                .unwrap()
                .with_config(quick());
            assert!(ctx.query("Dashboard.Rows").is_err());

            ctx.use_repository(&registry(), "Dashboard").unwrap();
            assert_eq!(ctx.resolver().repository().name(), "Dashboard");
            let rows = ctx.resolve_all("Dashboard.Rows", None, true, Duration::ZERO).unwrap();
            assert_eq!(rows.len(), 2);
            assert!(ctx.query("Login.Username").is_err());
        }
    }

    mod wait_tests {
        use super::*;

        #[test]
        fn test_wait_until_visible() {
            let session = login_page();
            let banner = session.add(None, MockNode::new("div").with_id("banner").hidden());
            session.schedule_displayed(Duration::from_millis(20), &banner, true);
            let ctx = Context::from_registry(session, &registry(), "Login")
                .unwrap()
                .with_config(quick());
            let shown = ctx
                .wait_until(&WaitKind::Visible, DriverQuery::id("banner"), Duration::from_secs(1), false)
                .unwrap();
            assert!(shown);
        }

        #[test]
        fn test_wait_until_soft_timeout() {
            let ctx = Context::from_registry(login_page(), &registry(), "Login")
                .unwrap()
                .with_config(quick());
            let gone = ctx
                .wait_until(&WaitKind::NotExists, "Login.Username", Duration::from_millis(30), false)
                .unwrap();
            assert!(!gone);
        }

        #[test]
        fn test_attribute_via_context() {
            let ctx = Context::from_registry(login_page(), &registry(), "Login")
                .unwrap()
                .with_config(quick());
            let user = ctx.resolve_one("Login.Username").unwrap();
            ctx.session().schedule_attribute(
                Duration::from_millis(15),
                user.node(),
                "aria-invalid",
                Some("false"),
            );
            let result = ctx
                .await_attribute(&user, "aria-invalid", "false", Relation::Equals, Duration::from_secs(1))
                .unwrap();
            assert!(result.satisfied);
            assert_eq!(
                ctx.attribute("Login.Username", "aria-invalid", true).unwrap().as_deref(),
                Some("false")
            );
            assert!(ctx.attribute("Login.Username", "title", false).unwrap().is_none());
        }

        #[test]
        fn test_wait_until_handle_gone() {
            let ctx = Context::from_registry(login_page(), &registry(), "Login")
                .unwrap()
                .with_config(quick());
            let submit = ctx.resolve_one("Login.Submit").unwrap();
            ctx.session()
                .schedule_detach(Duration::from_millis(15), submit.node());
            assert!(ctx
                .wait_until_handle(&WaitKind::NotExists, &submit, Duration::from_secs(1), true)
                .unwrap());
        }

        #[test]
        fn test_child_not_visible() {
            let session = login_page();
            let list = session.add(None, MockNode::new("ul").with_id("toasts"));
            let toast = session.add(Some(&list), MockNode::new("li"));
            session.schedule_detach(Duration::from_millis(15), &toast);
            let ctx = Context::from_registry(session, &registry(), "Login")
                .unwrap()
                .with_config(quick());
            let parent = ctx.resolve_one(DriverQuery::id("toasts")).unwrap();
            assert!(ctx
                .wait_for_child_not_visible(
                    &parent,
                    DriverQuery::TagName("li".into()),
                    Duration::from_secs(1),
                    true
                )
                .unwrap());
        }
    }
}
