//! Wait Mechanisms
//!
//! Bounded polling on the calling thread. One loop, [`Waiter::poll_fn`],
//! backs every wait in the crate: the presence waits of the finder, the
//! locator waits in [`ElementWaits`], and the attribute waits.
//!
//! ## Loop contract
//!
//! - The condition is checked, then the loop sleeps for
//!   `min(poll_interval, remaining)` and checks again. It never sleeps past
//!   the deadline and always makes one last check at it.
//! - A condition that fails with staleness or absence counts as "not yet".
//!   Any other error aborts the wait.
//! - A zero timeout means the configured default.
//! - Sleeps last at least [`MIN_POLL_INTERVAL`], even for a zero interval.

use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{SyncConfig, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::finder::ElementFinder;
use crate::handle::ElementHandle;
use crate::result::{TenazError, TenazResult};
use crate::session::{displayed_or_gone, NodeRef, Session};
use crate::strategy::DriverQuery;

/// Floor for the sleep between two checks
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds; zero means the default
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Fail with [`TenazError::Timeout`] instead of returning unsatisfied
    pub throw_on_timeout: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            throw_on_timeout: true,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options carrying a configuration's timing
    #[must_use]
    pub const fn from_config(config: &SyncConfig) -> Self {
        Self {
            timeout_ms: config.default_timeout_ms,
            poll_interval_ms: config.poll_interval_ms,
            throw_on_timeout: true,
        }
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Choose between failing and returning unsatisfied on timeout
    #[must_use]
    pub const fn with_throw_on_timeout(mut self, throw: bool) -> Self {
        self.throw_on_timeout = throw;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// POLL CONDITION TRAIT
// =============================================================================

/// A predicate over current session state, polled until true
pub trait PollCondition {
    /// Check if the condition is satisfied
    fn check(&self) -> TenazResult<bool>;

    /// Get description for log and error messages
    fn description(&self) -> String;
}

/// A function-based poll condition
pub struct FnCondition<F: Fn() -> TenazResult<bool>> {
    func: F,
    description: String,
}

impl<F: Fn() -> TenazResult<bool>> std::fmt::Debug for FnCondition<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCondition")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<F: Fn() -> TenazResult<bool>> FnCondition<F> {
    /// Create a new function condition
    pub fn new(func: F, description: impl Into<String>) -> Self {
        Self {
            func,
            description: description.into(),
        }
    }
}

impl<F: Fn() -> TenazResult<bool>> PollCondition for FnCondition<F> {
    fn check(&self) -> TenazResult<bool> {
        (self.func)()
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a wait operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Whether the condition became true
    pub satisfied: bool,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

impl WaitResult {
    /// Create a satisfied wait result
    #[must_use]
    pub fn success(elapsed: Duration, waited_for: impl Into<String>) -> Self {
        Self {
            satisfied: true,
            elapsed,
            waited_for: waited_for.into(),
        }
    }

    /// Create a timed-out wait result
    #[must_use]
    pub fn timeout(elapsed: Duration, waited_for: impl Into<String>) -> Self {
        Self {
            satisfied: false,
            elapsed,
            waited_for: waited_for.into(),
        }
    }

    /// Elapsed time in whole milliseconds
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

// =============================================================================
// WAITER IMPLEMENTATION
// =============================================================================

/// Runs bounded polling loops
#[derive(Debug, Clone, Default)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a new waiter with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options
    #[must_use]
    pub const fn with_options(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Create with a configuration's timing
    #[must_use]
    pub const fn from_config(config: &SyncConfig) -> Self {
        Self::with_options(WaitOptions::from_config(config))
    }

    /// Default options of this waiter
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// A zero timeout means the waiter's default, and a zero default means
    /// [`DEFAULT_TIMEOUT_MS`]
    #[must_use]
    pub const fn effective_timeout(&self, timeout: Duration) -> Duration {
        if !timeout.is_zero() {
            timeout
        } else if self.options.timeout_ms == 0 {
            Duration::from_millis(DEFAULT_TIMEOUT_MS)
        } else {
            self.options.timeout()
        }
    }

    /// Wait for a condition using explicit options
    pub fn wait_for<C: PollCondition + ?Sized>(
        &self,
        condition: &C,
        options: &WaitOptions,
    ) -> TenazResult<WaitResult> {
        let timeout = self.effective_timeout(options.timeout());
        self.run(
            &condition.description(),
            timeout,
            options.poll_interval(),
            options.throw_on_timeout,
            || condition.check(),
        )
    }

    /// Poll a condition with this waiter's interval
    pub fn poll<C: PollCondition + ?Sized>(
        &self,
        condition: &C,
        timeout: Duration,
        throw_on_timeout: bool,
    ) -> TenazResult<WaitResult> {
        self.poll_fn(&condition.description(), timeout, throw_on_timeout, || {
            condition.check()
        })
    }

    /// Poll a closure with this waiter's interval. The closure may carry
    /// state between checks.
    pub fn poll_fn<F>(
        &self,
        description: &str,
        timeout: Duration,
        throw_on_timeout: bool,
        check: F,
    ) -> TenazResult<WaitResult>
    where
        F: FnMut() -> TenazResult<bool>,
    {
        self.run(
            description,
            self.effective_timeout(timeout),
            self.options.poll_interval(),
            throw_on_timeout,
            check,
        )
    }

    fn run<F>(
        &self,
        description: &str,
        timeout: Duration,
        poll_interval: Duration,
        throw_on_timeout: bool,
        mut check: F,
    ) -> TenazResult<WaitResult>
    where
        F: FnMut() -> TenazResult<bool>,
    {
        let start = Instant::now();
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);

        loop {
            match check() {
                Ok(true) => {
                    let result = WaitResult::success(start.elapsed(), description);
                    debug!(waited_for = description, elapsed_ms = result.elapsed_ms(), "condition met");
                    return Ok(result);
                }
                Ok(false) => {}
                Err(err) if err.is_stale() || err.is_absence() => {
                    debug!(waited_for = description, error = %err, "ignoring transient error while polling");
                }
                Err(err) => return Err(err),
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                break;
            }
            std::thread::sleep(poll_interval.min(timeout - elapsed));
        }

        let elapsed = start.elapsed();
        if throw_on_timeout {
            error!(waited_for = description, timeout_ms, "wait timed out");
            return Err(TenazError::Timeout {
                waited_for: description.to_string(),
                ms: timeout_ms,
            });
        }
        warn!(waited_for = description, timeout_ms, "wait timed out");
        Ok(WaitResult::timeout(elapsed, description))
    }
}

// =============================================================================
// ELEMENT WAITS
// =============================================================================

/// Element state a locator wait can target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitKind {
    /// Displayed and enabled
    Clickable,
    /// Displayed
    Visible,
    /// Not displayed, or gone
    NotVisible,
    /// Present in the document
    Exists,
    /// Absent from the document
    NotExists,
    /// Visible text contains the given string
    TextPresent(String),
}

impl WaitKind {
    /// Whether reaching this state signals that the page moved on
    #[must_use]
    pub const fn marks_transition(&self) -> bool {
        matches!(self, Self::NotVisible | Self::NotExists)
    }

    /// Evaluate against the current matches of a locator
    pub fn holds_for<S: Session + ?Sized>(&self, session: &S, nodes: &[NodeRef]) -> TenazResult<bool> {
        match self {
            Self::Exists => Ok(!nodes.is_empty()),
            Self::NotExists => Ok(nodes.is_empty()),
            Self::NotVisible => {
                for node in nodes {
                    if displayed_or_gone(session, node)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Visible => any(nodes, |node| displayed_or_gone(session, node)),
            Self::Clickable => any(nodes, |node| {
                Ok(displayed_or_gone(session, node)? && session.is_enabled(node)?)
            }),
            Self::TextPresent(text) => any(nodes, |node| Ok(session.text(node)?.contains(text.as_str()))),
        }
    }

    fn describe(&self, target: &impl std::fmt::Display) -> String {
        match self {
            Self::Clickable => format!("{target} to be clickable"),
            Self::Visible => format!("{target} to be visible"),
            Self::NotVisible => format!("{target} to be not visible"),
            Self::Exists => format!("{target} to exist"),
            Self::NotExists => format!("{target} to not exist"),
            Self::TextPresent(text) => format!("text {text:?} in {target}"),
        }
    }
}

impl std::fmt::Display for WaitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clickable => f.write_str("clickable"),
            Self::Visible => f.write_str("visible"),
            Self::NotVisible => f.write_str("not visible"),
            Self::Exists => f.write_str("exists"),
            Self::NotExists => f.write_str("not exists"),
            Self::TextPresent(text) => write!(f, "text present {text:?}"),
        }
    }
}

fn any<F>(nodes: &[NodeRef], mut pred: F) -> TenazResult<bool>
where
    F: FnMut(&NodeRef) -> TenazResult<bool>,
{
    for node in nodes {
        if pred(node)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Locator and handle waits over one session
#[derive(Debug)]
pub struct ElementWaits<'a, S: Session + ?Sized> {
    finder: ElementFinder<'a, S>,
    waiter: Waiter,
}

impl<'a, S: Session + ?Sized> ElementWaits<'a, S> {
    /// Create waits over a session
    #[must_use]
    pub const fn new(session: &'a S, config: &'a SyncConfig) -> Self {
        Self {
            finder: ElementFinder::new(session, config),
            waiter: Waiter::from_config(config),
        }
    }

    /// Wait until the elements matching `query` reach `kind`
    pub fn wait_for(
        &self,
        kind: &WaitKind,
        query: &DriverQuery,
        timeout: Duration,
        throw_on_timeout: bool,
    ) -> TenazResult<WaitResult> {
        let description = kind.describe(query);
        let result = self.waiter.poll_fn(&description, timeout, throw_on_timeout, || {
            let nodes = self.finder.nodes(None, query)?;
            kind.holds_for(self.finder.session(), &nodes)
        })?;
        Self::log_transition(kind.marks_transition(), &result);
        Ok(result)
    }

    /// Wait until an already found element reaches `kind`.
    ///
    /// `Exists` means the handle is still live and `NotExists` that it went
    /// stale. No recovery is attempted.
    pub fn wait_for_handle(
        &self,
        kind: &WaitKind,
        handle: &ElementHandle,
        timeout: Duration,
        throw_on_timeout: bool,
    ) -> TenazResult<WaitResult> {
        let description = kind.describe(handle);
        let result = self.waiter.poll_fn(&description, timeout, throw_on_timeout, || {
            let stale = self.finder.is_stale(handle);
            match kind {
                WaitKind::Exists => Ok(!stale),
                WaitKind::NotExists => Ok(stale),
                WaitKind::NotVisible if stale => Ok(true),
                _ if stale => Ok(false),
                _ => kind.holds_for(self.finder.session(), std::slice::from_ref(handle.node())),
            }
        })?;
        Self::log_transition(kind.marks_transition(), &result);
        Ok(result)
    }

    /// Wait until `child` no longer matches anything under `parent`.
    ///
    /// A parent that left the document counts as satisfied.
    pub fn wait_for_child_not_visible(
        &self,
        parent: &ElementHandle,
        child: &DriverQuery,
        timeout: Duration,
        throw_on_timeout: bool,
    ) -> TenazResult<WaitResult> {
        let description = format!("{child} under {parent} to be not visible");
        let result = self.waiter.poll_fn(&description, timeout, throw_on_timeout, || {
            match self.finder.nodes(Some(parent.node()), child) {
                Ok(nodes) => Ok(nodes.is_empty()),
                Err(err) if err.is_stale() => Ok(true),
                Err(err) => Err(err),
            }
        })?;
        Self::log_transition(true, &result);
        Ok(result)
    }

    fn log_transition(transition: bool, result: &WaitResult) {
        if transition && result.satisfied {
            info!(
                waited_for = %result.waited_for,
                elapsed_ms = result.elapsed_ms(),
                "page transition observed"
            );
        }
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Wait for a predicate, failing on timeout.
///
/// Polls every [`DEFAULT_POLL_INTERVAL_MS`] and treats a zero timeout as
/// [`DEFAULT_TIMEOUT_MS`], whatever [`SyncConfig`] the caller holds. Use
/// [`wait_until_with`] to poll on a configuration's timing.
pub fn wait_until<F>(predicate: F, timeout_ms: u64) -> TenazResult<()>
where
    F: Fn() -> bool,
{
    wait_until_with(&SyncConfig::default(), predicate, timeout_ms)
}

/// Wait for a predicate on the timing of `config`, failing on timeout
pub fn wait_until_with<F>(config: &SyncConfig, predicate: F, timeout_ms: u64) -> TenazResult<()>
where
    F: Fn() -> bool,
{
    let waiter = Waiter::from_config(config);
    let options = WaitOptions::from_config(config).with_timeout(timeout_ms);
    let condition = FnCondition::new(|| Ok(predicate()), "predicate");
    waiter.wait_for(&condition, &options)?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{MockNode, MockSession};
    use std::cell::Cell;

    fn quick_config() -> SyncConfig {
        SyncConfig::builder().poll_interval_ms(5).build().unwrap()
    }

    // =========================================================================
    // WaitOptions Tests
    // =========================================================================

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, 10_000);
            assert_eq!(opts.poll_interval_ms, 50);
            assert!(opts.throw_on_timeout);
        }

        #[test]
        fn test_builder() {
            let opts = WaitOptions::new()
                .with_timeout(5_000)
                .with_poll_interval(100)
                .with_throw_on_timeout(false);
            assert_eq!(opts.timeout(), Duration::from_secs(5));
            assert_eq!(opts.poll_interval(), Duration::from_millis(100));
            assert!(!opts.throw_on_timeout);
        }

        #[test]
        fn test_from_config() {
            let config = SyncConfig::builder()
                .default_timeout_ms(1_234)
                .poll_interval_ms(7)
                .build()
                .unwrap();
            let opts = WaitOptions::from_config(&config);
            assert_eq!(opts.timeout_ms, 1_234);
            assert_eq!(opts.poll_interval_ms, 7);
        }
    }

    // =========================================================================
    // Poll loop Tests
    // =========================================================================

    mod poll_tests {
        use super::*;

        #[test]
        fn test_immediately_true() {
            let waiter = Waiter::from_config(&quick_config());
            let result = waiter
                .poll_fn("always", Duration::from_millis(100), true, || Ok(true))
                .unwrap();
            assert!(result.satisfied);
            assert!(result.elapsed < Duration::from_millis(50));
        }

        #[test]
        fn test_becomes_true_at_t() {
            let waiter = Waiter::from_config(&quick_config());
            let start = Instant::now();
            let result = waiter
                .poll_fn("after 60ms", Duration::from_millis(1_000), true, || {
                    Ok(start.elapsed() >= Duration::from_millis(60))
                })
                .unwrap();
            assert!(result.satisfied);
            assert!(result.elapsed >= Duration::from_millis(60));
            assert!(result.elapsed < Duration::from_millis(300), "{:?}", result.elapsed);
        }

        #[test]
        fn test_never_true_soft_stops_at_timeout() {
            let config = SyncConfig::builder().poll_interval_ms(40).build().unwrap();
            let waiter = Waiter::from_config(&config);
            let result = waiter
                .poll_fn("never", Duration::from_millis(100), false, || Ok(false))
                .unwrap();
            assert!(!result.satisfied);
            assert!(result.elapsed >= Duration::from_millis(100));
            assert!(result.elapsed < Duration::from_millis(300), "{:?}", result.elapsed);
        }

        #[test]
        fn test_never_true_hard() {
            let waiter = Waiter::from_config(&quick_config());
            let err = waiter
                .poll_fn("the moon", Duration::from_millis(30), true, || Ok(false))
                .unwrap_err();
            match err {
                TenazError::Timeout { waited_for, ms } => {
                    assert_eq!(waited_for, "the moon");
                    assert_eq!(ms, 30);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_last_check_at_deadline() {
            let config = SyncConfig::builder().poll_interval_ms(1_000).build().unwrap();
            let waiter = Waiter::from_config(&config);
            let calls = Cell::new(0);
            let result = waiter
                .poll_fn("second check", Duration::from_millis(30), false, || {
                    calls.set(calls.get() + 1);
                    Ok(calls.get() == 2)
                })
                .unwrap();
            assert!(result.satisfied);
            assert!(result.elapsed < Duration::from_millis(500));
        }

        #[test]
        fn test_zero_timeout_uses_default() {
            let config = SyncConfig::builder()
                .default_timeout_ms(40)
                .poll_interval_ms(5)
                .build()
                .unwrap();
            let waiter = Waiter::from_config(&config);
            let result = waiter
                .poll_fn("never", Duration::ZERO, false, || Ok(false))
                .unwrap();
            assert!(result.elapsed >= Duration::from_millis(40));
        }

        #[test]
        fn test_zero_default_timeout_falls_back() {
            let waiter = Waiter::with_options(WaitOptions::new().with_timeout(0));
            assert_eq!(
                waiter.effective_timeout(Duration::ZERO),
                Duration::from_millis(DEFAULT_TIMEOUT_MS)
            );
            assert_eq!(
                waiter.effective_timeout(Duration::from_millis(15)),
                Duration::from_millis(15)
            );
        }

        #[test]
        fn test_zero_poll_interval_still_sleeps() {
            let waiter = Waiter::with_options(WaitOptions::new().with_poll_interval(0));
            let calls = Cell::new(0_u32);
            let result = waiter
                .poll_fn("never", Duration::from_millis(50), false, || {
                    calls.set(calls.get() + 1);
                    Ok(false)
                })
                .unwrap();
            assert!(!result.satisfied);
            assert!(calls.get() <= 60, "checked {} times", calls.get());
        }

        #[test]
        fn test_zero_poll_interval_in_explicit_options() {
            let waiter = Waiter::new();
            let calls = Cell::new(0_u32);
            let condition = FnCondition::new(
                || {
                    calls.set(calls.get() + 1);
                    Ok(false)
                },
                "never",
            );
            let options = WaitOptions::new()
                .with_timeout(30)
                .with_poll_interval(0)
                .with_throw_on_timeout(false);
            let result = waiter.wait_for(&condition, &options).unwrap();
            assert!(!result.satisfied);
            assert!(calls.get() <= 40, "checked {} times", calls.get());
        }

        #[test]
        fn test_wait_until_with_config() {
            let config = SyncConfig::builder()
                .poll_interval_ms(5)
                .build()
                .unwrap();
            let start = Instant::now();
            let calls = Cell::new(0_u32);
            wait_until_with(
                &config,
                || {
                    calls.set(calls.get() + 1);
                    start.elapsed() >= Duration::from_millis(40)
                },
                1_000,
            )
            .unwrap();
            assert!(calls.get() >= 3, "checked {} times", calls.get());

            let err = wait_until_with(&config, || false, 20).unwrap_err();
            assert!(err.is_timeout());
        }

        #[test]
        fn test_transient_errors_ignored() {
            let waiter = Waiter::from_config(&quick_config());
            let calls = Cell::new(0);
            let result = waiter
                .poll_fn("flaky", Duration::from_millis(500), true, || {
                    calls.set(calls.get() + 1);
                    match calls.get() {
                        1 => Err(TenazError::stale("x")),
                        2 => Err(TenazError::ElementNotFound { query: "id: x".into() }),
                        _ => Ok(true),
                    }
                })
                .unwrap();
            assert!(result.satisfied);
            assert_eq!(calls.get(), 3);
        }

        #[test]
        fn test_other_errors_abort() {
            let waiter = Waiter::from_config(&quick_config());
            let err = waiter
                .poll_fn("broken", Duration::from_millis(500), true, || {
                    Err(TenazError::session("connection reset"))
                })
                .unwrap_err();
            assert!(matches!(err, TenazError::Session { .. }));
        }

        #[test]
        fn test_condition_trait() {
            let waiter = Waiter::from_config(&quick_config());
            let condition = FnCondition::new(|| Ok(true), "trivially true");
            let result = waiter.poll(&condition, Duration::from_millis(10), true).unwrap();
            assert_eq!(result.waited_for, "trivially true");
            let result = waiter
                .wait_for(&condition, &WaitOptions::new().with_timeout(10))
                .unwrap();
            assert!(result.satisfied);
        }

        #[test]
        fn test_fn_condition_debug() {
            let condition = FnCondition::new(|| Ok(false), "debuggable");
            assert!(format!("{condition:?}").contains("debuggable"));
        }

        #[test]
        fn test_wait_until() {
            assert!(wait_until(|| true, 10).is_ok());
            assert!(wait_until(|| false, 20).unwrap_err().is_timeout());
        }
    }

    // =========================================================================
    // WaitKind Tests
    // =========================================================================

    mod wait_kind_tests {
        use super::*;

        #[test]
        fn test_kinds_over_nodes() {
            let session = MockSession::new();
            let shown = session.add(None, MockNode::new("button").with_text("Save"));
            let hidden = session.add(None, MockNode::new("button").hidden());
            let disabled = session.add(None, MockNode::new("button").with_attr("disabled", ""));

            assert!(WaitKind::Visible.holds_for(&session, &[hidden.clone(), shown.clone()]).unwrap());
            assert!(!WaitKind::Visible.holds_for(&session, &[hidden.clone()]).unwrap());
            assert!(WaitKind::NotVisible.holds_for(&session, &[hidden.clone()]).unwrap());
            assert!(WaitKind::NotVisible.holds_for(&session, &[]).unwrap());
            assert!(!WaitKind::Clickable.holds_for(&session, &[disabled]).unwrap());
            assert!(WaitKind::Clickable.holds_for(&session, &[shown.clone()]).unwrap());
            assert!(WaitKind::TextPresent("Sav".into()).holds_for(&session, &[shown]).unwrap());
            assert!(WaitKind::Exists.holds_for(&session, &[hidden]).unwrap());
            assert!(WaitKind::NotExists.holds_for(&session, &[]).unwrap());
        }

        #[test]
        fn test_detached_node_is_not_visible() {
            let session = MockSession::new();
            let node = session.add(None, MockNode::new("div"));
            session.detach(&node);
            assert!(WaitKind::NotVisible.holds_for(&session, &[node]).unwrap());
        }

        #[test]
        fn test_display() {
            assert_eq!(WaitKind::NotExists.to_string(), "not exists");
            assert!(WaitKind::NotVisible.marks_transition());
            assert!(!WaitKind::Visible.marks_transition());
        }
    }

    // =========================================================================
    // Element wait Tests
    // =========================================================================

    mod element_wait_tests {
        use super::*;

        #[test]
        fn test_wait_for_visible_after_reveal() {
            let session = MockSession::new();
            let spinner = session.add(None, MockNode::new("div").with_id("result").hidden());
            session.schedule_displayed(Duration::from_millis(30), &spinner, true);
            let config = quick_config();
            let waits = ElementWaits::new(&session, &config);

            let result = waits
                .wait_for(&WaitKind::Visible, &DriverQuery::id("result"), Duration::from_secs(1), true)
                .unwrap();
            assert!(result.satisfied);
            assert!(result.elapsed >= Duration::from_millis(25));
        }

        #[test]
        fn test_wait_for_not_exists_soft_timeout() {
            let session = MockSession::new();
            session.add(None, MockNode::new("div").with_id("overlay"));
            let config = quick_config();
            let waits = ElementWaits::new(&session, &config);

            let result = waits
                .wait_for(&WaitKind::NotExists, &DriverQuery::id("overlay"), Duration::from_millis(30), false)
                .unwrap();
            assert!(!result.satisfied);
        }

        #[test]
        fn test_wait_for_not_exists_after_detach() {
            let session = MockSession::new();
            let overlay = session.add(None, MockNode::new("div").with_id("overlay"));
            session.schedule_detach(Duration::from_millis(20), &overlay);
            let config = quick_config();
            let waits = ElementWaits::new(&session, &config);

            let result = waits
                .wait_for(&WaitKind::NotExists, &DriverQuery::id("overlay"), Duration::from_secs(1), true)
                .unwrap();
            assert!(result.satisfied);
        }

        #[test]
        fn test_wait_for_text_present() {
            let session = MockSession::new();
            let status = session.add(None, MockNode::new("p").with_id("status").with_text("Saving"));
            session.schedule_text(Duration::from_millis(20), &status, "Saved");
            let config = quick_config();
            let waits = ElementWaits::new(&session, &config);

            let result = waits
                .wait_for(
                    &WaitKind::TextPresent("Saved".into()),
                    &DriverQuery::id("status"),
                    Duration::from_secs(1),
                    true,
                )
                .unwrap();
            assert!(result.satisfied);
        }

        #[test]
        fn test_handle_waits_on_staleness() {
            let session = MockSession::new();
            let node = session.add(None, MockNode::new("div").with_id("toast"));
            let handle = ElementHandle::detached(node.clone());
            let config = quick_config();
            let waits = ElementWaits::new(&session, &config);

            assert!(waits
                .wait_for_handle(&WaitKind::Exists, &handle, Duration::from_millis(20), true)
                .unwrap()
                .satisfied);

            session.detach(&node);
            for kind in [WaitKind::NotExists, WaitKind::NotVisible] {
                assert!(waits
                    .wait_for_handle(&kind, &handle, Duration::from_millis(20), true)
                    .unwrap()
                    .satisfied);
            }
            assert!(!waits
                .wait_for_handle(&WaitKind::Visible, &handle, Duration::from_millis(20), false)
                .unwrap()
                .satisfied);
        }

        #[test]
        fn test_child_not_visible() {
            let session = MockSession::new();
            let table = session.add(None, MockNode::new("table").with_id("grid"));
            let row = session.add(Some(&table), MockNode::new("tr").with_class("loading"));
            session.schedule_detach(Duration::from_millis(20), &row);
            let config = quick_config();
            let waits = ElementWaits::new(&session, &config);
            let parent = ElementHandle::detached(table);

            let result = waits
                .wait_for_child_not_visible(
                    &parent,
                    &DriverQuery::ClassName("loading".into()),
                    Duration::from_secs(1),
                    true,
                )
                .unwrap();
            assert!(result.satisfied);
            assert!(result.elapsed >= Duration::from_millis(15));
        }

        #[test]
        fn test_child_not_visible_with_stale_parent() {
            let session = MockSession::new();
            let table = session.add(None, MockNode::new("table"));
            session.add(Some(&table), MockNode::new("tr").with_class("loading"));
            session.detach(&table);
            let config = quick_config();
            let waits = ElementWaits::new(&session, &config);

            let result = waits
                .wait_for_child_not_visible(
                    &ElementHandle::detached(table),
                    &DriverQuery::ClassName("loading".into()),
                    Duration::from_millis(50),
                    true,
                )
                .unwrap();
            assert!(result.satisfied);
        }
    }
}
