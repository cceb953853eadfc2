//! Path Reconstruction
//!
//! Rebuilds a live handle for an element whose reference went stale, by
//! replaying its ancestor chain from the session root.
//!
//! ```text
//!   root ──id: list──▶ <ul> ──tag name: li [2]──▶ <li>   (stale)
//!                                   │
//!                    replay         ▼
//!   root ──id: list──▶ <ul'> ──tag name: li [2]──▶ <li'>  (fresh)
//! ```
//!
//! Every hop must match at least one node. A hop recorded with a position
//! picks that match; other hops fall back to the visible-first pick.

use tracing::{debug, info};

use crate::handle::{AncestorChain, ChainStep, ElementHandle};
use crate::result::{TenazError, TenazResult};
use crate::session::{prefer_visible, NodeRef, Session};
use crate::strategy::DriverQuery;

/// Final-hop selection for a rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildOptions {
    /// Take the n-th match at the final hop instead of the recorded pick
    pub index: Option<usize>,
    /// Substitute the parent of the final node
    pub use_parent: bool,
}

impl RebuildOptions {
    /// Default rebuild: recorded positions, no parent substitution
    #[must_use]
    pub const fn new() -> Self {
        Self {
            index: None,
            use_parent: false,
        }
    }

    /// Pick the n-th match at the final hop
    #[must_use]
    pub const fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Return the parent of the final node
    #[must_use]
    pub const fn with_parent(mut self) -> Self {
        self.use_parent = true;
        self
    }
}

/// Replays ancestor chains against a session
#[derive(Debug)]
pub struct PathReconstructor<'a, S: Session + ?Sized> {
    session: &'a S,
}

impl<'a, S: Session + ?Sized> PathReconstructor<'a, S> {
    /// Create a reconstructor over a session
    #[must_use]
    pub const fn new(session: &'a S) -> Self {
        Self { session }
    }

    /// Rebuild a handle with default options
    pub fn rebuild(&self, handle: &ElementHandle) -> TenazResult<ElementHandle> {
        self.rebuild_with(handle, RebuildOptions::default())
    }

    /// Rebuild a handle, selecting the final hop per `options`
    pub fn rebuild_with(
        &self,
        handle: &ElementHandle,
        options: RebuildOptions,
    ) -> TenazResult<ElementHandle> {
        self.run(handle, options, format!("rebuild requested for {handle}"))
    }

    /// Rebuild a handle after `cause` reported it stale.
    ///
    /// A failure carries `cause` so the caller still sees what went stale.
    pub fn recover(
        &self,
        handle: &ElementHandle,
        options: RebuildOptions,
        cause: &TenazError,
    ) -> TenazResult<ElementHandle> {
        self.run(handle, options, cause.to_string())
    }

    fn run(
        &self,
        handle: &ElementHandle,
        options: RebuildOptions,
        stale: String,
    ) -> TenazResult<ElementHandle> {
        let failed = |reason: String| TenazError::ReconstructionFailed {
            element: handle.to_string(),
            reason,
            stale: stale.clone(),
        };

        let decoded;
        let chain = if handle.chain().is_empty() {
            let description = self
                .session
                .describe(handle.node())
                .ok_or_else(|| failed("no ancestor chain recorded".to_string()))?;
            decoded = AncestorChain::from_description(&description)
                .map_err(|reason| failed(format!("undecodable description: {reason}")))?;
            &decoded
        } else {
            handle.chain()
        };

        debug!(element = %handle, hops = chain.len(), "rebuilding element from session root");
        let fresh = self.walk(chain, options).map_err(failed)?;
        info!(element = %handle, node = %fresh.node(), "rebuilt stale element");
        Ok(fresh)
    }

    fn walk(&self, chain: &AncestorChain, options: RebuildOptions) -> Result<ElementHandle, String> {
        let last = chain.len().saturating_sub(1);
        let mut scope: Option<NodeRef> = None;
        let mut rebuilt = AncestorChain::new();

        for (hop, step) in chain.steps().iter().enumerate() {
            let nodes = self
                .session
                .find_nodes(scope.as_ref(), &step.query)
                .map_err(|e| format!("hop {} ({}) failed: {e}", hop + 1, step.query))?;
            if nodes.is_empty() {
                return Err(format!("hop {} ({}) matched nothing", hop + 1, step.query));
            }

            let position = if hop == last {
                options.index.or(step.position)
            } else {
                step.position
            };
            let node = match position {
                Some(n) => nodes.get(n).cloned().ok_or_else(|| {
                    format!(
                        "hop {} ({}) has {} matches, wanted index {n}",
                        hop + 1,
                        step.query,
                        nodes.len()
                    )
                })?,
                None => prefer_visible(self.session, &nodes)
                    .map_err(|e| format!("hop {} ({}) failed: {e}", hop + 1, step.query))?
                    .ok_or_else(|| format!("hop {} ({}) matched nothing", hop + 1, step.query))?,
            };

            rebuilt.push(ChainStep {
                query: step.query.clone(),
                position,
            });
            scope = Some(node);
        }

        let mut node = scope.ok_or_else(|| "empty ancestor chain".to_string())?;
        if options.use_parent {
            let parent = DriverQuery::parent();
            node = self
                .session
                .find_nodes(Some(&node), &parent)
                .map_err(|e| format!("parent lookup failed: {e}"))?
                .into_iter()
                .next()
                .ok_or_else(|| "matched node has no parent".to_string())?;
            rebuilt.push(ChainStep::new(parent));
        }

        Ok(ElementHandle::new(node, rebuilt))
    }
}
