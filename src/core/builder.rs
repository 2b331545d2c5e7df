use std::sync::Arc;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use super::{config::EdgeConfig, edge::Edge};
use crate::lifecycle::{Tier, TierKind, TierRef};
use crate::relay::TokioStage;

/// Builder for an [`Edge`].
pub struct EdgeBuilder {
    cfg: EdgeConfig,
    root: Option<TierRef>,
    handle: Option<Handle>,
}

impl EdgeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: EdgeConfig) -> Self {
        Self {
            cfg,
            root: None,
            handle: None,
        }
    }

    /// Sets the root tier. Without one the edge drives an empty edge tier.
    pub fn with_root(mut self, root: TierRef) -> Self {
        self.root = Some(root);
        self
    }

    /// Sets the runtime the edge stage spawns onto.
    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Builds the edge.
    ///
    /// # Panics
    /// Panics when no handle was given and this is called outside a tokio runtime.
    pub fn build(self) -> Edge {
        let handle = self.handle.unwrap_or_else(Handle::current);
        let root = self
            .root
            .unwrap_or_else(|| Arc::new(Tier::new(TierKind::Edge, "edge", ())));
        let stage = Arc::new(TokioStage::new("edge", handle));
        Edge::new_internal(self.cfg, root, stage, CancellationToken::new())
    }
}
