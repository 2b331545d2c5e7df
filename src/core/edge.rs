//! # Edge: the root of a tier hierarchy and its runtime.
//!
//! The [`Edge`] owns the root tier (usually an edge [`Tier`](crate::Tier) whose
//! child chain reaches down to nodes and lanes), one [`TokioStage`] that views can
//! share for their continuations, and a [`CancellationToken`] for programmatic
//! shutdown.
//!
//! ## Run path
//! ```text
//! run():
//!   root.request(cfg.target)          (hooks + cascade run inline)
//!   wait for:
//!     ├─ shutdown::wait_for_shutdown_signal()   (cfg.handle_signals)
//!     └─ token.cancelled()                       (Edge::shutdown)
//!   root.close()                      (cascades Stop/Unload/Close downward)
//!   wait_all_with_grace(cfg.grace):
//!     ├─ stage drained in time ─► Ok(())
//!     └─ timeout exceeded      ─► Err(GraceExceeded { grace, pending })
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tierlink::{Edge, EdgeConfig, Lifecycle};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = EdgeConfig {
//!         grace: Duration::from_secs(1),
//!         handle_signals: false,
//!         ..EdgeConfig::default()
//!     };
//!     let edge = Edge::builder(cfg).build();
//!
//!     let token = edge.token();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!         token.cancel();
//!     });
//!
//!     edge.run().await?;
//!     assert!(edge.root().is_closed());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{builder::EdgeBuilder, config::EdgeConfig, shutdown};
use crate::error::RuntimeError;
use crate::lifecycle::TierRef;
use crate::relay::{StageRef, TokioStage};

/// Drives a root tier through its lifecycle and shuts it down gracefully.
pub struct Edge {
    cfg: EdgeConfig,
    root: TierRef,
    stage: Arc<TokioStage>,
    token: CancellationToken,
}

impl Edge {
    pub(super) fn new_internal(
        cfg: EdgeConfig,
        root: TierRef,
        stage: Arc<TokioStage>,
        token: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            root,
            stage,
            token,
        }
    }

    /// Creates a builder for an edge.
    pub fn builder(cfg: EdgeConfig) -> EdgeBuilder {
        EdgeBuilder::new(cfg)
    }

    pub fn config(&self) -> &EdgeConfig {
        &self.cfg
    }

    /// The root tier.
    pub fn root(&self) -> &TierRef {
        &self.root
    }

    /// Shared tokio-backed stage for view continuations.
    pub fn stage(&self) -> StageRef {
        Arc::clone(&self.stage) as StageRef
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Requests shutdown; same as cancelling [`token`](Self::token).
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Brings the root tier to the configured target and keeps it there until
    /// a termination signal or [`shutdown`](Self::shutdown), then closes it and
    /// waits up to the grace period for stage work to finish.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        tracing::info!(target_phase = %self.cfg.target, "edge starting");
        self.root.request(self.cfg.target);
        tracing::info!(state = ?self.root.state(), "edge running");
        self.drive_shutdown().await
    }

    async fn drive_shutdown(&self) -> Result<(), RuntimeError> {
        let signalled = if self.cfg.handle_signals {
            tokio::select! {
                res = shutdown::wait_for_shutdown_signal() => res,
                _ = self.token.cancelled() => Ok(()),
            }
        } else {
            self.token.cancelled().await;
            Ok(())
        };

        tracing::info!("edge shutting down");
        self.root.close();
        let drained = self.wait_all_with_grace().await;
        signalled?;
        drained
    }

    /// Waits for every task submitted to the edge stage within the grace period.
    async fn wait_all_with_grace(&self) -> Result<(), RuntimeError> {
        let tracker = self.stage.tracker();
        tracker.close();

        let Some(grace) = self.cfg.shutdown_grace() else {
            tracing::debug!(pending = tracker.len(), "grace disabled; not waiting");
            return Ok(());
        };
        match tokio::time::timeout(grace, tracker.wait()).await {
            Ok(()) => {
                tracing::info!("all stage work finished within grace");
                Ok(())
            }
            Err(_) => {
                let pending = tracker.len();
                tracing::error!(?grace, pending, "grace exceeded");
                Err(RuntimeError::GraceExceeded { grace, pending })
            }
        }
    }
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Edge")
            .field("cfg", &self.cfg)
            .field("root", &self.root.state())
            .field("stage", &self.stage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::lifecycle::{Lifecycle, Phase, Tier, TierKind};
    use crate::links::LinkModel;
    use crate::testing::{Journal, Witness};

    fn quiet(grace: Duration) -> EdgeConfig {
        EdgeConfig {
            grace,
            handle_signals: false,
            ..EdgeConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_starts_root_and_closes_it_on_shutdown() {
        let root = Arc::new(Tier::new(TierKind::Edge, "edge", Journal::default()));
        let edge = Arc::new(
            Edge::builder(quiet(Duration::from_secs(1)))
                .with_root(root.clone())
                .build(),
        );

        let running = tokio::spawn({
            let edge = Arc::clone(&edge);
            async move { edge.run().await }
        });
        tokio::task::yield_now().await;
        while !root.is_started() {
            tokio::task::yield_now().await;
        }

        edge.shutdown();
        let res = running.await.expect("join");
        assert!(res.is_ok(), "{res:?}");
        assert!(root.is_closed());
        assert_eq!(root.hooks().entries().len(), 12);
        root.hooks().assert_balanced();
    }

    #[tokio::test]
    async fn test_run_honours_configured_target() {
        let root = Arc::new(Tier::new(TierKind::Edge, "edge", Journal::default()));
        let cfg = EdgeConfig {
            target: Phase::Loaded,
            ..quiet(Duration::ZERO)
        };
        let edge = Edge::builder(cfg).with_root(root.clone()).build();
        edge.shutdown();

        edge.run().await.expect("run");
        let entries = root.hooks().entries();
        assert!(entries.contains(&"did:load".to_string()));
        assert!(!entries.contains(&"will:start".to_string()));
        assert!(root.is_closed());
    }

    #[tokio::test]
    async fn test_shutdown_cascades_into_lane_views() {
        let edge_tier = Arc::new(Tier::new(TierKind::Edge, "edge", ()));
        let edge = Edge::builder(quiet(Duration::from_secs(1)))
            .with_root(edge_tier.clone())
            .build();

        let lane = LinkModel::new(TierKind::Lane, "lane", ());
        let view = Arc::new(Witness::on_stage("v", edge.stage()));
        lane.attach(view.clone());
        let node = Arc::new(Tier::new(TierKind::Node, "node", ()));
        node.set_child(lane.clone());
        edge_tier.set_child(node.clone());

        edge.shutdown();
        edge.run().await.expect("run");

        assert!(node.is_closed());
        assert!(lane.is_closed());
        assert_eq!(view.entries(), ["open", "closed"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_grace_exceeded_reports_pending_work() {
        let edge = Edge::builder(quiet(Duration::from_millis(20))).build();
        edge.stage().execute(Box::new(|| {
            std::thread::sleep(Duration::from_millis(300));
        }));
        edge.shutdown();

        match edge.run().await {
            Err(RuntimeError::GraceExceeded { pending, grace }) => {
                assert_eq!(pending, 1);
                assert_eq!(grace, Duration::from_millis(20));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_relay_continuations_run_on_edge_stage() {
        let edge = Edge::builder(quiet(Duration::from_secs(1))).build();
        let lane = LinkModel::new(TierKind::Lane, "lane", ());
        let view = Arc::new(Witness::on_stage("v", edge.stage()).deferring());
        lane.attach(view.clone());

        lane.on_connected();
        assert_eq!(view.entries(), ["open", "defer:connect"]);

        edge.shutdown();
        edge.run().await.expect("run");
        assert_eq!(view.entries(), ["open", "defer:connect", "connect"]);
        assert_eq!(lane.stats().handed_off, 1);
    }
}
