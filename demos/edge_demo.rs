//! # Example: edge_demo
//!
//! Wires an edge → node → lane hierarchy, attaches two views to the lane, and
//! relays transport events to them until Ctrl-C (or two seconds pass).
//!
//! Demonstrates how to:
//! - Build an [`Edge`] around a root [`Tier`] with a nested child chain.
//! - Attach views to a [`LinkModel`]; the first attach opens the backend.
//! - Let a view defer to its own stage with [`Progress::Pending`].
//! - Watch everything through the built-in [`LogView`].
//!
//! ## Flow
//! ```text
//! Edge::run()
//!   ├─► edge.start() ─► node.start() ─► lane.start()
//!   ├─► lane.on_connected()   (LogView inline, Slow hands off to edge stage)
//!   ├─► lane.on_failed(e)
//!   └─► token cancelled ─► edge.close() ─► ... ─► lane drains views, backend closes
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example edge_demo --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use tierlink::{
    Backend, Edge, EdgeConfig, LinkModel, LogView, Progress, StageRef, Tier, TierError, TierKind,
    View,
};
use tracing_subscriber::EnvFilter;

struct Socket;

impl Backend for Socket {
    fn open(&self) {
        println!("[socket] open");
    }

    fn close(&self) {
        println!("[socket] close");
    }
}

/// Defers every preemptive callback to its own stage.
struct Slow {
    stage: StageRef,
}

impl View for Slow {
    fn name(&self) -> &str {
        "slow"
    }

    fn stage(&self) -> StageRef {
        Arc::clone(&self.stage)
    }

    fn on_connect(&self, preemptive: bool) -> Result<Progress, TierError> {
        if preemptive {
            println!("[slow] deferring connect");
            return Ok(Progress::Pending);
        }
        println!("[slow] connected on stage");
        Ok(Progress::Complete)
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let edge_tier = Arc::new(Tier::new(TierKind::Edge, "edge", ()));
    let cfg = EdgeConfig {
        grace: Duration::from_secs(2),
        ..EdgeConfig::default()
    };
    let edge = Arc::new(Edge::builder(cfg).with_root(edge_tier.clone()).build());

    let node = Arc::new(Tier::new(TierKind::Node, "node", ()));
    let lane = LinkModel::new(TierKind::Lane, "lane", Socket);
    node.set_child(lane.clone());
    edge_tier.set_child(node);

    lane.attach(Arc::new(LogView::new("audit", edge.stage())));
    lane.attach(Arc::new(Slow { stage: edge.stage() }));

    let driver = {
        let edge = Arc::clone(&edge);
        let lane = Arc::clone(&lane);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            lane.on_connected();
            tokio::time::sleep(Duration::from_millis(100)).await;
            lane.on_failed(TierError::transport("connection reset"));
            tokio::time::sleep(Duration::from_secs(2)).await;
            edge.shutdown();
        })
    };

    edge.run().await?;
    driver.abort();
    println!("[demo] lane stats: {:?}", lane.stats());
    Ok(())
}
