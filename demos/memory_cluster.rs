//! # Example: memory_cluster
//!
//! Streams a simulated cluster through the orchestrator.
//!
//! Demonstrates how to:
//! - Build an [`Orchestrator`] over a [`MemoryCluster`].
//! - Select partitions with include/exclude globs.
//! - Tee every process into its own file under a temporary directory.
//! - Watch lifecycle events through [`LogWriter`] and `tracing-subscriber`.
//!
//! ## Flow
//! ```text
//! frontend-prod ─┬─ web-0 [nginx, sidecar]   (streamed)
//!                └─ web-1 [nginx]            (flaky: fails twice, then recovers)
//! frontend-dev  ─── web-0 [nginx]            (excluded by "*-dev")
//! backend-prod  ─── api-0 [api]              (appears after 300ms)
//!
//! after 600ms: web-0 leaves "running"  ─► its two streams stop
//! after 900ms: stop_streaming()        ─► files closed, AllStoppedWithin
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=streamvisor=debug cargo run --example memory_cluster --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use streamvisor::{
    BackoffPolicy, Config, LogWriter, MemoryCluster, OpenFault, Orchestrator, OutputDestination,
    Phase, Selector, StreamIdentity, Workload,
};
use tracing_subscriber::EnvFilter;

fn populate(cluster: &MemoryCluster) {
    cluster.add_partition("frontend-prod");
    cluster.add_partition("frontend-dev");
    cluster.put_workload(
        "frontend-prod",
        Workload::new("web-0", Phase::Running, ["nginx", "sidecar"]),
    );
    cluster.put_workload("frontend-prod", Workload::new("web-1", Phase::Running, ["nginx"]));
    cluster.put_workload("frontend-dev", Workload::new("web-0", Phase::Running, ["nginx"]));
    cluster.fail_opens(
        &StreamIdentity::new("frontend-prod", "web-1", "nginx"),
        OpenFault::Times(2),
    );
}

/// Pushes a few lines to every identity, one round every 100ms.
async fn chatter(cluster: Arc<MemoryCluster>, ids: Vec<StreamIdentity>) {
    for round in 1..=8 {
        for id in &ids {
            cluster.push_line(id, &format!("{} request #{round}", id.process()));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("streamvisor=info")),
        )
        .with_target(false)
        .init();

    let cluster = Arc::new(MemoryCluster::new());
    populate(&cluster);

    let output = OutputDestination::temporary("streamvisor-demo");
    output.prepare(false).await?;
    if let Some(dir) = output.tee_dir() {
        println!("tee directory: {}", dir.display());
    }

    let cfg = Config {
        output,
        backoff: BackoffPolicy {
            first: Duration::from_millis(50),
            ..BackoffPolicy::default()
        },
        grace: Duration::from_secs(5),
        ..Config::default()
    };
    let orch = Orchestrator::builder(cfg)
        .with_cluster(cluster.clone())
        .with_subscriber(Arc::new(LogWriter::new()))
        .build()?;

    let selector = Selector::new(["frontend-*", "backend-*"], ["*-dev"])?;
    let runner = orch.clone();
    let streaming = tokio::spawn(async move { runner.start_streaming(selector, Duration::from_secs(60)).await });

    let ids = vec![
        StreamIdentity::new("frontend-prod", "web-0", "nginx"),
        StreamIdentity::new("frontend-prod", "web-0", "sidecar"),
        StreamIdentity::new("frontend-prod", "web-1", "nginx"),
        StreamIdentity::new("frontend-dev", "web-0", "nginx"),
        StreamIdentity::new("backend-prod", "api-0", "api"),
    ];
    let traffic = tokio::spawn(chatter(cluster.clone(), ids));

    tokio::time::sleep(Duration::from_millis(300)).await;
    cluster.put_workload("backend-prod", Workload::new("api-0", Phase::Running, ["api"]));
    cluster.add_partition("backend-prod");

    tokio::time::sleep(Duration::from_millis(300)).await;
    cluster.set_phase("frontend-prod", "web-0", Phase::Succeeded);

    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("tracked before stop: {:?}", orch.supervisor().list().await);
    orch.stop_streaming().await?;
    streaming.await??;
    traffic.abort();

    Ok(())
}
