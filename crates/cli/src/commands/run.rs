//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::ConsumerBlueprint;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::load_blueprint;
use super::validate::collect_warnings;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_consumer(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;
    let queue_unauthenticated = apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after command-line overrides")?;

    info!(
        subscription = %blueprint.queue.subscription_path(),
        table = format!(
            "{}.{}.{}",
            blueprint.warehouse.project_id, blueprint.warehouse.dataset_id, blueprint.warehouse.table_id
        ),
        batch_size = blueprint.consumer.batch_size,
        quota_limit = blueprint.consumer.quota_limit,
        sink = ?blueprint.sink.kind,
        "Configuration loaded"
    );
    for warning in collect_warnings(&blueprint) {
        warn!("{}", warning);
    }

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint, queue_unauthenticated);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
        queue_unauthenticated,
    });

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_shutdown(cancel.clone()));

    let result = pipeline.run(cancel).await;
    signal_task.abort();

    let stats = result.context("Consumer execution failed")?;
    info!(
        received = stats.loop_stats.received,
        rows_written = stats.loop_stats.rows_written,
        acknowledged = stats.loop_stats.acknowledged,
        duration_secs = stats.loop_stats.duration.as_secs_f64(),
        "Consumer stopped cleanly"
    );
    stats.print_summary();

    info!("Geo Enricher finished");
    Ok(())
}

/// Apply command-line overrides; returns true when the queue runs unauthenticated
fn apply_overrides(blueprint: &mut ConsumerBlueprint, args: &RunArgs) -> bool {
    if let Some(ref subscription) = args.subscription {
        info!(subscription = %subscription, "Overriding subscription from CLI");
        blueprint.queue.subscription = subscription.clone();
    }
    if let Some(batch_size) = args.batch_size {
        blueprint.consumer.batch_size = batch_size;
    }
    if let Some(limit) = args.quota_limit {
        blueprint.consumer.quota_limit = limit;
    }
    if let Some(secs) = args.cooldown_secs {
        blueprint.consumer.cooldown_secs = secs;
    }
    if let Some(ref key) = args.maps_api_key {
        blueprint.geo.api_key = key.clone();
    }
    if let Some(ref endpoint) = args.pubsub_endpoint {
        blueprint.queue.endpoint = endpoint.clone();
    }
    if let Some(sink) = args.sink {
        blueprint.sink.kind = sink.into();
    }
    if let Some(ref path) = args.output {
        blueprint.sink.path = Some(path.clone());
    }

    match args.emulator_host.as_deref() {
        Some(host) if !host.is_empty() => {
            let endpoint = if host.starts_with("http://") || host.starts_with("https://") {
                host.to_string()
            } else {
                format!("http://{host}")
            };
            info!(endpoint = %endpoint, "Using Pub/Sub emulator");
            blueprint.queue.endpoint = endpoint;
            true
        }
        _ => false,
    }
}

/// Cancel the consumer on Ctrl+C or SIGTERM
async fn cancel_on_shutdown(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Received shutdown signal, finishing the current batch...");
    cancel.cancel();
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &ConsumerBlueprint, queue_unauthenticated: bool) {
    println!("\n=== Configuration Summary ===\n");
    println!("Queue:");
    println!("  Subscription: {}", blueprint.queue.subscription_path());
    println!(
        "  Endpoint: {}{}",
        blueprint.queue.endpoint,
        if queue_unauthenticated { " (emulator)" } else { "" }
    );
    println!("\nWarehouse:");
    println!(
        "  Table: {}.{}.{}",
        blueprint.warehouse.project_id, blueprint.warehouse.dataset_id, blueprint.warehouse.table_id
    );
    println!("  Sink: {:?}", blueprint.sink.kind);
    if let Some(ref path) = blueprint.sink.path {
        println!("  Output: {}", path.display());
    }
    println!("\nConsumer:");
    println!("  Batch size: {}", blueprint.consumer.batch_size);
    println!(
        "  Quota: {} per {}s cooldown",
        blueprint.consumer.quota_limit, blueprint.consumer.cooldown_secs
    );
    println!("  Ack skipped: {}", blueprint.consumer.ack_skipped);
    println!(
        "  Maps API key: {}",
        if blueprint.geo.api_key.is_empty() { "(missing)" } else { "(set)" }
    );
    println!();
}
