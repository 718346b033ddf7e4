//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::ConsumerBlueprint;
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    queue: QueueInfo,
    warehouse: WarehouseInfo,
    consumer: contracts::ConsumerSettings,
    retry: contracts::RetryPolicy,
    sink: contracts::SinkConfig,
    maps_api_key_set: bool,
}

#[derive(Serialize)]
struct QueueInfo {
    subscription: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    endpoint: String,
}

#[derive(Serialize)]
struct WarehouseInfo {
    table: String,
    endpoint: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &ConsumerBlueprint) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        queue: QueueInfo {
            subscription: blueprint.queue.subscription_path(),
            topic: blueprint.queue.topic.clone(),
            endpoint: blueprint.queue.endpoint.clone(),
        },
        warehouse: WarehouseInfo {
            table: format!(
                "{}.{}.{}",
                blueprint.warehouse.project_id,
                blueprint.warehouse.dataset_id,
                blueprint.warehouse.table_id
            ),
            endpoint: blueprint.warehouse.endpoint.clone(),
        },
        consumer: blueprint.consumer.clone(),
        retry: blueprint.retry,
        sink: blueprint.sink.clone(),
        maps_api_key_set: !blueprint.geo.api_key.is_empty(),
    }
}

fn print_config_info(blueprint: &ConsumerBlueprint) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                Geo Enricher Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📥 Queue");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Subscription: {}", blueprint.queue.subscription_path());
    if let Some(ref topic) = blueprint.queue.topic {
        println!("   ├─ Topic: {}", topic);
    }
    println!("   └─ Endpoint: {}", blueprint.queue.endpoint);

    println!("\n🌍 Geo Provider");
    println!("   ├─ Endpoint: {}", blueprint.geo.endpoint);
    println!(
        "   └─ API key: {}",
        if blueprint.geo.api_key.is_empty() { "(missing)" } else { "(set)" }
    );

    let consumer = &blueprint.consumer;
    println!("\n⚙️  Consumer");
    println!("   ├─ Batch size: {}", consumer.batch_size);
    println!("   ├─ Quota limit: {}", consumer.quota_limit);
    println!("   ├─ Cooldown: {}s", consumer.cooldown_secs);
    println!("   └─ Ack skipped: {}", consumer.ack_skipped);

    let retry = &blueprint.retry;
    println!("\n🔁 Transport Retry");
    println!("   ├─ Max attempts: {}", retry.max_attempts);
    println!(
        "   └─ Backoff: {}ms .. {}ms",
        retry.initial_backoff_ms, retry.max_backoff_ms
    );

    println!("\n📤 Warehouse");
    println!(
        "   ├─ Table: {}.{}.{}",
        blueprint.warehouse.project_id, blueprint.warehouse.dataset_id, blueprint.warehouse.table_id
    );
    println!("   ├─ Endpoint: {}", blueprint.warehouse.endpoint);
    match blueprint.sink.path {
        Some(ref path) => {
            println!("   ├─ Sink: {:?}", blueprint.sink.kind);
            println!("   └─ Output: {}", path.display());
        }
        None => println!("   └─ Sink: {:?}", blueprint.sink.kind),
    }

    println!();
}
