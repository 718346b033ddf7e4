//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ConsumerBlueprint, SinkKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    subscription: String,
    table: String,
    sink: String,
    batch_size: usize,
    quota_limit: u32,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            error: Some(format!("File not found: {}", config_path)),
            config_path,
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    subscription: blueprint.queue.subscription_path(),
                    table: format!(
                        "{}.{}.{}",
                        blueprint.warehouse.project_id,
                        blueprint.warehouse.dataset_id,
                        blueprint.warehouse.table_id
                    ),
                    sink: format!("{:?}", blueprint.sink.kind),
                    batch_size: blueprint.consumer.batch_size,
                    quota_limit: blueprint.consumer.quota_limit,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Non-fatal configuration issues
pub(crate) fn collect_warnings(blueprint: &ConsumerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.geo.api_key.is_empty() {
        warnings.push(
            "geo.api_key is empty - set MAPS_API_KEY or every lookup will be rejected".to_string(),
        );
    }

    if blueprint.consumer.quota_limit == 0 {
        warnings.push("consumer.quota_limit is 0 - no message will be enriched".to_string());
    }

    if blueprint.consumer.cooldown_secs == 0 {
        warnings.push("consumer.cooldown_secs is 0 - the quota never throttles".to_string());
    }

    if !blueprint.consumer.ack_skipped {
        warnings.push(
            "consumer.ack_skipped is false - skipped messages are redelivered after the ack deadline"
                .to_string(),
        );
    }

    if blueprint.sink.kind != SinkKind::BigQuery {
        warnings.push(format!(
            "sink.kind is {:?} - rows will not reach the warehouse table",
            blueprint.sink.kind
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Subscription: {}", summary.subscription);
            println!("  Table: {}", summary.table);
            println!("  Sink: {}", summary.sink);
            println!("  Batch size: {}", summary.batch_size);
            println!("  Quota limit: {}", summary.quota_limit);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
