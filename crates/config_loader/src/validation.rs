//! Configuration validation
//!
//! Rules:
//! - field-level bounds declared on the blueprint types (`validator` derive)
//! - file sink has an output path
//! - retry initial backoff <= max backoff
//! - endpoints are http(s) URLs

use contracts::{ConsumerBlueprint, ContractError, SinkKind};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a ConsumerBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &ConsumerBlueprint) -> Result<(), ContractError> {
    validate_declared_rules(blueprint)?;
    validate_sink(blueprint)?;
    validate_retry(blueprint)?;
    validate_endpoints(blueprint)?;
    Ok(())
}

/// Run derive-declared rules and report the first violation by path
fn validate_declared_rules(blueprint: &ConsumerBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let (field, message) = first_violation(&errors, "")
            .unwrap_or_else(|| ("blueprint".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                if let Some(err) = errs.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("violates '{}' rule", err.code));
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// File sink needs somewhere to write
fn validate_sink(blueprint: &ConsumerBlueprint) -> Result<(), ContractError> {
    if blueprint.sink.kind == SinkKind::File && blueprint.sink.path.is_none() {
        return Err(ContractError::config_validation(
            "sink.path",
            "file sink requires a path",
        ));
    }
    Ok(())
}

fn validate_retry(blueprint: &ConsumerBlueprint) -> Result<(), ContractError> {
    let retry = &blueprint.retry;
    if retry.initial_backoff_ms > retry.max_backoff_ms {
        return Err(ContractError::config_validation(
            "retry.initial_backoff_ms / retry.max_backoff_ms",
            format!(
                "initial_backoff_ms ({}) must be <= max_backoff_ms ({})",
                retry.initial_backoff_ms, retry.max_backoff_ms
            ),
        ));
    }
    Ok(())
}

fn validate_endpoints(blueprint: &ConsumerBlueprint) -> Result<(), ContractError> {
    let endpoints = [
        ("queue.endpoint", &blueprint.queue.endpoint),
        ("warehouse.endpoint", &blueprint.warehouse.endpoint),
        ("geo.endpoint", &blueprint.geo.endpoint),
    ];
    for (field, endpoint) in endpoints {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ContractError::config_validation(
                field,
                format!("endpoint must be an http(s) URL, got '{endpoint}'"),
            ));
        }
    }
    Ok(())
}
