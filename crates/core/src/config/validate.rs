use super::{types::Config, ConfigError};

/// Longest validity S3 accepts for a presigned URL.
const MAX_PRESIGN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0 and uploads are allowed a non-zero size
/// - Upload and output directories differ
/// - Execution and fetch timeouts are not 0
/// - Presigned URL TTL is between 1 second and 7 days
/// - A `[remote]` section names a bucket
/// - At least one execution may run at a time
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }
    if config.server.max_upload_bytes == 0 {
        return Err(invalid("server.max_upload_bytes cannot be 0"));
    }

    // Storage validation
    if config.storage.upload_dir == config.storage.output_dir {
        return Err(invalid(
            "storage.upload_dir and storage.output_dir must be different directories",
        ));
    }

    // Timeouts
    if config.editor.timeout_secs == 0 {
        return Err(invalid("editor.timeout_secs cannot be 0"));
    }
    if config.ingest.fetch_timeout_secs == 0 {
        return Err(invalid("ingest.fetch_timeout_secs cannot be 0"));
    }

    // Placement
    let ttl = config.placement.presigned_url_ttl_secs;
    if ttl == 0 || ttl > MAX_PRESIGN_TTL_SECS {
        return Err(ConfigError::ValidationError(format!(
            "placement.presigned_url_ttl_secs must be between 1 and {} (got {})",
            MAX_PRESIGN_TTL_SECS, ttl
        )));
    }
    if let Some(remote) = &config.remote {
        if !remote.is_enabled() {
            return Err(invalid("remote.bucket cannot be empty"));
        }
    }

    // Orchestrator
    if config.orchestrator.max_concurrent_executions == 0 {
        return Err(invalid("orchestrator.max_concurrent_executions cannot be 0"));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
