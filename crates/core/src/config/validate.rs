use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Converter buffer is not empty and delay bounds are ordered
/// - Cache file name is a plain file name
/// - Picker extension is not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Converter validation
    if config.converter.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "converter.buffer_size cannot be 0".to_string(),
        ));
    }
    if config.converter.min_delay_ms > config.converter.max_delay_ms {
        return Err(ConfigError::ValidationError(format!(
            "converter.min_delay_ms ({}) cannot exceed converter.max_delay_ms ({})",
            config.converter.min_delay_ms, config.converter.max_delay_ms
        )));
    }

    // Storage validation
    let cache_file_name = config.storage.cache_file_name.as_str();
    if cache_file_name.is_empty() || cache_file_name.contains(['/', '\\']) {
        return Err(ConfigError::ValidationError(format!(
            "storage.cache_file_name must be a plain file name, got {:?}",
            cache_file_name
        )));
    }

    // Picker validation
    if config.picker.allowed_extension.trim_start_matches('.').trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "picker.allowed_extension cannot be empty".to_string(),
        ));
    }

    Ok(())
}
