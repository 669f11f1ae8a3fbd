//! Config parsing
//!
//! TOML is the primary format, JSON is accepted as well.

use contracts::{ContractError, RelayConfig};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<RelayConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<RelayConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<RelayConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ReconstructionMode, ResamplingMode, WireFormat};

    #[test]
    fn test_parse_toml_sections() {
        let content = r#"
[network]
bind_addr = "127.0.0.1:9000"
format = "bincode"

[resampling]
mode = "timestamp_compare"
render_delay_ms = 45.0

[reconstruction]
mode = "forward_delta"
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.network.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.network.format, WireFormat::Bincode);
        assert_eq!(config.resampling.mode, ResamplingMode::TimestampCompare);
        assert_eq!(config.resampling.render_delay_ms, 45.0);
        assert_eq!(config.reconstruction.mode, ReconstructionMode::ForwardDelta);
        // untouched sections keep defaults
        assert_eq!(config.queue.capacity, 40);
        assert_eq!(config.resampling.lead_ms, 18.0);
    }

    #[test]
    fn test_parse_empty_is_default() {
        let config = parse_toml("").unwrap();
        assert_eq!(config.history.linear_scan_threshold, 64);
        assert_eq!(config.filter.spike_deg, 30.0);
    }

    #[test]
    fn test_parse_json() {
        let content = r#"{ "smoothing": { "mode": "exponential", "base_factor": 0.3 } }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.smoothing.base_factor, 0.3);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse_toml("invalid toml [[[").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let err = parse_toml("[resampling]\nmode = \"teleport\"\n").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("JSON"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
