//! Server configuration.

use std::path::{Path, PathBuf};

// ─── Server Configuration ─────────────────────────────────────────

/// Model server configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    /// Host to bind (e.g. "localhost").
    pub host: String,
    pub port: u16,
    /// Servables kept resident in the cache.
    pub model_capacity: usize,
    /// Soft buffer above `model_capacity` before a batch eviction.
    pub buffer_size: usize,
    /// Worker threads for the async runtime.
    pub threads: usize,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
    /// Probability that a request bypasses and refreshes the cache.
    pub invalidation_prob: f32,
    /// Directory that relative servable identifiers resolve against.
    pub model_root: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8888,
            model_capacity: 10,
            buffer_size: 3,
            threads: 8,
            max_body_size: 16 * 1024 * 1024, // 16 MB
            invalidation_prob: 0.0,
            model_root: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Map a servable identifier onto a path. Absolute identifiers and
    /// servers without a model root use the identifier as given.
    pub fn resolve_identifier(&self, identifier: &str) -> String {
        match &self.model_root {
            Some(root) if !Path::new(identifier).is_absolute() => {
                root.join(identifier).to_string_lossy().into_owned()
            }
            _ => identifier.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_command_line_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "localhost:8888");
        assert_eq!((config.model_capacity, config.buffer_size, config.threads), (10, 3, 8));
        assert_eq!(config.invalidation_prob, 0.0);
    }

    #[test]
    fn identifiers_resolve_against_model_root() {
        let config = ServerConfig {
            model_root: Some(PathBuf::from("/srv/models")),
            ..ServerConfig::default()
        };
        assert_eq!(config.resolve_identifier("a/model.pt"), "/srv/models/a/model.pt");
        assert_eq!(config.resolve_identifier("/tmp/model.pt"), "/tmp/model.pt");
        assert_eq!(
            ServerConfig::default().resolve_identifier("model.pt"),
            "model.pt"
        );
    }
}
