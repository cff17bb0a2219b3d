use std::path::PathBuf;

/// Server settings, loaded from environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (`CELLGRAPH_BIND`)
    pub bind_addr: String,

    /// Upload size cap in megabytes (`CELLGRAPH_MAX_FILE_SIZE_MB`)
    pub max_file_size_mb: u64,

    /// Directory for uploaded files (`CELLGRAPH_UPLOAD_DIR`); a
    /// temporary directory scoped to the server lifetime when unset
    pub upload_dir: Option<PathBuf>,

    /// Default number of ranked cost drivers per analysis
    /// (`CELLGRAPH_TOP_DRIVERS`)
    pub top_drivers_default: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            max_file_size_mb: 100,
            upload_dir: None,
            top_drivers_default: 50,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the environment, falling back to
    /// defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("CELLGRAPH_BIND").unwrap_or(defaults.bind_addr),
            max_file_size_mb: std::env::var("CELLGRAPH_MAX_FILE_SIZE_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_file_size_mb),
            upload_dir: std::env::var("CELLGRAPH_UPLOAD_DIR").ok().map(PathBuf::from),
            top_drivers_default: std::env::var("CELLGRAPH_TOP_DRIVERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.top_drivers_default),
        }
    }

    /// Upload size cap in bytes.
    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_file_size_mb as usize).saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.max_upload_bytes(), 100 * 1024 * 1024);
        assert_eq!(config.upload_dir, None);
    }
}
