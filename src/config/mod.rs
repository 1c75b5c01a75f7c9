use std::env;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub db_max_connections: u32,
    pub listen_addr: String,
    /// Deepest nesting allowed below a root group
    pub max_tree_depth: usize,
    /// Number of fetch audit rows kept
    pub fetch_audit_retention: i64,
    /// bcrypt work factor for device passwords
    pub bcrypt_cost: u32,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            db_path: get_env("DB_PATH", "/data/provision.db"),
            db_max_connections: get_env("DB_MAX_CONNECTIONS", "5").parse().unwrap_or(5),
            listen_addr: get_env("LISTEN_ADDR", "0.0.0.0:3000"),
            max_tree_depth: get_env("MAX_TREE_DEPTH", "32").parse().unwrap_or(32),
            fetch_audit_retention: get_env("FETCH_AUDIT_RETENTION", "1000")
                .parse()
                .unwrap_or(1000),
            bcrypt_cost: get_env("BCRYPT_COST", "12")
                .parse()
                .unwrap_or(bcrypt::DEFAULT_COST),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "/data/provision.db".to_string(),
            db_max_connections: 5,
            listen_addr: "0.0.0.0:3000".to_string(),
            max_tree_depth: crate::tree::DEFAULT_MAX_DEPTH,
            fetch_audit_retention: 1000,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
