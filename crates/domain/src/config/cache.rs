use serde::{Deserialize, Serialize};

/// Response cache settings. TTLs are clamped into `[min_ttl, max_ttl]` on insert.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_min_ttl")]
    pub min_ttl: u32,

    #[serde(default = "default_max_ttl")]
    pub max_ttl: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_ttl: default_min_ttl(),
            max_ttl: default_max_ttl(),
        }
    }
}

fn default_min_ttl() -> u32 {
    0
}

fn default_max_ttl() -> u32 {
    86_400
}
