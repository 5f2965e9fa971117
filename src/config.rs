use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Terms with fewer characters than this are treated as "no search"
    pub min_term_length: usize,
    pub ignore_case: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Cap on closed views kept for reopening. `None` keeps them all.
    pub max_closed_views: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_term_length: 2,
            ignore_case: true,
        }
    }
}

impl EngineConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}
