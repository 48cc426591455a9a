//! Tunables for the advanced search engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delays, storage keys and column exclusions used by [`crate::AdvancedSearch`].
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use offer_search::SearchConfig;
///
/// let config: SearchConfig = serde_json::from_str(r#"{"persist_delay_ms": 1000}"#).unwrap();
/// assert_eq!(1000, config.persist_delay().as_millis());
/// assert_eq!(250, config.preview_slow_delay().as_millis());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Preview delay for discrete actions (toggling a value, removing a chip).
    #[serde(default = "default_preview_fast_delay_ms")]
    pub preview_fast_delay_ms: u64,
    /// Preview delay for character-by-character typing.
    #[serde(default = "default_preview_slow_delay_ms")]
    pub preview_slow_delay_ms: u64,
    /// Coalescing window for snapshot writes.
    #[serde(default = "default_persist_delay_ms")]
    pub persist_delay_ms: u64,
    /// Snapshots are stored under `<storage_prefix>::<profile>`.
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
    /// Profile key used when the host has none selected.
    #[serde(default = "default_profile")]
    pub default_profile: String,
    /// Columns that are valid but never offered for a new predicate.
    #[serde(default = "default_excluded_fields")]
    pub excluded_fields: Vec<String>,
    /// Key of the global hidden groups list.
    #[serde(default = "default_hidden_groups_key")]
    pub hidden_groups_key: String,
    /// Prefix of the per-profile hidden groups keys merged on first load.
    #[serde(default = "default_legacy_hidden_groups_prefix")]
    pub legacy_hidden_groups_prefix: String,
}

impl SearchConfig {
    #[inline]
    pub fn preview_fast_delay(&self) -> Duration {
        Duration::from_millis(self.preview_fast_delay_ms)
    }

    #[inline]
    pub fn preview_slow_delay(&self) -> Duration {
        Duration::from_millis(self.preview_slow_delay_ms)
    }

    #[inline]
    pub fn persist_delay(&self) -> Duration {
        Duration::from_millis(self.persist_delay_ms)
    }

    /// Resolve the profile key, falling back to [`SearchConfig::default_profile`] when empty.
    pub fn profile_key<'a>(&'a self, profile: Option<&'a str>) -> &'a str {
        match profile {
            Some(key) if !key.trim().is_empty() => key,
            _ => &self.default_profile,
        }
    }

    pub fn storage_key(&self, profile: Option<&str>) -> String {
        format!("{}::{}", self.storage_prefix, self.profile_key(profile))
    }

    #[inline]
    pub fn is_excluded(&self, field_key: &str) -> bool {
        self.excluded_fields.iter().any(|field| field == field_key)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            preview_fast_delay_ms: default_preview_fast_delay_ms(),
            preview_slow_delay_ms: default_preview_slow_delay_ms(),
            persist_delay_ms: default_persist_delay_ms(),
            storage_prefix: default_storage_prefix(),
            default_profile: default_profile(),
            excluded_fields: default_excluded_fields(),
            hidden_groups_key: default_hidden_groups_key(),
            legacy_hidden_groups_prefix: default_legacy_hidden_groups_prefix(),
        }
    }
}

fn default_preview_fast_delay_ms() -> u64 {
    50
}

fn default_preview_slow_delay_ms() -> u64 {
    250
}

fn default_persist_delay_ms() -> u64 {
    500
}

fn default_storage_prefix() -> String {
    "advSearchPredicates".to_owned()
}

fn default_profile() -> String {
    "default".to_owned()
}

fn default_excluded_fields() -> Vec<String> {
    vec!["favorite".to_owned()]
}

fn default_hidden_groups_key() -> String {
    "goboHiddenGroups-global".to_owned()
}

fn default_legacy_hidden_groups_prefix() -> String {
    "goboHiddenGroups-".to_owned()
}
