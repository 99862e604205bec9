//! Centralized configuration for opening/creating a relation.
//!
//! Single place to collect the handful of tunables this format has,
//! instead of scattering env lookups through relation.rs.

use std::fmt;

/// Runtime configuration for a relation (creator/writer or reader).
#[derive(Clone, Debug)]
pub struct RelnConfig {
    /// Whether to fsync `.data`/`.ovflow` after every page write.
    /// Env: MAHF_DATA_FSYNC (default true; "0|false|off|no" => false)
    pub data_fsync: bool,

    /// Override for the split-trigger tuple count, used by tests to
    /// exercise splitting without needing thousands of real inserts.
    /// Env: MAHF_SPLIT_OVERRIDE (default None, meaning "use the formula").
    pub split_override: Option<u32>,
}

impl Default for RelnConfig {
    fn default() -> Self {
        Self {
            data_fsync: true,
            split_override: None,
        }
    }
}

impl RelnConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("MAHF_DATA_FSYNC") {
            let s = v.trim().to_ascii_lowercase();
            cfg.data_fsync = !(s == "0" || s == "false" || s == "off" || s == "no");
        }

        if let Ok(v) = std::env::var("MAHF_SPLIT_OVERRIDE") {
            if let Ok(n) = v.trim().parse::<u32>() {
                cfg.split_override = Some(n);
            }
        }

        cfg
    }

    pub fn with_data_fsync(mut self, on: bool) -> Self {
        self.data_fsync = on;
        self
    }

    pub fn with_split_override(mut self, n: Option<u32>) -> Self {
        self.split_override = n;
        self
    }
}

impl fmt::Display for RelnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RelnConfig {{ data_fsync: {}, split_override: {} }}",
            self.data_fsync,
            self.split_override
                .map(|v| v.to_string())
                .unwrap_or_else(|| "default(formula)".to_string())
        )
    }
}
