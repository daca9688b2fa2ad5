use std::env;

pub const PRIMARY_INDEX_ENV: &str = "PIP_PRIMARY_INDEX";
pub const FALLBACK_INDEX_ENV: &str = "PIP_FALLBACK_INDEX";
pub const STRICT_DEPS_ENV: &str = "BOOTSTRAP_STRICT_DEPS";

pub const DEFAULT_PRIMARY_INDEX: &str = "https://pypi.tuna.tsinghua.edu.cn/simple";
pub const DEFAULT_FALLBACK_INDEX: &str = "https://pypi.org/simple";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub primary: String,
    pub fallback: String,
}

impl IndexConfig {
    pub fn from_env() -> Self {
        Self {
            primary: env_or(PRIMARY_INDEX_ENV, DEFAULT_PRIMARY_INDEX),
            fallback: env_or(FALLBACK_INDEX_ENV, DEFAULT_FALLBACK_INDEX),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_INDEX.to_string(),
            fallback: DEFAULT_FALLBACK_INDEX.to_string(),
        }
    }
}

/// Built once at process start and passed by parameter; no ambient globals.
#[derive(Debug, Clone, Default)]
pub struct BootstrapConfig {
    pub indexes: IndexConfig,
    /// When set, a failed dependency install aborts the launch instead of
    /// warning and running the script anyway.
    pub strict_deps: bool,
}

impl BootstrapConfig {
    pub fn from_env() -> Self {
        let strict = env::var(STRICT_DEPS_ENV)
            .map(|v| {
                let v = v.trim().to_ascii_lowercase();
                v == "1" || v == "true" || v == "yes"
            })
            .unwrap_or(false);
        Self {
            indexes: IndexConfig::from_env(),
            strict_deps: strict,
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}
