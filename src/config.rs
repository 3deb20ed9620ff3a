use std::env;

use crate::notifications::store::{DuplicatePolicy, MutationPolicy, StorePolicy};

#[derive(Clone, Debug)]
pub struct Config {
    pub backend_url: String,
    pub push_url: String,
    pub bind_addr: String,
    pub backend_timeout_secs: u64,
    pub session_sweep_secs: u64,
    pub notification_page_limit: u32,
    pub store_policy: StorePolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend_url = env::var("BACKEND_URL")?;
        let push_url = env::var("PUSH_URL")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let backend_timeout_secs = env::var("BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);
        let session_sweep_secs = env::var("SESSION_SWEEP_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(60);
        let notification_page_limit = env::var("NOTIFICATION_PAGE_LIMIT")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(50);

        let mutations = match env::var("NOTIFICATION_MUTATION_POLICY") {
            Ok(raw) => raw.parse::<MutationPolicy>().map_err(anyhow::Error::msg)?,
            Err(_) => MutationPolicy::default(),
        };
        let duplicates = match env::var("NOTIFICATION_DUPLICATE_POLICY") {
            Ok(raw) => raw.parse::<DuplicatePolicy>().map_err(anyhow::Error::msg)?,
            Err(_) => DuplicatePolicy::default(),
        };

        Ok(Self {
            backend_url,
            push_url,
            bind_addr,
            backend_timeout_secs,
            session_sweep_secs,
            notification_page_limit,
            store_policy: StorePolicy {
                mutations,
                duplicates,
            },
        })
    }
}
