//! Environment configuration

use serde::{Deserialize, Serialize};

/// What happens when an order would take a component below zero stock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryPolicy {
    Deny,
    /// Stock may go negative (backorder).
    #[default]
    Continue,
}

impl std::str::FromStr for InventoryPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deny" => Ok(Self::Deny),
            "continue" => Ok(Self::Continue),
            other => anyhow::bail!("unknown inventory policy {other:?}, expected \"deny\" or \"continue\""),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
    pub nats_url: Option<String>,
    pub inventory_policy: InventoryPolicy,
    pub currency: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = get("DATABASE_URL").ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;
        let port = get("PORT").map(|p| p.parse()).transpose()?.unwrap_or(8083);
        let max_connections = get("DB_MAX_CONNECTIONS").map(|n| n.parse()).transpose()?.unwrap_or(10);
        let inventory_policy = get("INVENTORY_POLICY").map(|p| p.parse()).transpose()?.unwrap_or_default();
        Ok(Self {
            database_url,
            port,
            max_connections,
            nats_url: get("NATS_URL").filter(|u| !u.is_empty()),
            inventory_policy,
            currency: get("CURRENCY").unwrap_or_else(|| "IRR".to_string()),
        })
    }
}
