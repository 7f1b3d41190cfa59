//! Azure CLI response models

use cluster_model::CoreUsage;
use serde::{Deserialize, Serialize};

/// Subset of `az account show`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Subscription id
    pub id: String,
    /// Tenant id
    pub tenant_id: String,
    /// Signed-in principal
    #[serde(default)]
    pub user: Option<AccountUser>,
}

/// Principal of the active session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUser {
    /// User principal name or service principal id
    pub name: String,
}

/// Subset of `az resource list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
    /// Fully qualified resource id
    pub id: String,
    /// Resource name
    pub name: String,
    /// Resource type (e.g. `Microsoft.Network/publicIPAddresses`)
    #[serde(rename = "type")]
    pub resource_type: String,
}

/// One entry of `az vm list-usage`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    /// Cores in use (number or numeric string depending on CLI version)
    pub current_value: serde_json::Value,
    /// Cores allowed
    pub limit: serde_json::Value,
    /// Quota name
    pub name: UsageName,
}

/// Quota name pair
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageName {
    /// Machine name (e.g. `cores`)
    pub value: String,
    /// Display name
    #[serde(default)]
    pub localized_value: String,
}

fn as_u64(value: &serde_json::Value) -> u64 {
    match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or_default(),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}

impl From<UsageEntry> for CoreUsage {
    fn from(entry: UsageEntry) -> Self {
        CoreUsage {
            name: entry.name.value,
            current: as_u64(&entry.current_value),
            limit: as_u64(&entry.limit),
        }
    }
}

/// Subset of `az acr credential show`
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryCredentials {
    /// Admin user name
    pub username: String,
    /// Admin passwords (primary first)
    pub passwords: Vec<RegistryPassword>,
}

/// One admin password
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryPassword {
    /// `password` or `password2`
    pub name: String,
    /// Secret value
    pub value: String,
}
