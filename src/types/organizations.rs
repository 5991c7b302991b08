use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Quota state of one metered feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureUsage {
    pub feature_id: String,
    pub unlimited: bool,
    pub interval: String,
    pub balance: f64,
    pub usage: f64,
    pub included_usage: f64,
    /// Epoch milliseconds.
    pub next_reset_at: i64,
}

impl FeatureUsage {
    /// True when a metered feature has nothing left this interval.
    pub fn is_exhausted(&self) -> bool {
        !self.unlimited && self.balance <= 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traces_per_organization: Option<FeatureUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evals_per_organization: Option<FeatureUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations_per_organization: Option<FeatureUsage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationStatus {
    #[default]
    Active,
    Suspended,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub plan: String,
    pub status: OrganizationStatus,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// `{ "message": ... }` acknowledgement returned by deletes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_limits_parse_snake_case_payload() {
        let limits: OrganizationLimits = serde_json::from_value(json!({
            "traces_per_organization": {
                "feature_id": "traces_per_organization",
                "unlimited": false,
                "interval": "month",
                "balance": 0,
                "usage": 1000,
                "included_usage": 1000,
                "next_reset_at": 1767225600000i64
            }
        }))
        .unwrap();
        let traces = limits.traces_per_organization.unwrap();
        assert!(traces.is_exhausted());
        assert!(limits.evals_per_organization.is_none());
    }
}
