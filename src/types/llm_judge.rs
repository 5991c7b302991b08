use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmJudgeResult {
    pub id: u64,
    pub config_id: u64,
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLlmJudgeParams {
    pub config_id: u64,
    pub input: String,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Result of [`LlmJudge::evaluate`](crate::resources::LlmJudge::evaluate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmJudgeEvaluation {
    pub result: LlmJudgeResult,
    /// Judge configuration as echoed by the server.
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmJudgeConfig {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub model: String,
    pub rubric: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub organization_id: u64,
    pub created_by: u64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLlmJudgeConfigParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub model: String,
    pub rubric: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub organization_id: u64,
    pub created_by: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLlmJudgeConfigsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLlmJudgeResultsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanComparison {
    pub agreement: f64,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmJudgeAlignment {
    pub config_id: u64,
    pub total_evaluations: u64,
    pub average_score: f64,
    pub alignment_metrics: AlignmentMetrics,
    #[serde(default)]
    pub score_distribution: HashMap<String, u64>,
    #[serde(default)]
    pub comparison_with_human: Option<HumanComparison>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLlmJudgeAlignmentParams {
    pub config_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}
