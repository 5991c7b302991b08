use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotator {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedTestCase {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: u64,
    pub evaluation_run_id: u64,
    pub test_case_id: u64,
    pub annotator_id: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub labels: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: String,
    #[serde(default)]
    pub annotator: Option<Annotator>,
    #[serde(default)]
    pub test_case: Option<AnnotatedTestCase>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnotationParams {
    pub evaluation_run_id: u64,
    pub test_case_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAnnotationsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_run_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationTaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationTask {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: AnnotationTaskStatus,
    pub organization_id: u64,
    #[serde(default)]
    pub annotation_settings: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnotationTaskParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub organization_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_settings: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAnnotationTasksParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AnnotationTaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationItem {
    pub id: u64,
    pub task_id: u64,
    pub content: String,
    #[serde(default)]
    pub annotation: Option<Value>,
    #[serde(default)]
    pub annotated_by: Option<String>,
    #[serde(default)]
    pub annotated_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnotationItemParams {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListAnnotationItemsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}
