//! 类型模块：平台 API 的请求参数与响应数据结构。
//!
//! # Types Module
//!
//! Request parameters and response shapes of the platform API. Field names
//! follow the wire format (camelCase) through serde renames; optional request
//! fields are omitted when unset.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`traces`] | Traces and spans |
//! | [`evaluations`] | Evaluations, test cases and runs |
//! | [`llm_judge`] | LLM judge configs, results and alignment |
//! | [`annotations`] | Annotations, annotation tasks and items |
//! | [`developer`] | API keys, webhooks and usage |
//! | [`organizations`] | Organizations and feature limits |

pub mod annotations;
pub mod developer;
pub mod evaluations;
pub mod llm_judge;
pub mod organizations;
pub mod traces;

pub use annotations::{
    Annotation, AnnotationItem, AnnotationTask, AnnotationTaskStatus, CreateAnnotationItemParams,
    CreateAnnotationParams, CreateAnnotationTaskParams, ListAnnotationItemsParams,
    ListAnnotationTasksParams, ListAnnotationsParams,
};
pub use developer::{
    ApiKey, ApiKeyUsage, ApiKeyWithSecret, CreateApiKeyParams, CreateWebhookParams, GetUsageParams,
    ListApiKeysParams, ListWebhookDeliveriesParams, ListWebhooksParams, UpdateApiKeyParams,
    UpdateWebhookParams, UsageStats, UsageSummary, Webhook, WebhookDelivery, WebhookStatus,
};
pub use evaluations::{
    CreateEvaluationParams, CreateRunParams, CreateTestCaseParams, Evaluation, EvaluationRun,
    EvaluationStatus, ListEvaluationsParams, RunStatus, TestCase, UpdateEvaluationParams,
};
pub use llm_judge::{
    CreateLlmJudgeConfigParams, GetLlmJudgeAlignmentParams, ListLlmJudgeConfigsParams,
    ListLlmJudgeResultsParams, LlmJudgeAlignment, LlmJudgeConfig, LlmJudgeEvaluation,
    LlmJudgeResult, RunLlmJudgeParams,
};
pub use organizations::{
    FeatureUsage, MessageResponse, Organization, OrganizationLimits, OrganizationStatus,
};
pub use traces::{CreateSpanParams, CreateTraceParams, ListTracesParams, Span, Trace, TraceStatus};
