use super::{with_ambient, with_query};
use crate::client::{Client, RequestOptions};
use crate::transport::HttpMethod;
use crate::types::{
    CreateLlmJudgeConfigParams, GetLlmJudgeAlignmentParams, ListLlmJudgeConfigsParams,
    ListLlmJudgeResultsParams, LlmJudgeAlignment, LlmJudgeConfig, LlmJudgeEvaluation,
    LlmJudgeResult, RunLlmJudgeParams,
};
use crate::Result;

pub struct LlmJudge<'a> {
    client: &'a Client,
}

impl<'a> LlmJudge<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn evaluate(&self, params: &RunLlmJudgeParams) -> Result<LlmJudgeEvaluation> {
        let body = RunLlmJudgeParams {
            metadata: with_ambient(params.metadata.clone()),
            ..params.clone()
        };
        self.client
            .request(
                "/api/llm-judge/evaluate",
                RequestOptions::new(HttpMethod::Post).with_json(&body)?,
            )
            .await
    }

    pub async fn create_config(&self, params: &CreateLlmJudgeConfigParams) -> Result<LlmJudgeConfig> {
        self.client
            .request(
                "/api/llm-judge/configs",
                RequestOptions::new(HttpMethod::Post).with_json(params)?,
            )
            .await
    }

    pub async fn list_configs(&self, params: &ListLlmJudgeConfigsParams) -> Result<Vec<LlmJudgeConfig>> {
        self.client
            .request(&with_query("/api/llm-judge/configs", params)?, RequestOptions::get())
            .await
    }

    pub async fn list_results(&self, params: &ListLlmJudgeResultsParams) -> Result<Vec<LlmJudgeResult>> {
        self.client
            .request(&with_query("/api/llm-judge/results", params)?, RequestOptions::get())
            .await
    }

    pub async fn get_alignment(&self, params: &GetLlmJudgeAlignmentParams) -> Result<LlmJudgeAlignment> {
        self.client
            .request(&with_query("/api/llm-judge/alignment", params)?, RequestOptions::get())
            .await
    }
}
