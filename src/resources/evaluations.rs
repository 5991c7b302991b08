use super::{with_ambient, with_query};
use crate::client::{Client, RequestOptions};
use crate::types::{
    CreateEvaluationParams, CreateRunParams, CreateTestCaseParams, Evaluation, EvaluationRun,
    ListEvaluationsParams, MessageResponse, TestCase, UpdateEvaluationParams,
};
use crate::transport::HttpMethod;
use crate::Result;

/// Evaluations, their test cases and runs.
pub struct Evaluations<'a> {
    client: &'a Client,
}

impl<'a> Evaluations<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Requires an organization (explicit or configured).
    pub async fn create(&self, params: CreateEvaluationParams) -> Result<Evaluation> {
        let org = self.client.require_organization(params.organization_id)?;
        let body = CreateEvaluationParams {
            organization_id: Some(org),
            ..params
        };
        self.client
            .request("/api/evaluations", RequestOptions::new(HttpMethod::Post).with_json(&body)?)
            .await
    }

    pub async fn get(&self, id: u64) -> Result<Evaluation> {
        self.client
            .request(&format!("/api/evaluations?id={}", id), RequestOptions::get())
            .await
    }

    pub async fn list(&self, params: &ListEvaluationsParams) -> Result<Vec<Evaluation>> {
        self.client
            .request(&with_query("/api/evaluations", params)?, RequestOptions::get())
            .await
    }

    pub async fn update(&self, id: u64, params: &UpdateEvaluationParams) -> Result<Evaluation> {
        self.client
            .request(
                &format!("/api/evaluations?id={}", id),
                RequestOptions::new(HttpMethod::Put).with_json(params)?,
            )
            .await
    }

    pub async fn delete(&self, id: u64) -> Result<MessageResponse> {
        self.client
            .request(&format!("/api/evaluations?id={}", id), RequestOptions::delete())
            .await
    }

    pub async fn create_test_case(&self, evaluation_id: u64, params: &CreateTestCaseParams) -> Result<TestCase> {
        let body = CreateTestCaseParams {
            metadata: with_ambient(params.metadata.clone()),
            ..params.clone()
        };
        self.client
            .request(
                &format!("/api/evaluations/{}/test-cases", evaluation_id),
                RequestOptions::new(HttpMethod::Post).with_json(&body)?,
            )
            .await
    }

    pub async fn list_test_cases(&self, evaluation_id: u64) -> Result<Vec<TestCase>> {
        self.client
            .request(&format!("/api/evaluations/{}/test-cases", evaluation_id), RequestOptions::get())
            .await
    }

    pub async fn create_run(&self, evaluation_id: u64, params: &CreateRunParams) -> Result<EvaluationRun> {
        self.client
            .request(
                &format!("/api/evaluations/{}/runs", evaluation_id),
                RequestOptions::new(HttpMethod::Post).with_json(params)?,
            )
            .await
    }

    pub async fn list_runs(&self, evaluation_id: u64) -> Result<Vec<EvaluationRun>> {
        self.client
            .request(&format!("/api/evaluations/{}/runs", evaluation_id), RequestOptions::get())
            .await
    }

    pub async fn get_run(&self, evaluation_id: u64, run_id: u64) -> Result<EvaluationRun> {
        self.client
            .request(
                &format!("/api/evaluations/{}/runs/{}", evaluation_id, run_id),
                RequestOptions::get(),
            )
            .await
    }
}
