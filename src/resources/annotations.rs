use super::{with_ambient, with_query};
use crate::client::{Client, RequestOptions};
use crate::transport::HttpMethod;
use crate::types::{
    Annotation, AnnotationItem, AnnotationTask, CreateAnnotationItemParams, CreateAnnotationParams,
    CreateAnnotationTaskParams, ListAnnotationItemsParams, ListAnnotationTasksParams,
    ListAnnotationsParams,
};
use crate::Result;
use serde::Deserialize;

#[derive(Deserialize)]
struct AnnotationEnvelope {
    annotation: Annotation,
}

/// Human annotations on evaluation runs.
pub struct Annotations<'a> {
    client: &'a Client,
}

impl<'a> Annotations<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// The server wraps the created record as `{ "annotation": ... }`.
    pub async fn create(&self, params: &CreateAnnotationParams) -> Result<Annotation> {
        let body = CreateAnnotationParams {
            metadata: with_ambient(params.metadata.clone()),
            ..params.clone()
        };
        let envelope: AnnotationEnvelope = self
            .client
            .request(
                "/api/annotations",
                RequestOptions::new(HttpMethod::Post).with_json(&body)?,
            )
            .await?;
        Ok(envelope.annotation)
    }

    pub async fn list(&self, params: &ListAnnotationsParams) -> Result<Vec<Annotation>> {
        self.client
            .request(&with_query("/api/annotations", params)?, RequestOptions::get())
            .await
    }

    pub fn tasks(&self) -> AnnotationTasks<'a> {
        AnnotationTasks { client: self.client }
    }
}

pub struct AnnotationTasks<'a> {
    client: &'a Client,
}

impl<'a> AnnotationTasks<'a> {
    pub async fn create(&self, params: &CreateAnnotationTaskParams) -> Result<AnnotationTask> {
        self.client
            .request(
                "/api/annotations/tasks",
                RequestOptions::new(HttpMethod::Post).with_json(params)?,
            )
            .await
    }

    pub async fn list(&self, params: &ListAnnotationTasksParams) -> Result<Vec<AnnotationTask>> {
        self.client
            .request(&with_query("/api/annotations/tasks", params)?, RequestOptions::get())
            .await
    }

    pub async fn get(&self, task_id: u64) -> Result<AnnotationTask> {
        self.client
            .request(&format!("/api/annotations/tasks/{}", task_id), RequestOptions::get())
            .await
    }

    pub fn items(&self) -> AnnotationItems<'a> {
        AnnotationItems { client: self.client }
    }
}

pub struct AnnotationItems<'a> {
    client: &'a Client,
}

impl<'a> AnnotationItems<'a> {
    pub async fn create(&self, task_id: u64, params: &CreateAnnotationItemParams) -> Result<AnnotationItem> {
        self.client
            .request(
                &format!("/api/annotations/tasks/{}/items", task_id),
                RequestOptions::new(HttpMethod::Post).with_json(params)?,
            )
            .await
    }

    pub async fn list(&self, task_id: u64, params: &ListAnnotationItemsParams) -> Result<Vec<AnnotationItem>> {
        let path = format!("/api/annotations/tasks/{}/items", task_id);
        self.client
            .request(&with_query(&path, params)?, RequestOptions::get())
            .await
    }
}
