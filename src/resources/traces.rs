use super::{with_ambient, with_query};
use crate::client::{Client, RequestOptions};
use crate::context::merge_with_context;
use crate::pagination::{auto_paginate, DEFAULT_PAGE_LIMIT};
use crate::types::{CreateSpanParams, CreateTraceParams, ListTracesParams, MessageResponse, Span, Trace};
use crate::Result;
use crate::transport::HttpMethod;
use futures::Stream;

/// Traces and their spans.
pub struct Traces<'a> {
    client: &'a Client,
}

impl<'a> Traces<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Record a trace. Requires an organization (explicit or configured);
    /// metadata is layered over the ambient context, explicit keys winning.
    pub async fn create(&self, params: CreateTraceParams) -> Result<Trace> {
        let org = self.client.require_organization(params.organization_id)?;
        let metadata = merge_with_context(params.metadata.as_ref());
        let body = CreateTraceParams {
            organization_id: Some(org),
            metadata: Some(metadata),
            ..params
        };
        self.client
            .request("/api/traces", RequestOptions::new(HttpMethod::Post).with_json(&body)?)
            .await
    }

    pub async fn list(&self, params: &ListTracesParams) -> Result<Vec<Trace>> {
        self.client
            .request(&with_query("/api/traces", params)?, RequestOptions::get())
            .await
    }

    pub async fn get(&self, id: u64) -> Result<Trace> {
        self.client
            .request(&format!("/api/traces/{}", id), RequestOptions::get())
            .await
    }

    pub async fn delete(&self, id: u64) -> Result<MessageResponse> {
        self.client
            .request(&format!("/api/traces?id={}", id), RequestOptions::delete())
            .await
    }

    /// Span metadata is layered over the ambient context like trace metadata.
    pub async fn create_span(&self, trace_id: u64, params: &CreateSpanParams) -> Result<Span> {
        let body = CreateSpanParams {
            metadata: with_ambient(params.metadata.clone()),
            ..params.clone()
        };
        self.client
            .request(
                &format!("/api/traces/{}/spans", trace_id),
                RequestOptions::new(HttpMethod::Post).with_json(&body)?,
            )
            .await
    }

    pub async fn list_spans(&self, trace_id: u64) -> Result<Vec<Span>> {
        self.client
            .request(&format!("/api/traces/{}/spans", trace_id), RequestOptions::get())
            .await
    }

    /// Every trace matching `filter`, fetched page by page on demand.
    /// `limit` in the filter sets the page size; `offset` is ignored.
    pub fn list_all(&self, filter: ListTracesParams) -> impl Stream<Item = Result<Trace>> + 'static {
        let client = self.client.clone();
        let page_size = filter.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        auto_paginate(
            move |offset, limit| {
                let client = client.clone();
                let params = ListTracesParams {
                    limit: Some(limit),
                    offset: Some(offset),
                    ..filter.clone()
                };
                async move { Traces::new(&client).list(&params).await }
            },
            page_size,
        )
    }
}
