use super::with_query;
use crate::client::{Client, RequestOptions};
use crate::transport::HttpMethod;
use crate::types::{
    ApiKey, ApiKeyUsage, ApiKeyWithSecret, CreateApiKeyParams, CreateWebhookParams, GetUsageParams,
    ListApiKeysParams, ListWebhookDeliveriesParams, ListWebhooksParams, MessageResponse,
    UpdateApiKeyParams, UpdateWebhookParams, UsageStats, UsageSummary, Webhook, WebhookDelivery,
};
use crate::Result;

/// Usage reporting, API keys and webhooks.
pub struct Developer<'a> {
    client: &'a Client,
}

impl<'a> Developer<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Never cached.
    pub async fn usage(&self, params: &GetUsageParams) -> Result<UsageStats> {
        self.client
            .request(&with_query("/api/developer/usage", params)?, RequestOptions::get())
            .await
    }

    pub async fn usage_summary(&self, organization_id: u64) -> Result<UsageSummary> {
        self.client
            .request(
                &format!("/api/developer/usage/summary?organizationId={}", organization_id),
                RequestOptions::get(),
            )
            .await
    }

    pub fn api_keys(&self) -> ApiKeys<'a> {
        ApiKeys { client: self.client }
    }

    pub fn webhooks(&self) -> Webhooks<'a> {
        Webhooks { client: self.client }
    }
}

pub struct ApiKeys<'a> {
    client: &'a Client,
}

impl<'a> ApiKeys<'a> {
    pub async fn create(&self, params: &CreateApiKeyParams) -> Result<ApiKeyWithSecret> {
        self.client
            .request(
                "/api/developer/api-keys",
                RequestOptions::new(HttpMethod::Post).with_json(params)?,
            )
            .await
    }

    pub async fn list(&self, params: &ListApiKeysParams) -> Result<Vec<ApiKey>> {
        self.client
            .request(&with_query("/api/developer/api-keys", params)?, RequestOptions::get())
            .await
    }

    pub async fn update(&self, key_id: u64, params: &UpdateApiKeyParams) -> Result<ApiKey> {
        self.client
            .request(
                &format!("/api/developer/api-keys/{}", key_id),
                RequestOptions::new(HttpMethod::Patch).with_json(params)?,
            )
            .await
    }

    pub async fn revoke(&self, key_id: u64) -> Result<MessageResponse> {
        self.client
            .request(&format!("/api/developer/api-keys/{}", key_id), RequestOptions::delete())
            .await
    }

    pub async fn usage(&self, key_id: u64) -> Result<ApiKeyUsage> {
        self.client
            .request(&format!("/api/developer/api-keys/{}/usage", key_id), RequestOptions::get())
            .await
    }
}

pub struct Webhooks<'a> {
    client: &'a Client,
}

impl<'a> Webhooks<'a> {
    pub async fn create(&self, params: &CreateWebhookParams) -> Result<Webhook> {
        self.client
            .request(
                "/api/developer/webhooks",
                RequestOptions::new(HttpMethod::Post).with_json(params)?,
            )
            .await
    }

    pub async fn list(&self, params: &ListWebhooksParams) -> Result<Vec<Webhook>> {
        self.client
            .request(&with_query("/api/developer/webhooks", params)?, RequestOptions::get())
            .await
    }

    pub async fn get(&self, webhook_id: u64) -> Result<Webhook> {
        self.client
            .request(&format!("/api/developer/webhooks/{}", webhook_id), RequestOptions::get())
            .await
    }

    pub async fn update(&self, webhook_id: u64, params: &UpdateWebhookParams) -> Result<Webhook> {
        self.client
            .request(
                &format!("/api/developer/webhooks/{}", webhook_id),
                RequestOptions::new(HttpMethod::Patch).with_json(params)?,
            )
            .await
    }

    pub async fn delete(&self, webhook_id: u64) -> Result<MessageResponse> {
        self.client
            .request(&format!("/api/developer/webhooks/{}", webhook_id), RequestOptions::delete())
            .await
    }

    /// Delivery log; never cached.
    pub async fn deliveries(
        &self,
        webhook_id: u64,
        params: &ListWebhookDeliveriesParams,
    ) -> Result<Vec<WebhookDelivery>> {
        let path = format!("/api/developer/webhooks/{}/deliveries", webhook_id);
        self.client
            .request(&with_query(&path, params)?, RequestOptions::get())
            .await
    }
}
