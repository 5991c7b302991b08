use crate::client::{Client, RequestOptions};
use crate::types::Organization;
use crate::Result;

pub struct Organizations<'a> {
    client: &'a Client,
}

impl<'a> Organizations<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Organization owning the configured credential.
    pub async fn current(&self) -> Result<Organization> {
        self.client
            .request("/api/organizations/current", RequestOptions::get())
            .await
    }
}
