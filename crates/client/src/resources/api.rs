use std::marker::PhantomData;

use async_trait::async_trait;
use cabin_core::{Draft, Resource};
use reqwest::Method;

use crate::error::ApiError;
use crate::http::{ApiClient, Auth};

/// Server operations over one collection.
#[async_trait]
pub trait ResourceApi<R: Resource>: Send + Sync {
    async fn list(&self) -> Result<Vec<R>, ApiError>;
    async fn create(&self, draft: &R::Create) -> Result<R, ApiError>;
    async fn update(&self, id: &str, draft: &R::Update) -> Result<R, ApiError>;
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

/// `{GET,POST,PUT,DELETE} /<R::PATH>[/:id]` over the shared client.
pub struct RestResource<R> {
    api: ApiClient,
    _marker: PhantomData<fn() -> R>,
}

impl<R> RestResource<R> {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            _marker: PhantomData,
        }
    }
}

impl<R: Resource> RestResource<R> {
    fn item_path(id: &str) -> String {
        format!("{}/{}", R::PATH, id)
    }
}

#[async_trait]
impl<R: Resource> ResourceApi<R> for RestResource<R> {
    async fn list(&self) -> Result<Vec<R>, ApiError> {
        self.api.get(R::PATH).await
    }

    async fn create(&self, draft: &R::Create) -> Result<R, ApiError> {
        let payload = draft.to_payload()?;
        self.api
            .send_payload(Method::POST, R::PATH, payload, Auth::Session)
            .await
    }

    async fn update(&self, id: &str, draft: &R::Update) -> Result<R, ApiError> {
        let payload = draft.to_payload()?;
        self.api
            .send_payload(Method::PUT, &Self::item_path(id), payload, Auth::Session)
            .await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete(&Self::item_path(id)).await
    }
}
