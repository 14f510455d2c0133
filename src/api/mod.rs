mod client;

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

pub use client::{MarketplaceClient, ResourceFetcher};

/// Zero-argument asynchronous source of a payload.
#[async_trait]
pub trait Fetcher<T>: Send + Sync {
    async fn fetch(&self) -> Result<T>;
}

/// Adapts a closure returning a future into a [`Fetcher`].
pub struct FnFetcher<F, T> {
    f: F,
    _payload: PhantomData<fn() -> T>,
}

impl<F, Fut, T> FnFetcher<F, T>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T>> + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, T> Fetcher<T> for FnFetcher<F, T>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T>> + Send,
    T: Send + 'static,
{
    async fn fetch(&self) -> Result<T> {
        (self.f)().await
    }
}
