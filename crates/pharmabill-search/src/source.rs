use std::sync::Arc;

use async_trait::async_trait;
use pharmabill_core::{CustomerSummary, ProductSummary};

/// Backend that answers type-ahead queries.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn search_customers(&self, query: &str, limit: usize) -> anyhow::Result<Vec<CustomerSummary>>;
    async fn search_products(&self, query: &str, limit: usize) -> anyhow::Result<Vec<ProductSummary>>;
}

/// One kind of search a [`SearchSession`](crate::SearchSession) drives.
#[async_trait]
pub trait Lookup: Send + Sync {
    type Hit: Clone + Send + Sync + 'static;

    async fn lookup(&self, query: &str) -> anyhow::Result<Vec<Self::Hit>>;
}

pub struct CustomerLookup<S> {
    source: Arc<S>,
    limit: usize,
}

impl<S> CustomerLookup<S> {
    pub fn new(source: Arc<S>, limit: usize) -> Self {
        Self { source, limit }
    }
}

#[async_trait]
impl<S: CatalogSource> Lookup for CustomerLookup<S> {
    type Hit = CustomerSummary;

    async fn lookup(&self, query: &str) -> anyhow::Result<Vec<CustomerSummary>> {
        self.source.search_customers(query, self.limit).await
    }
}

pub struct ProductLookup<S> {
    source: Arc<S>,
    limit: usize,
}

impl<S> ProductLookup<S> {
    pub fn new(source: Arc<S>, limit: usize) -> Self {
        Self { source, limit }
    }
}

#[async_trait]
impl<S: CatalogSource> Lookup for ProductLookup<S> {
    type Hit = ProductSummary;

    async fn lookup(&self, query: &str) -> anyhow::Result<Vec<ProductSummary>> {
        self.source.search_products(query, self.limit).await
    }
}
