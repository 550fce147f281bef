pub mod client;
pub mod page_token;
pub mod query;

pub use client::{
    index_name_for,
    BulkAction,
    SearchClient,
    SearchClientConfig,
    SearchResult,
};
