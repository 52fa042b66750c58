pub mod client;
pub mod greader;

pub use client::FreshRssClient;
