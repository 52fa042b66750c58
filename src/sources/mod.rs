pub mod freshrss;
pub mod traits;

pub use freshrss::FreshRssClient;
pub use traits::ArticleSource;
