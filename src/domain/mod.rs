pub mod article;
pub mod source;
pub mod user;

pub use article::{normalize_feed, Article, Origin, RelatedArticle, Summary};
pub use source::Source;
pub use user::UserProfile;
