use async_trait::async_trait;

use crate::categorizer::Categorizer;
use crate::errors::NewsResult;

/// Substring keywords per category, matched against lowercased text
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Politics",
        &[
            "election", "government", "senate", "congress", "president", "politics", "law",
            "policy", "minister", "parliament",
        ],
    ),
    (
        "US",
        &[
            "united states", "america", "us ", "usa", "american", "washington", "new york",
            "california",
        ],
    ),
    (
        "World",
        &["world", "global", "international", "foreign", "abroad", "overseas"],
    ),
    (
        "Sports",
        &[
            "sport", "game", "match", "tournament", "league", "nba", "nfl", "mlb", "soccer",
            "football", "basketball", "olympics",
        ],
    ),
    (
        "Technology",
        &[
            "tech", "technology", "software", "hardware", "computer", "ai",
            "artificial intelligence", "internet", "app", "gadget", "device",
        ],
    ),
    (
        "Entertainment",
        &[
            "movie", "film", "music", "entertainment", "tv", "show", "celebrity", "concert",
            "festival",
        ],
    ),
    (
        "Science",
        &[
            "science", "research", "study", "scientist", "space", "nasa", "physics", "chemistry",
            "biology",
        ],
    ),
    (
        "Health",
        &[
            "health", "medicine", "medical", "doctor", "hospital", "disease", "virus", "covid",
            "wellness",
        ],
    ),
    (
        "Business",
        &[
            "business", "market", "stock", "finance", "economy", "trade", "company", "corporate",
            "industry",
        ],
    ),
];

/// Offline categorizer. Cheap and crude: "ai" also matches "said".
#[derive(Debug, Clone, Default)]
pub struct KeywordCategorizer;

impl KeywordCategorizer {
    pub fn new() -> Self {
        Self
    }

    pub fn categories_for(text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
            .map(|(category, _)| category.to_string())
            .collect()
    }
}

#[async_trait]
impl Categorizer for KeywordCategorizer {
    async fn categorize(&self, text: &str) -> NewsResult<Vec<String>> {
        Ok(Self::categories_for(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::CATEGORIES;

    #[test]
    fn test_table_follows_category_order() {
        let names: Vec<&str> = CATEGORY_KEYWORDS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, CATEGORIES);
    }

    #[test]
    fn test_matches_multiple_categories() {
        let categories =
            KeywordCategorizer::categories_for("NASA scientists publish new space research");
        assert_eq!(categories, vec!["Science"]);

        let categories = KeywordCategorizer::categories_for(
            "Senate debates stock market policy in Washington",
        );
        assert_eq!(categories, vec!["Politics", "US", "Business"]);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            KeywordCategorizer::categories_for("OLYMPICS OPENING CEREMONY"),
            vec!["Sports"]
        );
    }

    #[test]
    fn test_no_match() {
        assert!(KeywordCategorizer::categories_for("Quiet day").is_empty());
    }

    #[tokio::test]
    async fn test_trait_impl() {
        let categorizer = KeywordCategorizer::new();
        let categories = categorizer.categorize("Doctors warn about disease").await.unwrap();
        assert_eq!(categories, vec!["Health"]);
    }
}
