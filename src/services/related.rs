use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{Article, RelatedArticle};

pub const SIMILARITY_THRESHOLD: f64 = 0.3;
pub const MAX_RELATED: usize = 3;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// Lowercased word tokens of a title
pub fn title_tokens(title: &str) -> HashSet<String> {
    NON_WORD
        .split(&title.to_lowercase())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let set_a = title_tokens(a);
    let set_b = title_tokens(b);

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }

    set_a.intersection(&set_b).count() as f64 / union as f64
}

/// Other articles whose titles overlap enough with `article`, best first
pub fn find_related(article: &Article, all: &[Article]) -> Vec<RelatedArticle> {
    let mut scored: Vec<(f64, &Article)> = all
        .iter()
        .filter(|other| other.id != article.id)
        .map(|other| (jaccard_similarity(&article.title, &other.title), other))
        .filter(|(score, _)| *score >= SIMILARITY_THRESHOLD)
        .collect();

    // sort_by is stable, so equal scores keep feed order
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    scored
        .into_iter()
        .take(MAX_RELATED)
        .map(|(_, other)| RelatedArticle::from(other))
        .collect()
}

/// Related articles for every article in the list, keyed by article id
pub fn related_map(all: &[Article]) -> HashMap<String, Vec<RelatedArticle>> {
    all.iter()
        .map(|article| (article.id.clone(), find_related(article, all)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, title: &str) -> Article {
        Article::new(id.to_string(), title.to_string())
    }

    #[test]
    fn test_tokens_lowercase_and_split_on_punctuation() {
        let tokens = title_tokens("Rust 1.75: Async-Traits, at LAST!");
        let expected: HashSet<String> = ["rust", "1", "75", "async", "traits", "at", "last"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_identical_titles() {
        assert_eq!(jaccard_similarity("Rust ships", "rust SHIPS"), 1.0);
    }

    #[test]
    fn test_disjoint_titles() {
        assert_eq!(jaccard_similarity("Rust ships", "Go releases"), 0.0);
    }

    #[test]
    fn test_empty_titles() {
        assert_eq!(jaccard_similarity("", ""), 0.0);
        assert_eq!(jaccard_similarity("...", "!!!"), 0.0);
    }

    #[test]
    fn test_partial_overlap_is_symmetric() {
        // {a, b, c} vs {b, c, d}: 2 / 4
        assert_eq!(jaccard_similarity("a b c", "b c d"), 0.5);
        assert_eq!(jaccard_similarity("b c d", "a b c"), 0.5);
    }

    #[test]
    fn test_find_related_excludes_self_and_below_threshold() {
        let all = vec![
            article("1", "Senate passes climate bill"),
            article("2", "Senate passes climate bill after debate"),
            article("3", "Local team wins cup"),
        ];

        let related = find_related(&all[0], &all);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, "2");
    }

    #[test]
    fn test_find_related_sorted_and_capped() {
        let all = vec![
            article("0", "apple banana cherry"),
            article("1", "apple banana cherry date elder"),
            article("2", "apple banana cherry"),
            article("3", "apple banana cherry date"),
            article("4", "apple banana fig grape"),
            article("5", "apple banana cherry date elder fig"),
        ];

        let related = find_related(&all[0], &all);
        let ids: Vec<&str> = related.iter().map(|r| r.id.as_str()).collect();
        // 2: 1.0, 3: 0.75, 1: 0.6, 5: 0.5, 4: 0.4
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    #[test]
    fn test_related_map_covers_every_article() {
        let all = vec![
            article("1", "Storm hits coast"),
            article("2", "Storm hits coast again"),
            article("3", "Markets rally"),
        ];

        let map = related_map(&all);
        assert_eq!(map.len(), 3);
        assert_eq!(map["1"][0].id, "2");
        assert_eq!(map["2"][0].id, "1");
        assert!(map["3"].is_empty());
    }
}
