use std::collections::BTreeMap;

use opml::{Head, Outline, OPML};

use crate::domain::Source;
use crate::errors::{NewsError, NewsResult};

pub const OPML_TITLE: &str = "NewsFeed Subscriptions";

fn feed_outline(source: &Source) -> Outline {
    Outline {
        text: source.title.clone(),
        title: Some(source.title.clone()),
        r#type: Some("rss".to_string()),
        xml_url: Some(source.feed_url.clone()),
        html_url: Some(source.url.clone()).filter(|u| !u.is_empty()),
        ..Default::default()
    }
}

/// Export subscriptions as OPML, one folder per category
pub fn export_opml(sources: &[Source]) -> NewsResult<String> {
    let mut opml = OPML {
        head: Some(Head {
            title: Some(OPML_TITLE.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };

    let mut folders: BTreeMap<&str, Vec<Outline>> = BTreeMap::new();
    let mut loose = Vec::new();

    for source in sources {
        let category = source.category.trim();
        if category.is_empty() {
            loose.push(feed_outline(source));
        } else {
            folders
                .entry(category)
                .or_default()
                .push(feed_outline(source));
        }
    }

    for (category, outlines) in folders {
        opml.body.outlines.push(Outline {
            text: category.to_string(),
            title: Some(category.to_string()),
            outlines,
            ..Default::default()
        });
    }
    opml.body.outlines.extend(loose);

    opml.to_string()
        .map_err(|e| NewsError::Opml(e.to_string()))
}
