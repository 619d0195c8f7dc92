//! Grouped keyword pre-filter: an article must mention a product, a deal word
//! and a defense context word.

use crate::config::KeywordFilterConfig;
use crate::ingest::types::RawArticle;

#[derive(Debug, Clone)]
pub struct KeywordEngine {
    product: Vec<String>,
    deal: Vec<String>,
    context: Vec<String>,
}

fn lowered(xs: &[String]) -> Vec<String> {
    xs.iter().map(|s| s.to_lowercase()).collect()
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| text.contains(k.as_str()))
}

impl KeywordEngine {
    pub fn new(product: &[String], deal: &[String], context: &[String]) -> Self {
        Self {
            product: lowered(product),
            deal: lowered(deal),
            context: lowered(context),
        }
    }

    pub fn from_config(cfg: &KeywordFilterConfig) -> Self {
        Self::new(&cfg.product, &cfg.deal, &cfg.context)
    }

    /// True iff every group has at least one hit. An empty group never matches.
    pub fn matches(&self, article: &RawArticle) -> bool {
        let text = format!("{} {}", article.title, article.description).to_lowercase();
        contains_any(&text, &self.product)
            && contains_any(&text, &self.deal)
            && contains_any(&text, &self.context)
    }

    pub fn filter_articles(&self, articles: Vec<RawArticle>) -> Vec<RawArticle> {
        articles.into_iter().filter(|a| self.matches(a)).collect()
    }
}
