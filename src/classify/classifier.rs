//! Deal classifier: additive keyword scoring over title + description.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::config::ClassifierConfig;
use crate::ingest::types::RawArticle;

/// An article annotated with its deal score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedArticle {
    #[serde(flatten)]
    pub article: RawArticle,
    pub deal_score: u32,
}

#[derive(Debug, Clone)]
pub struct DealClassifier {
    threshold: u32,
    /// Lowercased keyword → weight. Each keyword counts at most once per article.
    rules: Vec<(String, u32)>,
}

impl DealClassifier {
    pub fn new(threshold: u32, weights: &BTreeMap<String, u32>) -> Self {
        let rules = weights
            .iter()
            .filter(|(k, _)| !k.is_empty())
            .map(|(k, w)| (k.to_lowercase(), *w))
            .collect();
        Self { threshold, rules }
    }

    pub fn from_config(cfg: &ClassifierConfig) -> Self {
        Self::new(cfg.threshold, &cfg.weights)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    fn score_text(&self, text: &str) -> u32 {
        let lc = text.to_lowercase();
        self.rules
            .iter()
            .filter(|(k, _)| lc.contains(k.as_str()))
            .map(|(_, w)| *w)
            .sum()
    }

    /// Returns `(is_deal, score)`.
    pub fn classify(&self, article: &RawArticle) -> (bool, u32) {
        let combined = format!("{} {}", article.title, article.description);
        let score = self.score_text(&combined);
        (score >= self.threshold, score)
    }

    /// Annotate every article with its score and keep those reaching the threshold.
    pub fn filter_deal_articles(&self, articles: Vec<RawArticle>) -> Vec<ClassifiedArticle> {
        articles
            .into_iter()
            .filter_map(|article| {
                let (is_deal, deal_score) = self.classify(&article);
                debug!(
                    target: "classify",
                    url = %article.url,
                    deal_score,
                    threshold = self.threshold,
                    is_deal,
                    "article classified"
                );
                is_deal.then_some(ClassifiedArticle {
                    article,
                    deal_score,
                })
            })
            .collect()
    }
}

impl Default for DealClassifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}
