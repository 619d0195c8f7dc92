// tests/pipeline_e2e.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use defense_deal_pipeline::storage::{CsvStorageWriter, SqliteStorageWriter};
use defense_deal_pipeline::{
    DealClassifier, LlmOracle, NewsFetcher, Pipeline, PipelineConfig, RawArticle,
};

/// Two queries; the second repeats one URL and the third fails outright.
struct MockFetcher;

fn article(url: &str, title: &str, content: &str) -> RawArticle {
    RawArticle {
        title: title.to_string(),
        description: "Ministry of Defence statement".to_string(),
        content: content.to_string(),
        url: url.to_string(),
        ..Default::default()
    }
}

#[async_trait]
impl NewsFetcher for MockFetcher {
    async fn fetch_articles(&self, query: &str, _max_records: u32) -> Result<Vec<RawArticle>> {
        match query {
            "drone deal" => Ok(vec![
                article(
                    "https://news.test/enord",
                    "Indian Army signs contract for Enord drones",
                    "enord",
                ),
                article(
                    "https://news.test/broken",
                    "Navy deal worth $2 billion awarded",
                    "broken",
                ),
            ]),
            "tank order" => Ok(vec![
                article(
                    "https://news.test/enord",
                    "Indian Army signs contract for Enord drones",
                    "enord",
                ),
                article(
                    "https://news.test/hanwha",
                    "Poland signed order worth million",
                    "hanwha",
                ),
                article("https://news.test/sports", "Cricket final tonight", "sports"),
            ]),
            _ => bail!("upstream timeout"),
        }
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

struct MockOracle;

#[async_trait]
impl LlmOracle for MockOracle {
    async fn complete(&self, article_text: &str) -> Result<String> {
        Ok(match article_text {
            "enord" => r#"Sure! Here is the JSON:
{"buyer":"Indian Army","seller":"Enord","product":"drones","quantity":"700+","deal_value":"multi-crore","currency":"rupee","deal_date":"2021-01-01","summary":"Army orders 700 drones"}"#
                .to_string(),
            "hanwha" => r#"{"buyer":"Poland","seller":"Hanwha","product":"K9 howitzers","quantity":"about 1,000 systems","deal_value":"$2.7 million","currency":"dollar"}"#
                .to_string(),
            "broken" => "I'm sorry, I can't find a deal in this article.".to_string(),
            other => bail!("unexpected article text {other}"),
        })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

fn queries() -> Vec<String> {
    vec![
        "drone deal".to_string(),
        "tank order".to_string(),
        "failing query".to_string(),
    ]
}

async fn build(dir: &std::path::Path) -> Pipeline {
    let sqlite = SqliteStorageWriter::open(&dir.join("deals.db")).await.unwrap();
    Pipeline::new(Box::new(MockFetcher), Box::new(MockOracle), DealClassifier::default())
        .with_writer(Box::new(CsvStorageWriter::new(dir.join("deals.csv"))))
        .with_writer(Box::new(sqlite))
}

#[tokio::test]
async fn full_run_persists_repaired_deals_to_both_backends() {
    let dir = tempfile::tempdir().unwrap();
    let p = build(dir.path()).await;

    let report = p.run(&queries()).await;
    assert_eq!(report.fetched, 4);
    assert_eq!(report.classified, 3);
    assert_eq!(report.parse_failures, 1);
    assert_eq!(report.extracted, 2);
    assert_eq!(report.deals.len(), 2);

    let enord = &report.deals[0];
    assert_eq!(enord.fields.buyer.as_deref(), Some("Enord"));
    assert_eq!(enord.fields.seller.as_deref(), Some("Indian Army"));
    assert_eq!(enord.fields.quantity.as_deref(), Some("700"));
    assert_eq!(enord.fields.currency.as_deref(), Some("INR"));
    assert_eq!(enord.fields.deal_date, None);
    assert_eq!(enord.quantity_normalized, Some(700));
    // "multi-crore" survives cleaning but carries no number.
    assert_eq!(enord.deal_value_normalized, None);
    assert_eq!(enord.confidence, 1.0);

    let hanwha = &report.deals[1];
    assert_eq!(hanwha.fields.currency.as_deref(), Some("USD"));
    assert_eq!(hanwha.deal_value_normalized, Some(2_700_000));
    assert_eq!(hanwha.quantity_normalized, Some(1));
    assert_eq!(hanwha.confidence, 0.95);

    assert_eq!(report.writes.len(), 2);
    for w in &report.writes {
        let r = w.result.as_ref().unwrap();
        assert_eq!(r.written, 2, "writer {}", w.writer);
    }

    let csv = CsvStorageWriter::new(dir.path().join("deals.csv"));
    let rows = csv.load_rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].source_url, "https://news.test/enord");
    assert_eq!(rows[0].deal_value.as_deref(), Some("multi-crore"));
    assert_eq!(rows[1].currency.as_deref(), Some("USD"));
}

#[tokio::test]
async fn second_run_adds_no_rows() {
    let dir = tempfile::tempdir().unwrap();

    let first = build(dir.path()).await.run(&queries()).await;
    assert_eq!(first.deals.len(), 2);

    let second = build(dir.path()).await.run(&queries()).await;
    for w in &second.writes {
        let r = w.result.as_ref().unwrap();
        assert_eq!(r.written, 0, "writer {}", w.writer);
        assert_eq!(r.skipped_duplicates, 2, "writer {}", w.writer);
    }

    let csv = CsvStorageWriter::new(dir.path().join("deals.csv"));
    assert_eq!(csv.load_rows().unwrap().len(), 2);
    let db = SqliteStorageWriter::open(&dir.path().join("deals.db")).await.unwrap();
    assert_eq!(db.count().await.unwrap(), 2);
}

#[tokio::test]
async fn config_enabled_keyword_filter_gates_articles() {
    let cfg = PipelineConfig::from_toml_str(
        r#"
        [keyword_filter]
        enabled = true
        product = ["drones"]
        deal = ["contract"]
        context = ["army"]
        "#,
    )
    .unwrap();

    let p = Pipeline::from_config(&cfg, Box::new(MockFetcher), Box::new(MockOracle));
    let report = p.run(&queries()).await;
    assert_eq!(report.fetched, 4);
    assert_eq!(report.after_keyword_filter, 1);
    assert_eq!(report.deals.len(), 1);
    assert_eq!(report.deals[0].fields.buyer.as_deref(), Some("Enord"));
    assert!(report.writes.is_empty());
}
