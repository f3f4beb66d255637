use serde_json::json;
use tempfile::TempDir;

use finrag_core::config::{EmbeddingProvider, Settings};
use finrag_retrieval::RetrievalCoordinator;

async fn open(tmp: &TempDir) -> anyhow::Result<RetrievalCoordinator> {
    let mut settings = Settings::default();
    settings.store.root = tmp.path().to_string_lossy().into_owned();
    settings.embedding.provider = EmbeddingProvider::Hash;
    settings.embedding.dim = 128;
    Ok(RetrievalCoordinator::from_settings(&settings).await?)
}

#[tokio::test]
async fn index_then_retrieve_across_namespaces() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let c = open(&tmp).await?;

    let news = vec![
        json!({"title": "TSMC beats estimates", "summary": "AI server demand lifts revenue", "source": "Reuters", "link": "https://example.test/a"}),
        json!({"title": "Samsung cuts memory output", "summary": "Inventory glut persists", "source": "Bloomberg", "link": "https://example.test/b"}),
    ];
    let earnings = vec![json!({"name": "TSMC", "symbol": "2330.TW", "date": "2024-07-18", "eps_estimate": 9.1, "reported_eps": 9.56, "surprise_pct": 5.05})];
    assert!(c.index_financial_data(news, "news").await);
    assert!(c.index_financial_data(earnings, "earnings").await);

    let exact = "Title: TSMC beats estimates\n\nSummary: AI server demand lifts revenue\n\nSource: Reuters";
    let hits = c.retrieve(exact, "news", 5).await;
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].content, exact);
    assert!(hits[0].confidence > 99.9);
    assert_eq!(hits[0].metadata.get("source"), Some(&json!("Reuters")));

    let overview = c.retrieve_market_overview(exact, Some(99.0)).await;
    assert_eq!(overview.top_result.as_ref().map(|h| h.content.as_str()), Some(exact));
    assert!(overview.results.iter().all(|h| h.confidence >= 99.0));
    assert!(overview.below_threshold, "average includes the weaker hits");
    Ok(())
}

#[tokio::test]
async fn indexing_the_same_record_twice_still_ranks_it_first() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let c = open(&tmp).await?;
    let item = json!({"overall_sentiment": "Bullish", "sentiment_score": 0.72, "key_indicators": [{"headline": "Chip exports rebound"}]});
    let content = "Overall Sentiment: Bullish\n\nSentiment Score: 0.72\n\nKey Indicators: Chip exports rebound";

    for round in 1..=2 {
        assert!(c.index_financial_data(vec![item.clone()], "sentiment").await);
        let hits = c.retrieve(content, "sentiment", 1).await;
        assert_eq!(hits.len(), 1, "round {round}");
        assert_eq!(hits[0].content, content);
        assert!(hits[0].score.abs() < 1e-4);
    }
    assert_eq!(c.vector_index().count("sentiment").await?, 2);
    Ok(())
}
