use async_trait::async_trait;
use finrag_core::traits::{Embedder, VectorIndex};
use finrag_core::{Chunk, Chunker, DataType, Error, FinancialItem, Metadata};
use finrag_embed::HashEmbedder;
use finrag_vector::LanceNamespaceIndex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Hash embeddings behind a fixed per-request delay.
struct SlowEmbedder {
    inner: HashEmbedder,
    delay: Duration,
}

#[async_trait]
impl Embedder for SlowEmbedder {
    fn id(&self) -> &str {
        "slow-hash"
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    async fn embed_batch(&self, texts: &[String]) -> finrag_core::Result<Vec<Vec<f32>>> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed_batch(texts).await
    }
}

fn numbered_chunks(namespace: &str, writer: usize, n: usize) -> Vec<Chunk> {
    (0..n)
        .map(|i| Chunk::new(namespace, format!("writer {writer} quote {i}: 2330.TW up {i}%"), Metadata::new(), i, n))
        .collect()
}

fn news_chunks() -> Vec<Chunk> {
    let dt = DataType::News;
    let items = [
        json!({"title": "TSMC beats estimates", "summary": "Revenue up 20% on AI demand", "source": "Reuters", "link": "https://example.test/1"}),
        json!({"title": "Samsung guidance cut", "summary": "Memory prices slide", "source": "Bloomberg", "link": "https://example.test/2"}),
        json!({"title": "Sony lifts outlook", "summary": "Gaming division strong", "source": "Nikkei", "link": "https://example.test/3"}),
    ];
    let chunker = Chunker::default();
    items
        .into_iter()
        .flat_map(|v| {
            let item = FinancialItem::from_json(&dt, v).expect("news item");
            chunker.chunk_record(&finrag_core::format(&item, &dt), dt.namespace())
        })
        .collect()
}

#[tokio::test]
async fn indexed_text_is_its_own_nearest_neighbour() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let index = LanceNamespaceIndex::open(tmp.path()).await?;
    let embedder = HashEmbedder::new(64);
    let chunks = news_chunks();

    assert_eq!(index.create_or_append("news", &chunks, &embedder).await?, chunks.len());
    let hits = index.search("news", &chunks[1].content, &embedder, 3).await?;
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].0.content, chunks[1].content);
    assert!(hits[0].1.abs() < 1e-4, "exact match distance {}", hits[0].1);
    assert!(hits.windows(2).all(|w| w[0].1 <= w[1].1), "ascending by distance");
    assert_eq!(hits[0].0.metadata.get("type"), Some(&json!("news")));
    Ok(())
}

#[tokio::test]
async fn second_write_appends_and_survives_reopen() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let embedder = HashEmbedder::new(64);
    let chunks = news_chunks();
    {
        let index = LanceNamespaceIndex::open(tmp.path()).await?;
        index.create_or_append("news", &chunks, &embedder).await?;
        index.create_or_append("news", &chunks, &embedder).await?;
        assert_eq!(index.count("news").await?, chunks.len() * 2);
    }
    let reopened = LanceNamespaceIndex::open(tmp.path()).await?;
    assert_eq!(reopened.count("news").await?, chunks.len() * 2);
    assert!(tmp.path().join("news.lance").is_dir());
    let hits = reopened.search("news", &chunks[0].content, &embedder, 2).await?;
    assert_eq!(hits[0].0.content, chunks[0].content);
    Ok(())
}

#[tokio::test]
async fn namespaces_are_isolated() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let index = LanceNamespaceIndex::open(tmp.path()).await?;
    let embedder = HashEmbedder::new(64);
    index.create_or_append("news", &news_chunks(), &embedder).await?;

    let mut meta = Metadata::new();
    meta.insert("type".into(), json!("earnings"));
    let earnings = vec![Chunk::new("earnings", "Company: TSMC (2330.TW)\nEPS Estimate: 9.1".into(), meta, 0, 1)];
    index.create_or_append("earnings", &earnings, &embedder).await?;

    let hits = index.search("earnings", "TSMC beats estimates", &embedder, 10).await?;
    assert_eq!(hits.len(), 1);
    assert!(hits.iter().all(|(c, _)| c.namespace == "earnings"));
    assert_eq!(index.namespaces().await?, vec!["earnings".to_string(), "news".to_string()]);
    Ok(())
}

#[tokio::test]
async fn missing_namespace_and_edge_inputs() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let index = LanceNamespaceIndex::open(tmp.path()).await?;
    let embedder = HashEmbedder::new(64);

    assert!(index.search("sentiment", "anything", &embedder, 5).await?.is_empty());
    assert_eq!(index.count("sentiment").await?, 0);
    assert_eq!(index.create_or_append("news", &[], &embedder).await?, 0);
    assert!(index.namespaces().await?.is_empty(), "empty input creates nothing");
    assert!(index.create_or_append("../escape", &news_chunks(), &embedder).await.is_err());

    index.create_or_append("news", &news_chunks(), &embedder).await?;
    assert!(index.search("news", "TSMC", &embedder, 0).await?.is_empty());
    // A different embedder width cannot be mixed into an existing namespace.
    assert!(index.create_or_append("news", &news_chunks(), &HashEmbedder::new(32)).await.is_err());
    assert!(index.search("news", "TSMC", &HashEmbedder::new(32), 1).await.is_err());
    Ok(())
}

#[tokio::test]
async fn concurrent_writers_on_a_fresh_namespace_all_land() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let index = Arc::new(LanceNamespaceIndex::open(tmp.path()).await?);
    let embedder = Arc::new(HashEmbedder::new(32));

    let mut tasks = Vec::new();
    for writer in 0..4 {
        let index = Arc::clone(&index);
        let embedder = Arc::clone(&embedder);
        tasks.push(tokio::spawn(async move {
            let chunks = numbered_chunks("stock_data", writer, 3 + writer);
            index.create_or_append("stock_data", &chunks, embedder.as_ref()).await
        }));
    }
    let mut total = 0;
    for task in tasks {
        total += task.await??;
    }
    assert_eq!(total, 3 + 4 + 5 + 6);
    assert_eq!(index.count("stock_data").await?, total);
    assert_eq!(index.namespaces().await?, vec!["stock_data".to_string()]);
    Ok(())
}

#[tokio::test]
async fn timeout_bounds_each_embedding_request_not_the_batch() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let index = LanceNamespaceIndex::open(tmp.path())
        .await?
        .with_embed_batch(1)
        .with_call_timeout(Duration::from_millis(500));
    let slow = SlowEmbedder { inner: HashEmbedder::new(32), delay: Duration::from_millis(100) };

    // Ten requests take about a second in total, each well inside the limit.
    let chunks = numbered_chunks("earnings", 0, 10);
    assert_eq!(index.create_or_append("earnings", &chunks, &slow).await?, 10);

    let stalled = SlowEmbedder { inner: HashEmbedder::new(32), delay: Duration::from_secs(5) };
    let err = index.create_or_append("earnings", &numbered_chunks("earnings", 1, 1), &stalled).await;
    assert!(matches!(err, Err(Error::Timeout(500))), "{err:?}");
    assert_eq!(index.count("earnings").await?, 10);
    Ok(())
}
