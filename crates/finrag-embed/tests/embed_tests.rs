use finrag_core::config::{EmbeddingProvider, EmbeddingSettings};
use finrag_core::traits::Embedder;
use finrag_embed::{get_default_embedder, HashEmbedder};

fn l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}

#[tokio::test]
async fn hash_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { provider: EmbeddingProvider::Hash, dim: 1024, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).await.expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 1024, "embedding dim is 1024");
    assert_eq!(embedder.dim(), 1024);
    assert_eq!(embedder.id(), "hash:d1024");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[tokio::test]
async fn related_texts_are_closer_than_unrelated() {
    let e = HashEmbedder::new(1024);
    let q = e.embed_text("TSMC earnings surprise");
    let near = e.embed_text("Company: TSMC. Earnings surprise of 4%");
    let far = e.embed_text("Overall sentiment bearish on European banks");
    assert!(l2(&q, &near) < l2(&q, &far));
    assert_eq!(e.embed_query("TSMC earnings surprise").await.expect("query"), q);
}

#[test]
fn openai_provider_needs_credentials() {
    let settings = EmbeddingSettings { provider: EmbeddingProvider::OpenAi, api_key: None, ..EmbeddingSettings::default() };
    assert!(get_default_embedder(&settings).is_err());
}

#[tokio::test]
async fn zero_width_is_rejected_not_a_panic() {
    let settings = EmbeddingSettings { provider: EmbeddingProvider::Hash, dim: 0, ..EmbeddingSettings::default() };
    assert!(matches!(get_default_embedder(&settings), Err(finrag_core::Error::InvalidConfig(_))));

    let e = HashEmbedder::new(0);
    assert!(e.embed_text("TSMC earnings").is_empty());
    assert_eq!(e.embed_batch(&["x".to_string()]).await.expect("embed_batch"), vec![Vec::<f32>::new()]);
}
