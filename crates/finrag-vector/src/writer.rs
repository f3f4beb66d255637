use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use lancedb::{Connection, Table};
use std::sync::Arc;

use finrag_core::{Chunk, Error, Result};

use crate::registry::NamespaceHandle;
use crate::schema::{build_chunk_schema, vector_dim};
use crate::table::open_table_if_exists;

pub(crate) fn chunks_to_record_batch(chunks: &[Chunk], vectors: &[Vec<f32>], dim: i32) -> Result<RecordBatch> {
	let namespace = chunks.first().map(|c| c.namespace.as_str()).unwrap_or("");
	if chunks.len() != vectors.len() {
		return Err(Error::persist(namespace, format!("{} chunks but {} vectors", chunks.len(), vectors.len())));
	}
	if let Some(bad) = vectors.iter().find(|v| v.len() != dim as usize) {
		return Err(Error::persist(namespace, format!("dim mismatch: got {} expected {dim}", bad.len())));
	}
	let schema = build_chunk_schema(dim);
	let now = Utc::now().timestamp_millis();
	let mut ids = Vec::with_capacity(chunks.len());
	let mut namespaces = Vec::with_capacity(chunks.len());
	let mut contents = Vec::with_capacity(chunks.len());
	let mut metadata = Vec::with_capacity(chunks.len());
	let mut chunk_indices = Vec::with_capacity(chunks.len());
	let mut total_chunks = Vec::with_capacity(chunks.len());
	let mut indexed_at = Vec::with_capacity(chunks.len());
	let mut vecs: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(chunks.len());
	for (chunk, vector) in chunks.iter().zip(vectors) {
		ids.push(chunk.id.clone());
		namespaces.push(chunk.namespace.clone());
		contents.push(chunk.content.clone());
		metadata.push(serde_json::to_string(&chunk.metadata).map_err(|e| Error::persist(namespace, e))?);
		chunk_indices.push(chunk.chunk_index as i32);
		total_chunks.push(chunk.total_chunks as i32);
		indexed_at.push(now);
		vecs.push(Some(vector.iter().map(|&x| Some(x)).collect()));
	}
	RecordBatch::try_new(
		schema,
		vec![
			Arc::new(StringArray::from(ids)),
			Arc::new(StringArray::from(namespaces)),
			Arc::new(StringArray::from(contents)),
			Arc::new(StringArray::from(metadata)),
			Arc::new(Int32Array::from(chunk_indices)),
			Arc::new(Int32Array::from(total_chunks)),
			Arc::new(TimestampMillisecondArray::from(indexed_at)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vecs.into_iter(), dim)),
		],
	)
	.map_err(|e| Error::persist(namespace, e))
}

/// Creates the namespace table from `batch` or appends `batch` to it. The
/// caller must hold `handle.write_lock`.
///
/// Either path is a single Lance commit: data files are written first and the
/// new manifest becomes visible last, so readers see the old version or the
/// complete new one.
pub(crate) async fn write_locked(conn: &Connection, handle: &NamespaceHandle, namespace: &str, batch: RecordBatch) -> Result<Table> {
	let schema = batch.schema();
	let rows = batch.num_rows();
	let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema.clone()));

	let existing = match handle.cached_table().await {
		Some(t) => Some(t),
		None => open_table_if_exists(conn, namespace).await?,
	};
	let table = match existing {
		Some(table) => {
			let current = table.schema().await.map_err(|e| Error::load(namespace, e))?;
			let (have, want) = (vector_dim(&current), vector_dim(&schema));
			if have != want {
				return Err(Error::persist(namespace, format!("vector dim mismatch: namespace stores {have:?}, embedder produced {want:?}")));
			}
			table.add(reader).execute().await.map_err(|e| Error::persist(namespace, e))?;
			tracing::debug!(namespace, rows, "appended to namespace");
			table
		}
		None => {
			let table = conn.create_table(namespace, reader).execute().await.map_err(|e| Error::persist(namespace, e))?;
			tracing::info!(namespace, rows, "created namespace");
			table
		}
	};
	handle.cache(table.clone()).await;
	Ok(table)
}
