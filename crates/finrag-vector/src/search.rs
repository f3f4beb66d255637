use arrow_array::{Array, Float32Array, Int32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};

use finrag_core::{Chunk, Error, Metadata, Result};

use crate::schema::{CHUNK_INDEX, CONTENT, DISTANCE, ID, METADATA, NAMESPACE, RESULT_COLUMNS, TOTAL_CHUNKS};

/// Exact L2 search over one namespace table, ascending by distance.
pub(crate) async fn nearest(table: &Table, namespace: &str, query_vec: Vec<f32>, k: usize) -> Result<Vec<(Chunk, f32)>> {
	let mut stream = table
		.vector_search(query_vec)
		.map_err(|e| Error::load(namespace, e))?
		.distance_type(DistanceType::L2)
		.select(Select::columns(RESULT_COLUMNS))
		.limit(k)
		.execute()
		.await
		.map_err(|e| Error::load(namespace, e))?;

	let mut hits = Vec::new();
	while let Some(batch) = stream.try_next().await.map_err(|e| Error::load(namespace, e))? {
		decode_batch(&batch, namespace, &mut hits)?;
	}
	hits.sort_by(|a, b| a.1.total_cmp(&b.1));
	hits.truncate(k);
	Ok(hits)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str, namespace: &str) -> Result<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| Error::load(namespace, format!("column '{name}' missing or mistyped")))
}

fn decode_batch(batch: &RecordBatch, namespace: &str, out: &mut Vec<(Chunk, f32)>) -> Result<()> {
	let ids = column::<StringArray>(batch, ID, namespace)?;
	let namespaces = column::<StringArray>(batch, NAMESPACE, namespace)?;
	let contents = column::<StringArray>(batch, CONTENT, namespace)?;
	let metadata = column::<StringArray>(batch, METADATA, namespace)?;
	let chunk_indices = column::<Int32Array>(batch, CHUNK_INDEX, namespace)?;
	let total_chunks = column::<Int32Array>(batch, TOTAL_CHUNKS, namespace)?;
	let distances = column::<Float32Array>(batch, DISTANCE, namespace)?;
	for i in 0..batch.num_rows() {
		if distances.is_null(i) {
			continue;
		}
		let meta: Metadata = serde_json::from_str(metadata.value(i)).map_err(|e| Error::load(namespace, format!("corrupt metadata: {e}")))?;
		let chunk = Chunk {
			id: ids.value(i).to_string(),
			namespace: namespaces.value(i).to_string(),
			content: contents.value(i).to_string(),
			metadata: meta,
			chunk_index: chunk_indices.value(i).max(0) as usize,
			total_chunks: total_chunks.value(i).max(0) as usize,
		};
		// L2 distances are non-negative; clamp float noise on exact matches.
		out.push((chunk, distances.value(i).max(0.0)));
	}
	Ok(())
}
