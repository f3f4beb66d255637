use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const ID: &str = "id";
pub const NAMESPACE: &str = "namespace";
pub const CONTENT: &str = "content";
pub const METADATA: &str = "metadata";
pub const CHUNK_INDEX: &str = "chunk_index";
pub const TOTAL_CHUNKS: &str = "total_chunks";
pub const INDEXED_AT: &str = "indexed_at";
pub const VECTOR: &str = "vector";
pub const DISTANCE: &str = "_distance";

/// Columns returned by searches; the vector itself is left behind.
pub const RESULT_COLUMNS: &[&str] = &[ID, NAMESPACE, CONTENT, METADATA, CHUNK_INDEX, TOTAL_CHUNKS];

/// One table per namespace. `metadata` holds the chunk's metadata map as JSON.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(ID, DataType::Utf8, false),
		Field::new(NAMESPACE, DataType::Utf8, false),
		Field::new(CONTENT, DataType::Utf8, false),
		Field::new(METADATA, DataType::Utf8, false),
		Field::new(CHUNK_INDEX, DataType::Int32, false),
		Field::new(TOTAL_CHUNKS, DataType::Int32, false),
		Field::new(INDEXED_AT, DataType::Timestamp(TimeUnit::Millisecond, None), false),
		Field::new(VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

/// Vector width recorded in an existing table's schema.
pub fn vector_dim(schema: &Schema) -> Option<i32> {
	match schema.field_with_name(VECTOR).ok()?.data_type() {
		DataType::FixedSizeList(_, n) => Some(*n),
		_ => None,
	}
}
