//! Retrieval coordinator: indexing orchestration and single or
//! multi-namespace queries with confidence aggregation.

pub mod aggregate;
pub mod coordinator;

pub use aggregate::aggregate;
pub use coordinator::RetrievalCoordinator;
