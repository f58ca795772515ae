//! Memory store implementations for agentloom.
//!
//! A memory store is an append-only corpus derived from finalized
//! sessions, searchable by free-text query. In-memory only here; durable
//! backends live behind the same `MemoryService` trait.

mod in_memory;

pub use in_memory::InMemoryMemoryService;
