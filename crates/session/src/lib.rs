//! Session store implementations for agentloom.
//!
//! Currently in-memory only; a durable backend is an external
//! collaborator reachable through the same `SessionService` trait.

mod in_memory;

pub use in_memory::InMemorySessionService;
