//! Adapters behind the domain ports: in-memory storage and scripted
//! collaborators for the CLI and tests.

pub mod collaborators;
pub mod in_memory;
