//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on protocol translation and auth plumbing.
//! `structure` holds the ordering rules and talks to storage only through
//! the `store::StructureStore` trait; `course` and `session` query the
//! pool directly.

pub mod access;
pub mod course;
#[cfg(test)]
pub mod memory_store;
pub mod session;
pub mod store;
pub mod structure;
