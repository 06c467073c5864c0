//! Route handlers

pub mod captures;
pub mod health;
pub mod ingest;
pub mod store;
