pub mod auth;
pub mod record_store;
pub mod registry_service;
pub mod token_allocator;
