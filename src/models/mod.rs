//! Core data models for the file link registry.
//!
//! `file_record` maps to the `hosted_files` table via `sqlx::FromRow`;
//! `bot` carries the messages exchanged with the messaging transport.
//! Both serialize as JSON via `serde`.

pub mod bot;
pub mod file_record;
