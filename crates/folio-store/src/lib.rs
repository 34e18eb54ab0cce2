//! Folio Store - collaborator implementations
//!
//! Backends for the traits declared in `folio-core`:
//! - `PgStore`: PostgreSQL repositories over sqlx
//! - `MemoryStore`: process-local repositories for development and tests
//! - `MemoryCache`: moka-backed key-value cache with per-entry TTL
//! - `LogMailer` / `MemoryMailer`: mail notifiers that log or record

pub mod cache;
pub mod mailer;
pub mod memory;
pub mod postgres;

pub use cache::{CacheStats, MemoryCache};
pub use mailer::{LogMailer, MemoryMailer, SentMail};
pub use memory::MemoryStore;
pub use postgres::PgStore;
