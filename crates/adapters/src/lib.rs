//! crosspost adapters crate
//!
//! Infrastructure implementing the domain ports:
//! - `instagram`, `facebook`, `linkedin`, `tiktok`: HTTP platform adapters
//! - `factory`: constructs adapters from credentials
//! - `credentials`: in-memory credentials store
//! - `jobs`: SQLite and in-memory job stores
//! - `outbox`: file-backed adapter for the approval/dry-run workflow
//! - `stub`: scriptable adapter for tests

mod credentials_memory;
mod http;
mod jobs_memory;
mod jobs_sqlite;

pub mod facebook;
pub mod factory;
pub mod instagram;
pub mod linkedin;
pub mod outbox;
pub mod stub;
pub mod tiktok;

pub use facebook::FacebookAdapter;
pub use factory::HttpAdapterFactory;
pub use instagram::InstagramAdapter;
pub use linkedin::LinkedInAdapter;
pub use outbox::{OutboxAdapter, OutboxWriter};
pub use stub::StubAdapter;
pub use tiktok::TikTokAdapter;

/// Re-exports for credential store adapters
pub mod credentials {
    pub use crate::credentials_memory::InMemoryCredentialsStore;
}

/// Re-exports for job store adapters
pub mod jobs {
    pub use crate::jobs_memory::InMemoryJobStore;
    pub use crate::jobs_sqlite::SqliteJobStore;
}
