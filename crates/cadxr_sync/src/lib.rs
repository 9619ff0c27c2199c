//! Realtime database client for shared cadxr assembly state.
//!
//! XR clients and CAD sessions coordinate through a Firebase-style realtime
//! database: generic JSON reads and writes over the REST surface, plus
//! helpers for the two well-known nodes:
//!
//! - `Built Keys`: the set of scene node keys already assembled on site
//! - `Users`: connected users and their attributes
//!
//! # Example
//!
//! ```ignore
//! use cadxr_sync::{RealtimeDatabase, SyncConfig};
//!
//! let config = SyncConfig::from_file("firebase_config.json")?;
//! let db = RealtimeDatabase::new(&config);
//! db.add_built_key("beam_07").await?;
//! let built = db.built_keys().await?;
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::RealtimeDatabase;
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
