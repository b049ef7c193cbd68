//! Toolgate Client - usage entitlement gate
//!
//! Decides whether the current visitor (anonymous, free or pro) may invoke a
//! tool, tracks remaining quota, and records consumption against the
//! entitlement server or, for anonymous visitors, a local [`Store`].
//!
//! # Usage
//!
//! ```ignore
//! use toolgate_client::{EntitlementClient, GateConfig, MemoryStore};
//! use toolgate_types::Tool;
//!
//! let config = GateConfig::builder().endpoint("https://api.example.com").build()?;
//! let gate = EntitlementClient::connect(config, MemoryStore::new())?;
//!
//! if gate.check_access().await?.allowed {
//!     gate.record_usage(Tool::SqlConverter).await?;
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod metrics;
pub mod navigator;
pub mod retry;
pub mod store;
pub mod transport;

pub use cache::PlanCache;
pub use config::{ConfigError, Credential, GateConfig, GateConfigBuilder};
pub use error::{ErrorKind, GateError, GateReport, Result};
pub use gate::{EntitlementClient, Profile, Visitor};
pub use lifecycle::Lifecycle;
pub use navigator::{Navigator, NoopNavigator};
pub use retry::RetryConfig;
pub use store::{FileStore, MemoryStore, Store, StoreError};
pub use transport::{EntitlementApi, HttpEntitlementApi};
