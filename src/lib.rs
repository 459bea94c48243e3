// TinaBridge - Rust Implementation
// Pluggable document storage bridges for the Tina content layer

#![warn(rust_2018_idioms)]

pub mod backend;
pub mod bridge;
pub mod config;
pub mod connection;
pub mod database;
pub mod events;
pub mod metrics;
pub mod server;
pub mod store;

// Re-exports for convenience
pub use backend::Backend;
pub use bridge::{Bridge, BridgeKind, DocumentBridge};
pub use config::BridgeConfig;
pub use connection::{parse_url, ConnectionDescriptor};
pub use database::{Database, IndexStrategy};
pub use events::{CmsEvent, EventBus};
pub use store::{KeyValueStore, Store, StoreProfile};

/// TinaBridge error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Authentication failed: {0}")]
        Auth(String),

        #[error("Not found: {0}")]
        NotFound(String),

        #[error("Transport error: {0}")]
        Transport(String),

        #[error("Invalid connection string: {0}")]
        Format(String),

        #[error("Invalid argument: {0}")]
        InvalidArgument(String),

        #[error("Storage error: {0}")]
        Storage(String),

        #[error("Serialization error: {0}")]
        SerializationError(String),

        #[error("Configuration error: {0}")]
        Config(String),
    }

    impl Error {
        /// Credentials were rejected by the backend.
        pub fn is_auth(&self) -> bool {
            matches!(self, Error::Auth(_))
        }

        pub fn is_transport(&self) -> bool {
            matches!(self, Error::Transport(_))
        }
    }

    impl From<reqwest::Error> for Error {
        fn from(e: reqwest::Error) -> Self {
            Error::Transport(e.to_string())
        }
    }

    impl From<std::io::Error> for Error {
        fn from(e: std::io::Error) -> Self {
            Error::Storage(e.to_string())
        }
    }

    impl From<serde_json::Error> for Error {
        fn from(e: serde_json::Error) -> Self {
            Error::SerializationError(e.to_string())
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
