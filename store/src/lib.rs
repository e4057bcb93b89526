pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod memory;
pub mod traits;

pub use client::ObjectStore;
pub use config::StoreConfig;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::Store;
