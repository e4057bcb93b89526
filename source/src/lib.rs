pub mod client;
pub mod config;
pub mod error;
pub mod filename;
pub mod traits;

pub use client::SourceClient;
pub use config::SourceConfig;
pub use error::SourceError;
pub use traits::Source;
