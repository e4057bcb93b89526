pub mod client;
pub mod error;
pub mod options;
pub mod output;
pub mod path;

pub use client::{CompletedRun, ConverterRunner, NoCredentials, RegistryCredentials, Runner};
pub use error::RunnerError;
pub use options::{CompileOptions, DvipsPassthrough};
pub use path::translate_to_host_path;
