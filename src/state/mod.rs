pub mod config;
pub mod credentials;
pub mod journal;

pub use config::Config;
pub use journal::RunEntry;
