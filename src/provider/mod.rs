#[cfg(test)]
pub mod fake;
pub mod spotify;
mod traits;
mod types;

pub use spotify::SpotifyProvider;
pub use traits::Provider;
pub use types::*;
