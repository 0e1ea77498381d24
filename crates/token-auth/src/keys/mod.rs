//! Public key resolution.
//!
//! # Components
//!
//! - `cache` - concurrent `endpoint:kid -> PEM` cache with per-key fetch guards
//! - `fetcher` - HTTP capability used to download key material
//! - `resolver` - static-key / cache / network resolution order

pub mod cache;
pub mod fetcher;
pub mod resolver;

pub use cache::{cache_key, KeyCache};
pub use fetcher::{KeyFetcher, KeyResponse, ReqwestKeyFetcher};
pub use resolver::KeyResolver;
