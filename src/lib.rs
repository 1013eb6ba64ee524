//! Shelfwise: hybrid product recommendations for B2B retail catalogs.
//!
//! Content similarity (TF-IDF over product text) and co-purchase similarity
//! (item cosine over buyer histories) are built lazily, cached with a TTL and
//! blended per request. Every entry point degrades to popularity or an empty
//! list instead of failing.

pub mod assemble;
pub mod cache;
pub mod config;
pub mod content;
pub mod copurchase;
pub mod engine;
pub mod error;
pub mod index;
pub mod model;
pub mod outcome;
pub mod rank;
pub mod score;
pub mod sparse;
pub mod store;
pub mod text;

pub use cache::ArtifactCache;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, StoreError};
pub use model::{BuyerId, Dataset, Product, ProductId, PurchaseAggregate, PurchaseEvent};
pub use outcome::Outcome;
pub use rank::Ranker;
pub use store::{InteractionStore, MemoryStore};
