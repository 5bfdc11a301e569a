pub mod error;
pub mod models;
pub mod sources;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::{LinguisticAnalysis, LinguisticModel, SentimentModel};
pub use sources::{ArticleSource, FeedSource};
pub use storage::SignalStorage;
pub use types::*;

pub mod prelude {
    pub use super::{Article, Error, EventSet, Result, Signal, SignalStorage};
}
