mod config;
mod error;
mod store;

pub use config::HttpStoreConfig;
pub use error::HttpDaoError;
pub use store::HttpGameStore;
