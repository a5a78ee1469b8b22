pub mod config;
pub mod directory;

pub use config::StoreConfig;
pub use directory::DirectoryStore;
