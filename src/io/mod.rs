pub mod config_io;
pub mod export;
pub mod lock;
pub mod recovery;
pub mod store;
