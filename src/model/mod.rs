pub mod config;
pub mod forest;
pub mod task;

pub use config::*;
pub use forest::*;
pub use task::*;
