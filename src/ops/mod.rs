pub mod search;
pub mod stats;
pub mod task_ops;
pub mod traversal;
