pub mod forest;
pub mod schema;
pub mod task;
