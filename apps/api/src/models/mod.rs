pub mod cv;
pub mod query;
