pub mod catalog;
pub mod compute;
pub mod snapshot;
