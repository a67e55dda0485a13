pub mod controller;

pub use controller::{LoadOutcome, LoadStatus, PaginationController, SkipReason, LOAD_ERROR_MESSAGE};
