//! Application layer: sorter wiring and the thread-safe sorting service.

pub mod builder;
pub mod service;

pub use builder::SorterBuilder;
pub use service::SortingService;
