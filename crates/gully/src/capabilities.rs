pub mod catalog;
pub mod dispatch;
pub mod postgres;
pub mod store;

pub use catalog::Capability;
pub use dispatch::dispatch;
pub use store::{Column, StatsStore};
