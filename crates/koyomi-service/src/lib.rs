pub mod cache;
pub mod calendar;
pub mod error;
