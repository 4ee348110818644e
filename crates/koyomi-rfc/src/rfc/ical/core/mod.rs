//! iCalendar core models (RFC 5545).
//!
//! These types describe an already-tokenized calendar document: a tree of
//! components carrying typed properties. Unknown properties and values are
//! preserved so that consumers can decide how strict to be.

mod component;
mod datetime;
mod duration;
mod parameter;
mod property;
mod value;

pub use component::{Component, ComponentKind, ICalendar};
pub use datetime::{DateTime, DateTimeForm, Time};
pub use duration::Duration;
pub use parameter::Parameter;
pub use property::{ContentLine, Property, names};
pub use value::{Date, Value};
