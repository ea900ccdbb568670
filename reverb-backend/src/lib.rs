#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod error;
mod store;
mod value;

pub use error::{DeleteStatus, StoreError};
pub use store::{Store, StoreResult};
pub use value::{Raw, StoreValue};
