#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod backend;

pub use backend::MokaStore;
