#![doc = include_str!("../README.md")]

pub mod api;
pub mod core;
pub mod error;
pub mod model;
pub mod prelude;
pub mod quantity;
pub mod store;
