//! HTTP handlers for collection CRUD.

pub mod entity;
pub use entity::*;
