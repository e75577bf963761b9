//! Infrastructure Layer

pub mod app_store;
pub mod postgres;
