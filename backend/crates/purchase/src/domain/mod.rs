//! Domain Layer - Purchase business logic

pub mod entities;
pub mod repository;
pub mod services;
pub mod value_objects;
pub mod verifier;
