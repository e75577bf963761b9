//! Application Layer - Use Cases

pub mod config;
pub mod list_library;
pub mod verify_and_grant;
