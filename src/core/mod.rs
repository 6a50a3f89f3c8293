//! Credential core: configuration, authentication and storage

pub mod auth;
pub mod config;
pub mod db;
