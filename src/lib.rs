//! Usergate - credential and session lifecycle service
//!
//! Account login with signed session tokens, logout by revocation, a session
//! gate for protected calls, login throttling and password reset tickets.

pub mod core;
