//! Client-side domain state for the troupe dance, fitness and heritage platform.
//!
//! Each store mirrors part of the backend (courses, health, social feed, the
//! signed-in session), runs its network calls through a shared loading/error
//! lifecycle, and only touches its cache once a call has succeeded.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod stores;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
