//! Shared library for the AMR resource catalog services
//!
//! Holds the pieces every binary needs: the common error type, TOML
//! configuration loading, the controlled-vocabulary taxonomy store, and the
//! catalog domain models.

pub mod config;
pub mod error;
pub mod models;
pub mod taxonomy;

pub use error::{Error, Result};
