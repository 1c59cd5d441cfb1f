//! `destinasi` - A tourism destination catalog service
//!
//! This library provides the storage, validation, authorization and
//! geolocation ranking behind a public destination catalog, together with
//! the admin API that curates it and the image CDN integration that serves
//! its photos.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod geo;
pub mod listing;
pub mod logging;
pub mod media;
pub mod models;
pub mod policy;
pub mod seed;
pub mod server;
pub mod storage;
pub mod validation;

pub use config::Config;
pub use error::{Error, Result};
pub use geo::Coordinates;
pub use logging::init_logging;
pub use storage::{Storage, StorageStats};
