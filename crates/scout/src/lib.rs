//! A console research assistant that answers questions with the help of
//! web search.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to drive the same agent from your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
mod console;
mod error;
pub mod render;
mod session;
pub mod tools;

pub use config::Config;
pub use console::{Console, is_quit_command};
pub use error::Error;
pub use render::Renderer;
pub use session::{Session, SessionBuilder};

/// Re-exports of [`scout_core`] crate.
pub mod core {
    pub use scout_core::*;
}
