//! A provider-neutral protocol for talking to chat models.
//!
//! The agent runtime only sees the types in this crate, so any backend
//! that can stream an assistant message and tool call requests can be
//! plugged in without touching the runtime.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
