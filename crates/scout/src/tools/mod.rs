//! Built-in tools that models can use.

mod search;

pub use search::{SearchTool, SearchToolParameters};
