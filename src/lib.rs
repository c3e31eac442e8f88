pub use crate::diagnostics::{ErrorContext, ErrorType, ForgeError, Span};

pub mod cli;
pub mod compiler;
pub mod diagnostics;
pub mod document;
pub mod engine;
pub mod entity;
pub mod filters;
pub mod fixtures;
pub mod plugins;
pub mod resolver;
pub mod vfs;
