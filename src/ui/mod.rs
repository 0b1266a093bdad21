//! ui
//!
//! User-facing output.
//!
//! All command output goes through [`output`] so quiet mode is honored in
//! one place. Diagnostics go through `tracing` instead.

pub mod output;
