//! core
//!
//! Core domain types and configuration for multidc.
//!
//! # Modules
//!
//! - [`types`] - Strong types: DatacenterName, RepositoryKind, EntryKey, ...
//! - [`auth`] - The acting user and its admin flag
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid names from reaching a replica
//! - Schemas are strict and reject unknown fields

pub mod auth;
pub mod config;
pub mod types;
