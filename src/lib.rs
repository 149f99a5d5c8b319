//! MacroLog Library
//!
//! Calorie and macro logging: the nutrition engine, food sources, storage and
//! the MCP tools built on them.

pub mod build_info;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod sources;
pub mod sync;
pub mod tools;
