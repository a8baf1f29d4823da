// src/core/mod.rs

pub mod arg_parser;
pub mod config;
pub mod engine;
pub mod invocation;
pub mod loader;
pub mod namespace;
pub mod paths;
pub mod registry;
pub mod steps;
pub mod store;
pub mod templater;
