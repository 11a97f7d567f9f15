// Core infrastructure modules
pub mod config;
pub mod core;

// Feature-specific modules
pub mod query_builder;
pub mod repl;
pub mod results_grid;
pub mod storage;

#[cfg(test)]
mod test_utils;
