//! CLI integration tests over isolated module trees.

mod common;

mod collection_tests;
mod module_tests;
