//! Library integration tests: whole invocations over private modulepath trees.

mod common;

mod collection_tests;
mod load_tests;
mod path_tests;
mod render_tests;
mod resolve_tests;
