//! envmod-lib: the environment-state engine behind `envmod`
//!
//! The crate turns modulefiles into shell code:
//! - `sandbox`: evaluates Lua modulefiles with a fixed primitive vocabulary
//! - `resolve` / `locate`: map module names to script files through aliases,
//!   symbolic versions and defaults
//! - `pathlist`: reference-counted edits of path-like variables
//! - `session`: the per-invocation state, its settings stack and diagnostics
//! - `collection`: saved sets of search paths and modules
//! - `render`: the net change as code for one of many shells
//! - `command`: the commands tying it all together

pub mod collection;
pub mod command;
pub mod config;
pub mod consts;
pub mod engine;
pub mod ident;
pub mod loaded;
pub mod locate;
pub mod pathlist;
pub mod platform;
pub mod render;
pub mod resolve;
pub mod sandbox;
pub mod session;

pub use command::{Command, CommandError, Outcome};
pub use config::DisplayOptions;
pub use engine::{Engine, EngineError, Finished};
pub use render::Shell;
pub use session::{EnvMap, Session};
