//! Well-known names shared across the engine.

/// Application name, used for configuration directories.
pub const APP_NAME: &str = "envmod";

/// First-line marker every configuration script must carry.
pub const MAGIC_MARKER: &str = "#%Module";

/// Module search path list.
pub const MODULEPATH: &str = "MODULEPATH";

/// Loaded module names, kept in lock-step with [`LMFILES`].
pub const LOADEDMODULES: &str = "LOADEDMODULES";

/// Script paths of the loaded modules.
pub const LMFILES: &str = "_LMFILES_";

/// Alternative names answered by each loaded module.
pub const LMALTNAME: &str = "__MODULES_LMALTNAME";

/// Prefix of the reference-count shadow variables.
pub const SHARE_PREFIX: &str = "__MODULES_SHARE_";

/// Names to hide from subprocess environments.
pub const RUN_QUARANTINE: &str = "MODULES_RUN_QUARANTINE";

/// Pager command override.
pub const MODULES_PAGER: &str = "MODULES_PAGER";

/// Collection target qualifier.
pub const COLLECTION_TARGET: &str = "MODULES_COLLECTION_TARGET";

/// Collection directory override.
pub const COLLECTION_DIR: &str = "MODULES_COLLECTION_DIR";

/// Default pager command.
pub const DEFAULT_PAGER: &str = "less -eFKRX";

/// Delimiter used by the engine's own list variables.
pub const LIST_DELIM: &str = ":";

/// Separator between a loaded module and its alternative names.
pub const ALTNAME_SEP: char = '&';

/// Rc file evaluated in every modulepath directory and module directory.
pub const MODULERC: &str = ".modulerc";

/// Default-version file of a module directory.
pub const VERSION_FILE: &str = ".version";

/// Reserved symbolic version naming a directory's default element.
pub const DEFAULT_SYMBOL: &str = "default";

/// Maximum statement length accepted by csh-family shells.
pub const CSH_LIMIT: usize = 4000;
