//! Command dispatcher.
//!
//! A [`Command`] is parsed from the words following the shell identifier, or
//! from the arguments of a nested `module()` call, and [`execute`] routes it to
//! the component doing the work. Every command ends in an [`Outcome`]: a
//! boolean status or a text value for the caller.

mod collections;
mod initfiles;
mod listing;
mod modules;
mod queries;

use thiserror::Error;
use tracing::debug;

pub use initfiles::{InitAction, InitFileError};

use crate::config::DisplayOptions;
use crate::engine::{Ctx, EngineError};
use crate::pathlist::Position;

/// Which edit a path command performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEdit {
  Prepend,
  Append,
  Remove,
}

/// Arguments of `prepend-path`, `append-path` and `remove-path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCommand {
  pub edit: PathEdit,
  pub variable: String,
  pub values: Vec<String>,
  pub delimiter: String,
  pub duplicates: bool,
  pub index: bool,
  pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Load(Vec<String>),
  Unload(Vec<String>),
  Reload,
  Switch { old: Option<String>, new: String },
  Use { paths: Vec<String>, position: Position },
  Unuse { paths: Vec<String>, force: bool },
  Source(Vec<String>),
  Display(Vec<String>),
  Avail(Vec<String>),
  Aliases,
  List,
  Whatis(Vec<String>),
  Search(String),
  Purge,
  Save(Option<String>),
  Restore(Option<String>),
  Saverm(Option<String>),
  Saveshow(Option<String>),
  Savelist,
  Init { action: InitAction, modules: Vec<String> },
  Autoinit,
  Help(Vec<String>),
  Test(Vec<String>),
  Path(PathCommand),
  IsLoaded(Vec<String>),
  IsSaved(Vec<String>),
  IsUsed(Vec<String>),
  IsAvail(Vec<String>),
  InfoLoaded(String),
  LocatePath(String),
  Paths(Vec<String>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
  #[error("Invalid command '{0}'")]
  Unknown(String),

  #[error("Unexpected number of args for '{0}' command")]
  Arguments(String),

  #[error("Invalid option '{option}' for '{command}' command")]
  Option { command: String, option: String },
}

/// What a command hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Status(bool),
  Text(String),
}

impl Outcome {
  pub fn is_success(&self) -> bool {
    match self {
      Outcome::Status(ok) => *ok,
      Outcome::Text(_) => true,
    }
  }
}

/// Listing flags accepted anywhere among a command's arguments.
const DISPLAY_FLAGS: &[&str] = &[
  "-t", "--terse", "-l", "--long", "-d", "--default", "-L", "--latest", "-j", "--json",
];

/// Verbs whose arguments may carry listing flags.
const LISTING_VERBS: &[&str] = &[
  "avail", "list", "aliases", "savelist", "whatis", "search", "apropos", "keyword", "paths",
];

/// Listing flags among the arguments of `verb`; other verbs keep their own meaning for them.
pub fn display_flags(verb: &str, args: &[String]) -> DisplayOptions {
  let mut display = DisplayOptions::default();
  if !LISTING_VERBS.contains(&verb) {
    return display;
  }
  for arg in args {
    match arg.as_str() {
      "-t" | "--terse" => display.terse = true,
      "-l" | "--long" => display.long = true,
      "-d" | "--default" => display.default_only = true,
      "-L" | "--latest" => display.latest_only = true,
      "-j" | "--json" => display.json = true,
      _ => {}
    }
  }
  display
}

impl Command {
  /// Parse a verb and its arguments.
  pub fn from_words(verb: &str, args: &[String]) -> Result<Self, CommandError> {
    let words: Vec<String> = if LISTING_VERBS.contains(&verb) {
      args
        .iter()
        .filter(|a| !DISPLAY_FLAGS.contains(&a.as_str()))
        .cloned()
        .collect()
    } else {
      args.to_vec()
    };
    let arity = |ok: bool| {
      if ok {
        Ok(())
      } else {
        Err(CommandError::Arguments(verb.to_string()))
      }
    };

    let command = match verb {
      "load" | "add" => {
        arity(!words.is_empty())?;
        Command::Load(words)
      }
      "unload" | "rm" | "remove" | "del" => {
        arity(!words.is_empty())?;
        Command::Unload(words)
      }
      "reload" | "refresh" => Command::Reload,
      "switch" | "swap" => match words.as_slice() {
        [new] => Command::Switch {
          old: None,
          new: new.clone(),
        },
        [old, new] => Command::Switch {
          old: Some(old.clone()),
          new: new.clone(),
        },
        _ => return Err(CommandError::Arguments(verb.to_string())),
      },
      "use" => {
        let mut position = Position::Prepend;
        let mut paths = Vec::new();
        for word in words {
          match word.as_str() {
            "-a" | "--append" | "-append" => position = Position::Append,
            "-p" | "--prepend" | "-prepend" => position = Position::Prepend,
            flag if flag.starts_with('-') => return Err(invalid_option(verb, flag)),
            _ => paths.push(word.clone()),
          }
        }
        arity(!paths.is_empty())?;
        Command::Use { paths, position }
      }
      "unuse" => {
        let force = words.iter().any(|w| w == "-f" || w == "--force");
        let paths: Vec<String> = words.into_iter().filter(|w| !w.starts_with('-')).collect();
        arity(!paths.is_empty())?;
        Command::Unuse { paths, force }
      }
      "source" => {
        arity(!words.is_empty())?;
        Command::Source(words)
      }
      "display" | "show" => {
        arity(!words.is_empty())?;
        Command::Display(words)
      }
      "avail" => Command::Avail(words),
      "aliases" => Command::Aliases,
      "list" => Command::List,
      "whatis" => Command::Whatis(words),
      "search" | "apropos" | "keyword" => match words.as_slice() {
        [keyword] => Command::Search(keyword.clone()),
        _ => return Err(CommandError::Arguments(verb.to_string())),
      },
      "purge" => Command::Purge,
      "save" | "restore" | "saverm" | "saveshow" => {
        arity(words.len() <= 1)?;
        let name = words.into_iter().next();
        match verb {
          "save" => Command::Save(name),
          "restore" => Command::Restore(name),
          "saverm" => Command::Saverm(name),
          _ => Command::Saveshow(name),
        }
      }
      "savelist" => Command::Savelist,
      "initadd" | "initprepend" | "initrm" | "initswitch" | "initlist" | "initclear" => {
        let action = match verb {
          "initadd" => InitAction::Add,
          "initprepend" => InitAction::Prepend,
          "initrm" => InitAction::Remove,
          "initswitch" => InitAction::Switch,
          "initlist" => InitAction::List,
          _ => InitAction::Clear,
        };
        let ok = match action {
          InitAction::Switch => words.len() == 2,
          InitAction::List | InitAction::Clear => words.is_empty(),
          _ => !words.is_empty(),
        };
        arity(ok)?;
        Command::Init { action, modules: words }
      }
      "autoinit" => Command::Autoinit,
      "help" => Command::Help(words),
      "test" => {
        arity(!words.is_empty())?;
        Command::Test(words)
      }
      "prepend-path" | "append-path" | "remove-path" => Command::Path(parse_path_command(verb, &words)?),
      "is-loaded" => Command::IsLoaded(words),
      "is-saved" => Command::IsSaved(words),
      "is-used" => Command::IsUsed(words),
      "is-avail" => {
        arity(!words.is_empty())?;
        Command::IsAvail(words)
      }
      "info-loaded" => match words.as_slice() {
        [name] => Command::InfoLoaded(name.clone()),
        _ => return Err(CommandError::Arguments(verb.to_string())),
      },
      "path" => match words.as_slice() {
        [name] => Command::LocatePath(name.clone()),
        _ => return Err(CommandError::Arguments(verb.to_string())),
      },
      "paths" => {
        arity(!words.is_empty())?;
        Command::Paths(words)
      }
      other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
  }

  /// Canonical verb.
  pub fn name(&self) -> &'static str {
    match self {
      Command::Load(_) => "load",
      Command::Unload(_) => "unload",
      Command::Reload => "reload",
      Command::Switch { .. } => "switch",
      Command::Use { .. } => "use",
      Command::Unuse { .. } => "unuse",
      Command::Source(_) => "source",
      Command::Display(_) => "display",
      Command::Avail(_) => "avail",
      Command::Aliases => "aliases",
      Command::List => "list",
      Command::Whatis(_) => "whatis",
      Command::Search(_) => "search",
      Command::Purge => "purge",
      Command::Save(_) => "save",
      Command::Restore(_) => "restore",
      Command::Saverm(_) => "saverm",
      Command::Saveshow(_) => "saveshow",
      Command::Savelist => "savelist",
      Command::Init { action, .. } => action.verb(),
      Command::Autoinit => "autoinit",
      Command::Help(_) => "help",
      Command::Test(_) => "test",
      Command::Path(p) => match p.edit {
        PathEdit::Prepend => "prepend-path",
        PathEdit::Append => "append-path",
        PathEdit::Remove => "remove-path",
      },
      Command::IsLoaded(_) => "is-loaded",
      Command::IsSaved(_) => "is-saved",
      Command::IsUsed(_) => "is-used",
      Command::IsAvail(_) => "is-avail",
      Command::InfoLoaded(_) => "info-loaded",
      Command::LocatePath(_) => "path",
      Command::Paths(_) => "paths",
    }
  }
}

fn invalid_option(command: &str, option: &str) -> CommandError {
  CommandError::Option {
    command: command.to_string(),
    option: option.to_string(),
  }
}

fn parse_path_command(verb: &str, words: &[String]) -> Result<PathCommand, CommandError> {
  let edit = match verb {
    "prepend-path" => PathEdit::Prepend,
    "append-path" => PathEdit::Append,
    _ => PathEdit::Remove,
  };
  let mut command = PathCommand {
    edit,
    variable: String::new(),
    values: Vec::new(),
    delimiter: crate::consts::LIST_DELIM.to_string(),
    duplicates: false,
    index: false,
    force: false,
  };

  let mut positional = Vec::new();
  let mut iter = words.iter();
  while let Some(word) = iter.next() {
    match word.as_str() {
      "-d" | "--delim" => {
        command.delimiter = iter.next().cloned().ok_or_else(|| invalid_option(verb, word))?;
      }
      "--duplicates" if edit != PathEdit::Remove => command.duplicates = true,
      "--index" if edit == PathEdit::Remove => command.index = true,
      "-f" | "--force" if edit == PathEdit::Remove => command.force = true,
      flag if flag.starts_with("--delim=") => command.delimiter = flag.trim_start_matches("--delim=").to_string(),
      flag if flag.starts_with('-') && flag.len() > 1 => return Err(invalid_option(verb, flag)),
      _ => positional.push(word.clone()),
    }
  }

  let mut positional = positional.into_iter();
  command.variable = positional.next().ok_or_else(|| CommandError::Arguments(verb.to_string()))?;
  command.values = positional.collect();
  if command.values.is_empty() {
    return Err(CommandError::Arguments(verb.to_string()));
  }
  Ok(command)
}

/// Run `command` against the session.
pub fn execute(ctx: Ctx<'_>, command: &Command) -> Result<Outcome, EngineError> {
  debug!(command = command.name(), "dispatch");
  match command {
    Command::Load(specs) => modules::load(ctx, specs),
    Command::Unload(specs) => modules::unload(ctx, specs),
    Command::Reload => modules::reload(ctx),
    Command::Switch { old, new } => modules::switch(ctx, old.as_deref(), new),
    Command::Use { paths, position } => modules::use_paths(ctx, paths, *position),
    Command::Unuse { paths, force } => modules::unuse_paths(ctx, paths, *force),
    Command::Source(files) => modules::source(ctx, files),
    Command::Purge => modules::purge(ctx),
    Command::Path(path) => modules::edit_path(ctx, path),
    Command::Display(specs) => listing::display(ctx, specs),
    Command::Avail(patterns) => listing::avail(ctx, patterns),
    Command::Aliases => listing::aliases(ctx),
    Command::List => listing::list(ctx),
    Command::Whatis(patterns) => listing::whatis(ctx, patterns),
    Command::Search(keyword) => listing::search(ctx, keyword),
    Command::Help(specs) => listing::help(ctx, specs),
    Command::Test(specs) => listing::test(ctx, specs),
    Command::Save(name) => collections::save(ctx, name.as_deref()),
    Command::Restore(name) => collections::restore(ctx, name.as_deref()),
    Command::Saverm(name) => collections::saverm(ctx, name.as_deref()),
    Command::Saveshow(name) => collections::saveshow(ctx, name.as_deref()),
    Command::Savelist => collections::savelist(ctx),
    Command::Init { action, modules } => initfiles::edit(ctx, *action, modules),
    Command::Autoinit => initfiles::autoinit(ctx),
    Command::IsLoaded(names) => queries::is_loaded(ctx, names),
    Command::IsSaved(names) => queries::is_saved(ctx, names),
    Command::IsUsed(dirs) => queries::is_used(ctx, dirs),
    Command::IsAvail(names) => queries::is_avail(ctx, names),
    Command::InfoLoaded(name) => queries::info_loaded(ctx, name),
    Command::LocatePath(name) => queries::path(ctx, name),
    Command::Paths(patterns) => queries::paths(ctx, patterns),
  }
}
