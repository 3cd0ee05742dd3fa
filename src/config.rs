//! Loading `devtabs.toml` into an [`AppContext`].
//!
//! The primary file is always trusted. Files pulled in through `include` may
//! only declare commands, and those commands run only when the include path
//! matches one of the primary file's `allow` globs. Anything else is kept as
//! a disabled session so the user can see why it does not run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;

use crate::format::FormatterKind;
use crate::theme::{Theme, ThemeRegistry};

pub const DEFAULT_CONFIG_FILE: &str = "devtabs.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid `allow` glob `{pattern}`: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("command `{name}` is declared in both {} and {}", first.display(), second.display())]
    DuplicateCommand {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("command `{name}` in {} has an empty `run`", path.display())]
    EmptyCommand { name: String, path: PathBuf },
    #[error("no commands configured in {}", path.display())]
    NoCommands { path: PathBuf },
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    theme: Option<String>,
    #[serde(default)]
    root: Option<PathBuf>,
    #[serde(default)]
    allow: Vec<String>,
    #[serde(default)]
    include: Vec<PathBuf>,
    #[serde(default)]
    commands: IndexMap<String, CommandEntry>,
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct IncludedFile {
    #[serde(default)]
    commands: IndexMap<String, CommandEntry>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum CommandEntry {
    Run(String),
    Table(CommandTable),
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandTable {
    run: String,
    #[serde(default)]
    format: FormatterKind,
    #[serde(default)]
    lazy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTrust {
    Trusted,
    /// Declared by an include that no `allow` glob matches.
    Untrusted { source: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    pub name: String,
    pub run: String,
    pub format: FormatterKind,
    pub autostart: bool,
    pub trust: CommandTrust,
    pub source: PathBuf,
}

impl CommandDefinition {
    fn from_entry(name: String, entry: CommandEntry, source: &Path, trust: CommandTrust) -> Self {
        let (run, format, lazy) = match entry {
            CommandEntry::Run(run) => (run, FormatterKind::default(), false),
            CommandEntry::Table(table) => (table.run, table.format, table.lazy),
        };
        Self {
            name,
            run,
            format,
            autostart: !lazy,
            trust,
            source: source.to_path_buf(),
        }
    }

    pub fn is_trusted(&self) -> bool {
        self.trust == CommandTrust::Trusted
    }
}

/// Everything the dashboard needs, resolved once at startup.
pub struct AppContext {
    pub config_path: PathBuf,
    pub root: PathBuf,
    pub theme_name: String,
    pub theme: Arc<dyn Theme>,
    pub commands: Vec<CommandDefinition>,
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&source).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn build_allowlist(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ConfigError::Glob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ConfigError::Glob {
        pattern: patterns.join(", "),
        source,
    })
}

fn config_dir(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::canonicalize(&parent).unwrap_or(parent)
}

fn push_command(
    commands: &mut Vec<CommandDefinition>,
    definition: CommandDefinition,
) -> Result<(), ConfigError> {
    if definition.run.trim().is_empty() {
        return Err(ConfigError::EmptyCommand {
            name: definition.name,
            path: definition.source,
        });
    }
    if let Some(existing) = commands
        .iter()
        .find(|command| command.name == definition.name)
    {
        return Err(ConfigError::DuplicateCommand {
            name: definition.name,
            first: existing.source.clone(),
            second: definition.source,
        });
    }
    commands.push(definition);
    Ok(())
}

/// Reads `path` and its includes. `theme_override` wins over the file's
/// `theme` key; unknown theme names fall back to the default theme.
pub fn load(
    path: &Path,
    theme_override: Option<&str>,
    registry: &ThemeRegistry,
) -> Result<AppContext, ConfigError> {
    let file: ConfigFile = read_toml(path)?;
    let dir = config_dir(path);
    let allowlist = build_allowlist(&file.allow)?;

    let mut commands = Vec::new();
    for (name, entry) in file.commands {
        let definition = CommandDefinition::from_entry(name, entry, path, CommandTrust::Trusted);
        push_command(&mut commands, definition)?;
    }

    for include in &file.include {
        let include_path = dir.join(include);
        let included: IncludedFile = read_toml(&include_path)?;
        let trust = if allowlist.is_match(include) {
            CommandTrust::Trusted
        } else {
            tracing::warn!(source = %include.display(), "include is not on the allowlist, disabling its commands");
            CommandTrust::Untrusted {
                source: include.display().to_string(),
            }
        };
        for (name, entry) in included.commands {
            let definition =
                CommandDefinition::from_entry(name, entry, &include_path, trust.clone());
            push_command(&mut commands, definition)?;
        }
    }

    if commands.is_empty() {
        return Err(ConfigError::NoCommands {
            path: path.to_path_buf(),
        });
    }

    let root = match file.root {
        Some(root) => dir.join(root),
        None => dir,
    };
    let (theme_name, theme) = registry.resolve(theme_override.or(file.theme.as_deref()));

    tracing::info!(
        config = %path.display(),
        commands = commands.len(),
        theme = %theme_name,
        "configuration loaded"
    );

    Ok(AppContext {
        config_path: path.to_path_buf(),
        root,
        theme_name,
        theme,
        commands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_accept_string_or_table_form() {
        let file: ConfigFile = toml::from_str(
            r#"
            [commands]
            Vite = "npm run dev"
            Logs = { run = "tail -f storage/logs/laravel.log", format = "exception", lazy = true }
            "#,
        )
        .expect("parse");
        let defs = file
            .commands
            .into_iter()
            .map(|(name, entry)| {
                CommandDefinition::from_entry(name, entry, Path::new("devtabs.toml"), CommandTrust::Trusted)
            })
            .collect::<Vec<CommandDefinition>>();

        assert_eq!(defs[0].name, "Vite");
        assert!(defs[0].autostart);
        assert_eq!(defs[0].format, FormatterKind::Plain);
        assert_eq!(defs[1].name, "Logs");
        assert!(!defs[1].autostart);
        assert_eq!(defs[1].format, FormatterKind::Exception);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed = toml::from_str::<ConfigFile>("colour = \"dark\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn allowlist_matches_include_paths() {
        let set = build_allowlist(&["packages/*/devtabs.toml".to_owned()]).expect("globs");
        assert!(set.is_match("packages/api/devtabs.toml"));
        assert!(!set.is_match("vendor/acme/devtabs.toml"));
        assert!(build_allowlist(&["[".to_owned()]).is_err());
    }

    #[test]
    fn config_dir_of_bare_file_name_is_current_dir() {
        let dir = config_dir(Path::new("devtabs.toml"));
        assert!(dir.is_absolute() || dir == Path::new("."));
    }
}
