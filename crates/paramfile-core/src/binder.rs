//! `key = value` config files bound to a statically declared field table.
//!
//! A record opts in by implementing [`BindConfig`] and listing one
//! [`ConfigField`] per persisted field. [`process_config`] writes a commented
//! default file when none exists, and otherwise reads the file back into the
//! record field by field. Bad lines are logged and skipped; they never abort
//! the load.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::log::{ConfigLog, NoopLog};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Typed accessor for one field of `T`.
pub enum Slot<T> {
    Int(fn(&mut T) -> &mut i64),
    Uint(fn(&mut T) -> &mut u64),
    Float(fn(&mut T) -> &mut f64),
    Bool(fn(&mut T) -> &mut bool),
    Text(fn(&mut T) -> &mut String),
}

impl<T> Slot<T> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Slot::Int(_) => "i64",
            Slot::Uint(_) => "u64",
            Slot::Float(_) => "f64",
            Slot::Bool(_) => "bool",
            Slot::Text(_) => "string",
        }
    }

    fn render(&self, cfg: &mut T) -> String {
        match self {
            Slot::Int(field) => field(cfg).to_string(),
            Slot::Uint(field) => field(cfg).to_string(),
            Slot::Float(field) => field(cfg).to_string(),
            Slot::Bool(field) => field(cfg).to_string(),
            Slot::Text(field) => field(cfg).clone(),
        }
    }

    fn assign(&self, cfg: &mut T, raw: &str) -> Result<(), String> {
        match self {
            Slot::Int(field) => *field(cfg) = raw.parse::<i64>().map_err(|e| format!("{e}"))?,
            Slot::Uint(field) => *field(cfg) = raw.parse::<u64>().map_err(|e| format!("{e}"))?,
            Slot::Float(field) => *field(cfg) = raw.parse::<f64>().map_err(|e| format!("{e}"))?,
            Slot::Bool(field) => {
                *field(cfg) = parse_bool(raw).ok_or_else(|| "invalid boolean".to_string())?
            }
            Slot::Text(field) => *field(cfg) = raw.to_string(),
        }
        Ok(())
    }
}

pub struct ConfigField<T> {
    pub key: &'static str,
    pub description: &'static str,
    pub slot: Slot<T>,
}

impl<T> ConfigField<T> {
    pub fn new(key: &'static str, description: &'static str, slot: Slot<T>) -> Self {
        Self {
            key,
            description,
            slot,
        }
    }
}

/// A record that can be loaded from and seeded into a config file.
pub trait BindConfig: Sized {
    fn config_path(&self) -> PathBuf;

    /// Title written into the header of a freshly created file.
    fn config_description(&self) -> String;

    fn config_fields() -> Vec<ConfigField<Self>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOutcome {
    /// The file was missing and has been written with the record's values.
    Created,
    /// The file was read; `applied` fields were assigned, `skipped` lines ignored.
    Loaded { applied: usize, skipped: usize },
}

/// Load `cfg` from its config file, or create the file from `cfg`'s values.
pub fn process_config<T: BindConfig>(
    cfg: &mut T,
    log: Option<&dyn ConfigLog>,
) -> Result<ConfigOutcome, ConfigError> {
    let log = log.unwrap_or(&NoopLog);
    let path = cfg.config_path();
    log.info(&format!("loading configuration from \"{}\"", path.display()));

    let outcome = match fs::metadata(&path) {
        Ok(_) => read_config(&path, cfg, log)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log.warn("config file does not exist");
            create_config_file(&path, cfg, log)?;
            ConfigOutcome::Created
        }
        Err(source) => {
            log.error(&format!("cannot access config file: {source}"));
            return Err(ConfigError::Io {
                context: "access",
                path,
                source,
            });
        }
    };

    log.info("config file processed");
    Ok(outcome)
}

fn read_config<T: BindConfig>(
    path: &Path,
    cfg: &mut T,
    log: &dyn ConfigLog,
) -> Result<ConfigOutcome, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        context: "read",
        path: path.to_path_buf(),
        source,
    })?;
    let fields = T::config_fields();
    let mut applied = 0;
    let mut skipped = 0;

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = split_assignment(line) else {
            log.debug(&format!("incorrect line: \"{line}\""));
            skipped += 1;
            continue;
        };
        let Some(field) = fields.iter().find(|f| f.key == key) else {
            log.debug(&format!("unknown parameter \"{key}\" ignored"));
            skipped += 1;
            continue;
        };
        match field.slot.assign(cfg, value) {
            Ok(()) => {
                log.debug(&format!("parameter \"{key}\" = {value}"));
                applied += 1;
            }
            Err(e) => {
                log.error(&format!(
                    "parameter \"{key}\": cannot convert \"{value}\" to {}: {e}",
                    field.slot.type_name()
                ));
                skipped += 1;
            }
        }
    }

    Ok(ConfigOutcome::Loaded { applied, skipped })
}

fn create_config_file<T: BindConfig>(
    path: &Path,
    cfg: &mut T,
    log: &dyn ConfigLog,
) -> Result<(), ConfigError> {
    log.info("creating config file");
    let io_err = |context: &'static str| {
        move |source: io::Error| ConfigError::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    };

    let mut out = header(&cfg.config_description());
    for field in T::config_fields() {
        let value = field.slot.render(cfg);
        out.push_str(&format!(
            "\n# {}\n{} = {}\n",
            field.description, field.key, value
        ));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err("create directory for"))?;
    }
    fs::write(path, out).map_err(io_err("write"))?;

    log.info("config file created with default values");
    Ok(())
}

fn header(description: &str) -> String {
    format!(
        "###   {description}   ###\n\
         #\n\
         # Each line holds a parameter name and its value separated by \"=\"\n\
         # Only one \"=\" is allowed per line\n\
         # A deleted file is recreated with default values on next start\n\
         #\n\
         # Lines starting with \"#\" are comments\n\
         \n\n"
    )
}

/// `key = value` with exactly one `=`.
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    if value.contains('=') {
        return None;
    }
    Some((key.trim(), value.trim()))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_needs_exactly_one_equals() {
        assert_eq!(split_assignment("a = b"), Some(("a", "b")));
        assert_eq!(split_assignment("a="), Some(("a", "")));
        assert_eq!(split_assignment("a = b = c"), None);
        assert_eq!(split_assignment("just text"), None);
    }

    #[test]
    fn bool_spellings() {
        assert_eq!(parse_bool("T"), Some(true));
        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool("tRUE"), None);
    }

    #[test]
    fn header_mentions_description() {
        let h = header("My Service");
        assert!(h.starts_with("###   My Service   ###\n"));
        assert!(h.lines().filter(|l| !l.is_empty()).all(|l| l.starts_with('#')));
    }
}
