//! File-backed parameter store.
//!
//! Each parameter occupies one line, `name$payload`, where the payload is the
//! value run through the file's codec. The file is not held open: every call
//! opens it, scans it, and for mutations truncates and rewrites the whole line
//! list. A per-store reader/writer lock covers the full open→close span, so
//! reads never observe a half-written file from the same store. Nothing guards
//! against other processes writing the same path.
//!
//! The rewrite is not crash-atomic. A failure after truncation leaves the file
//! partially written.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::codec::{self, Mode};
use crate::crypto::{derive_key, Key};
use crate::error::{ParamError, Result};

/// Reserved parameter holding the file's [`Mode`] marker.
pub const MODE_PARAM_NAME: &str = "CurrentDataTypeForParameters";
pub const SEPARATOR: char = '$';

pub struct ParamStore {
    path: PathBuf,
    mode: Mode,
    key: Option<Zeroizing<Key>>,
    lock: RwLock<()>,
}

impl fmt::Debug for ParamStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamStore")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl ParamStore {
    /// Open the parameter file at `path`, creating it if absent.
    ///
    /// A new file is stamped with `mode`; an existing one must carry the same
    /// stamp. `passphrase` is only used in [`Mode::Encrypted`] and is never
    /// written anywhere.
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode, passphrase: &str) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ParamError::Validation("empty parameter file path".into()));
        }

        let store = ParamStore {
            path: path.to_path_buf(),
            mode,
            key: (mode == Mode::Encrypted).then(|| derive_key(passphrase)),
            lock: RwLock::new(()),
        };

        match path.metadata() {
            Ok(_) => {
                store.verify_mode()?;
                info!(path = %path.display(), %mode, "opened parameter file");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                store.create()?;
                info!(path = %path.display(), %mode, "created parameter file");
            }
            Err(e) => {
                return Err(ParamError::Io {
                    context: format!("access {}", path.display()),
                    source: e,
                })
            }
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Read and decode the value of `name`.
    pub fn get(&self, name: &str) -> Result<String> {
        ensure_name(name)?;
        let _guard = self.lock.read();

        let file = File::open(&self.path).map_err(|e| self.io_error("open", e))?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| self.io_error("read", e))?;
            if line.is_empty() {
                continue;
            }
            let Some(payload) = payload_for(&line, name) else {
                continue;
            };
            if payload.is_empty() {
                return Err(ParamError::EmptyValue(name.to_string()));
            }
            debug!(param = name, "parameter read");
            return codec::decode(self.mode, self.key(), payload);
        }
        Err(ParamError::NotFound(name.to_string()))
    }

    /// Whether a line for `name` exists, without decoding it.
    pub fn contains(&self, name: &str) -> Result<bool> {
        ensure_name(name)?;
        let _guard = self.lock.read();

        let file = File::open(&self.path).map_err(|e| self.io_error("open", e))?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| self.io_error("read", e))?;
            if payload_for(&line, name).is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Store `value` under `name`, replacing the existing line in place or
    /// appending a new one.
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return Err(ParamError::Validation(format!(
                "empty value for parameter \"{name}\""
            )));
        }
        ensure_name(name)?;

        let encoded = codec::encode(self.mode, self.key(), value)?;
        let entry = format!("{name}{SEPARATOR}{encoded}");
        let _guard = self.lock.write();

        let mut file = self.open_rw()?;
        let lines = self.read_all(&mut file)?;
        let mut out = Vec::with_capacity(lines.len() + 1);
        let mut replaced = false;
        let mut duplicates = 0usize;
        for line in lines {
            if payload_for(&line, name).is_none() {
                out.push(line);
            } else if replaced {
                duplicates += 1;
            } else {
                out.push(entry.clone());
                replaced = true;
            }
        }
        if !replaced {
            out.push(entry);
        }
        if duplicates > 0 {
            warn!(param = name, duplicates, "dropped duplicate parameter lines");
        }

        self.rewrite(&mut file, &out)?;
        debug!(param = name, replaced, "parameter written");
        Ok(())
    }

    /// Remove every line for `name`. Removing an absent name is not an error.
    pub fn delete(&self, name: &str) -> Result<()> {
        ensure_name(name)?;
        let _guard = self.lock.write();

        let mut file = self.open_rw()?;
        let lines = self.read_all(&mut file)?;
        let before = lines.len();
        let kept: Vec<String> = lines
            .into_iter()
            .filter(|line| payload_for(line, name).is_none())
            .collect();
        let removed = before - kept.len();

        self.rewrite(&mut file, &kept)?;
        debug!(param = name, removed, "parameter deleted");
        Ok(())
    }

    fn key(&self) -> Option<&Key> {
        self.key.as_deref()
    }

    fn create(&self) -> Result<()> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| ParamError::Create(format!("{}: {e}", self.path.display())))?;
        let stamped = self.set(MODE_PARAM_NAME, self.mode.marker());
        discard_unstamped(&self.path, stamped)
    }

    fn verify_mode(&self) -> Result<()> {
        let found = match self.get(MODE_PARAM_NAME) {
            Ok(marker) if Mode::from_marker(&marker) == Some(self.mode) => return Ok(()),
            Ok(marker) => match Mode::from_marker(&marker) {
                Some(mode) => mode.to_string(),
                None => format!("unknown marker \"{marker}\""),
            },
            Err(e) => format!("unreadable marker ({e})"),
        };
        Err(ParamError::ModeMismatch {
            requested: self.mode,
            found,
        })
    }

    fn open_rw(&self) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| self.io_error("open", e))
    }

    fn read_all(&self, file: &mut File) -> Result<Vec<String>> {
        let mut text = String::new();
        file.read_to_string(&mut text).map_err(|e| self.io_error("read", e))?;
        Ok(text.lines().map(str::to_owned).collect())
    }

    fn rewrite(&self, file: &mut File, lines: &[String]) -> Result<()> {
        let mut output = lines.join("\n");
        if !output.is_empty() {
            output.push('\n');
        }
        file.set_len(0).map_err(|e| self.io_error("truncate", e))?;
        file.seek(SeekFrom::Start(0)).map_err(|e| self.io_error("seek", e))?;
        file.write_all(output.as_bytes()).map_err(|e| self.io_error("write", e))?;
        file.flush().map_err(|e| self.io_error("flush", e))
    }

    fn io_error(&self, action: &str, source: io::Error) -> ParamError {
        ParamError::Io {
            context: format!("{action} {}", self.path.display()),
            source,
        }
    }
}

/// Remove a freshly created file whose mode marker could not be written, so
/// a later `open` creates it again instead of failing on the missing marker.
fn discard_unstamped(path: &Path, stamped: Result<()>) -> Result<()> {
    stamped.map_err(|e| {
        if let Err(rm) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %rm, "cannot remove unstamped parameter file");
        }
        ParamError::Create(format!("stamp mode marker: {e}"))
    })
}

/// A name starts with an ASCII letter or `_` and continues with ASCII letters,
/// digits, `_` or `-`.
pub fn check_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn ensure_name(name: &str) -> Result<()> {
    if check_name(name) {
        Ok(())
    } else {
        Err(ParamError::Validation(format!(
            "wrong parameter name \"{name}\""
        )))
    }
}

/// The payload of `line` if it belongs to `name`.
fn payload_for<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    match line.split_once(SEPARATOR) {
        Some((line_name, payload)) if line_name == name => Some(payload),
        _ => None,
    }
}
