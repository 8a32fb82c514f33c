use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const KEY: &str = "passwords";

/// Edits the `passwords` array of a JSON configuration file in place.
///
/// Every other key of the file is preserved. A missing file reads as an
/// empty list and is created on the first write.
#[derive(Clone, Debug)]
pub struct PasswordStore {
    path: PathBuf,
}

impl PasswordStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let is_json = path.extension().is_none_or(|e| e.eq_ignore_ascii_case("json"));
        if !is_json {
            exn::bail!(ErrorKind::UnsupportedFormat(path));
        }
        Ok(Self { path })
    }

    /// The store backing the default configuration file.
    pub fn at_default() -> Result<Self> {
        Self::new(crate::default_config_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let document = self.read()?;
        let Some(value) = document.get(KEY) else {
            return Ok(Vec::new());
        };
        let Value::Array(items) = value else {
            exn::bail!(ErrorKind::Malformed(self.path.clone()));
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(exn::Exn::from(ErrorKind::Malformed(self.path.clone()))),
            })
            .collect()
    }

    /// Appends `password`. Returns `false` if it was already present.
    pub fn add(&self, password: &str) -> Result<bool> {
        let mut passwords = self.list()?;
        if passwords.iter().any(|p| p == password) {
            return Ok(false);
        }
        passwords.push(password.to_string());
        let count = passwords.len();
        self.write(passwords)?;
        tracing::info!(count, "Stored new password");
        Ok(true)
    }

    /// Removes `password`. Returns `false` if it wasn't present.
    pub fn remove(&self, password: &str) -> Result<bool> {
        let mut passwords = self.list()?;
        let before = passwords.len();
        passwords.retain(|p| p != password);
        if passwords.len() == before {
            return Ok(false);
        }
        self.write(passwords)?;
        tracing::info!(count = before - 1, "Removed stored password");
        Ok(true)
    }

    fn read(&self) -> Result<Map<String, Value>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&contents).or_raise(|| ErrorKind::Malformed(self.path.clone()))? {
            Value::Object(map) => Ok(map),
            _ => exn::bail!(ErrorKind::Malformed(self.path.clone())),
        }
    }

    fn write(&self, passwords: Vec<String>) -> Result<()> {
        let mut document = self.read()?;
        document.insert(KEY.to_string(), Value::from(passwords));
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Io)?;
        }
        let json = serde_json::to_string_pretty(&Value::Object(document)).or_raise(|| ErrorKind::Io)?;
        std::fs::write(&self.path, json).or_raise(|| ErrorKind::Io)
    }
}
