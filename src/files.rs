// src/files.rs
//! Line-delimited files exchanged between the three programs.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

pub const INSTANCES_PATH: &str = "instances.txt";
pub const READY_INSTANCES_PATH: &str = "readyInstances.txt";
pub const CREDENTIALS_PATH: &str = "credentials.txt";

/// Read a line-delimited file, trimming each line and dropping blanks.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Overwrite `path` with one name per line.
pub fn write_instances<S: AsRef<str>>(path: &Path, names: &[S]) -> Result<()> {
    let mut out = String::new();
    for n in names {
        out.push_str(n.as_ref());
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}

/// Append `host` unless the file already lists it. Returns whether a line was written.
pub fn append_ready(path: &Path, host: &str) -> Result<bool> {
    let host = host.trim();
    if host.is_empty() {
        return Ok(false);
    }
    if path.exists() && read_lines(path)?.iter().any(|h| h == host) {
        return Ok(false);
    }

    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writeln!(f, "{host}").with_context(|| format!("appending to {}", path.display()))?;
    Ok(true)
}

/// Generated mailbox address plus the operator's password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Writes exactly `email\npassword`.
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, format!("{}\n{}", self.email, self.password))
            .with_context(|| format!("writing {}", path.display()))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut lines = content.lines();
        match (lines.next(), lines.next()) {
            (Some(email), Some(password)) if !email.trim().is_empty() => {
                Ok(Self::new(email.trim(), password.trim_end_matches('\r')))
            }
            _ => Err(anyhow!(
                "{} must hold the email on line 1 and the password on line 2",
                path.display()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_lines_skips_blanks_and_trims() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("list.txt");
        fs::write(&p, " a.social \n\n\nb.social\r\n").unwrap();
        assert_eq!(read_lines(&p).unwrap(), vec!["a.social", "b.social"]);
    }

    #[test]
    fn append_ready_does_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("ready.txt");
        assert!(append_ready(&p, "a.social").unwrap());
        assert!(!append_ready(&p, "a.social").unwrap());
        assert!(append_ready(&p, "b.social").unwrap());
        assert_eq!(fs::read_to_string(&p).unwrap(), "a.social\nb.social\n");
    }

    #[test]
    fn short_credentials_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("credentials.txt");
        fs::write(&p, "only@one.line").unwrap();
        assert!(Credentials::read(&p).is_err());
    }
}
