//! Source and destination locators.

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Marker for standard input (when reading) or standard output (when writing).
pub const STDIO_MARKER: &str = "-";

/// Where bytes come from or go to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Local(PathBuf),
    Stdio,
    Remote {
        scheme: String,
        bucket: String,
        key: String,
    },
}

impl Locator {
    /// Parse a user-supplied locator.
    ///
    /// `-` is standard input/output, `scheme://bucket/key` is a remote object,
    /// anything else is a local path. A trailing `/` on a remote key is dropped.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an empty locator or a remote locator
    /// without a bucket.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::config("locator is empty"));
        }
        if s == STDIO_MARKER {
            return Ok(Locator::Stdio);
        }
        if let Some((scheme, rest)) = s.split_once("://") {
            if scheme.is_empty() || scheme.contains('/') {
                return Err(Error::config(format!("invalid remote locator {s:?}")));
            }
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(Error::config(format!("remote locator {s:?} has no bucket")));
            }
            return Ok(Locator::Remote {
                scheme: scheme.to_string(),
                bucket: bucket.to_string(),
                key: key.trim_end_matches('/').to_string(),
            });
        }
        Ok(Locator::Local(PathBuf::from(s)))
    }

    pub fn local(path: impl AsRef<Path>) -> Self {
        Locator::Local(path.as_ref().to_path_buf())
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Locator::Remote { .. })
    }

    /// Append a relative `/`-separated path.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedOperation`] for standard streams.
    pub fn join(&self, child: &str) -> Result<Self> {
        match self {
            Locator::Local(p) => Ok(Locator::Local(
                child.split('/').fold(p.clone(), |acc, part| acc.join(part)),
            )),
            Locator::Stdio => Err(Error::UnsupportedOperation(
                "standard streams have no children".into(),
            )),
            Locator::Remote {
                scheme,
                bucket,
                key,
            } => Ok(Locator::Remote {
                scheme: scheme.clone(),
                bucket: bucket.clone(),
                key: if key.is_empty() {
                    child.to_string()
                } else {
                    format!("{key}/{child}")
                },
            }),
        }
    }

    /// Final path segment, if there is one.
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        match self {
            Locator::Local(p) => p.file_name().map(|n| n.to_string_lossy().into_owned()),
            Locator::Stdio => None,
            Locator::Remote { key, .. } => key
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Local(p) => write!(f, "{}", p.display()),
            Locator::Stdio => f.write_str(STDIO_MARKER),
            Locator::Remote {
                scheme,
                bucket,
                key,
            } => write!(f, "{scheme}://{bucket}/{key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_kind() {
        assert_eq!(Locator::parse("-").unwrap(), Locator::Stdio);
        assert_eq!(
            Locator::parse("data/in.csv").unwrap(),
            Locator::Local(PathBuf::from("data/in.csv"))
        );
        assert_eq!(
            Locator::parse("s3://bucket/path/to/file/").unwrap(),
            Locator::Remote {
                scheme: "s3".into(),
                bucket: "bucket".into(),
                key: "path/to/file".into()
            }
        );
        assert!(Locator::parse("s3:///key").is_err());
        assert!(Locator::parse("").is_err());
    }

    #[test]
    fn joins_and_names() {
        let remote = Locator::parse("s3://b/root").unwrap();
        let child = remote.join("year=2001/2001.parquet").unwrap();
        assert_eq!(child.to_string(), "s3://b/root/year=2001/2001.parquet");
        assert_eq!(child.file_name().as_deref(), Some("2001.parquet"));

        let local = Locator::local("/tmp/root").join("a=1/1.parquet").unwrap();
        assert_eq!(local, Locator::Local(PathBuf::from("/tmp/root/a=1/1.parquet")));
        assert!(Locator::Stdio.join("x").is_err());
    }
}
