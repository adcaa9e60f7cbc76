//! Byte-stream adapter: one open-for-read / open-for-write capability over
//! local files, standard streams and remote objects, with the compression
//! envelope layered on top.

use crate::error::{Error, Result};
use crate::format::Compression;
use crate::io::archive;
use crate::io::cloud::{ObjectStore, StoreError};
use crate::io::compression::{Sink, codec_for};
use crate::io::locator::Locator;
use std::fmt;
use std::fs::{File, create_dir_all};
use std::io::{self, BufRead, BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// Readable byte stream. Closed when dropped.
pub type ByteSource = Box<dyn BufRead + Send>;

/// Everything a stream open needs besides the locator and compression.
#[derive(Clone, Default)]
pub struct IoContext {
    /// Object store backing remote locators.
    pub store: Option<Arc<dyn ObjectStore>>,
    /// Archive member to extract when reading through `zip`.
    pub member: Option<String>,
    /// Canned ACL applied to uploaded objects.
    pub acl: Option<String>,
    /// Create missing parent directories of local destinations.
    pub makedirs: bool,
}

impl fmt::Debug for IoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoContext")
            .field("store", &self.store.as_ref().map(|_| "<object store>"))
            .field("member", &self.member)
            .field("acl", &self.acl)
            .field("makedirs", &self.makedirs)
            .finish()
    }
}

impl IoContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    #[must_use]
    pub fn with_acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = Some(acl.into());
        self
    }

    #[must_use]
    pub fn with_makedirs(mut self, makedirs: bool) -> Self {
        self.makedirs = makedirs;
        self
    }

    pub(crate) fn store_for(&self, locator: &Locator) -> Result<&Arc<dyn ObjectStore>> {
        self.store.as_ref().ok_or_else(|| {
            Error::config(format!("no object store configured for remote locator {locator}"))
        })
    }
}

/// Open `locator` for reading and strip the compression envelope.
///
/// For `zip`, the member name is resolved before any I/O happens.
///
/// # Errors
/// Returns [`Error::UnsupportedOperation`] for archive reads without a member
/// name, [`Error::Format`] for page-only codecs, and [`Error::Io`] or
/// [`Error::Backend`] when the stream cannot be opened.
pub fn open_read(locator: &Locator, compression: Compression, ctx: &IoContext) -> Result<ByteSource> {
    match compression {
        Compression::Zip => {
            let member = archive::member_name(locator, ctx.member.as_deref())?;
            let bytes = read_bytes(locator, ctx)?;
            log::debug!("extracting {member} from {locator}");
            let extracted = archive::extract_member(bytes, &member)?;
            Ok(Box::new(Cursor::new(extracted)))
        }
        Compression::Snappy => Err(Error::Format(
            "snappy is a parquet page codec, not a stream envelope".into(),
        )),
        Compression::None | Compression::Gzip => {
            let raw = open_raw(locator, ctx)?;
            let reader = match codec_for(compression) {
                Some(codec) => codec
                    .wrap_reader(raw)
                    .map_err(|e| Error::io(format!("open {} stream {locator}", codec.name()), e))?,
                None => raw,
            };
            Ok(Box::new(BufReader::new(reader)))
        }
    }
}

/// Read the raw (still enveloped) bytes behind a locator.
///
/// # Errors
/// Returns [`Error::Io`] or [`Error::Backend`] if the stream cannot be read.
pub fn read_bytes(locator: &Locator, ctx: &IoContext) -> Result<Vec<u8>> {
    match locator {
        Locator::Remote { bucket, key, .. } => {
            let store = ctx.store_for(locator)?;
            Ok(store.get_object(bucket, key)?)
        }
        _ => {
            let mut raw = open_raw(locator, ctx)?;
            let mut out = Vec::new();
            raw.read_to_end(&mut out)
                .map_err(|e| Error::io(format!("read {locator}"), e))?;
            Ok(out)
        }
    }
}

fn open_raw(locator: &Locator, ctx: &IoContext) -> Result<Box<dyn Read + Send>> {
    match locator {
        Locator::Local(path) => {
            let f = File::open(path).map_err(|e| Error::io(format!("open {}", path.display()), e))?;
            log::debug!("opened {} for reading", path.display());
            Ok(Box::new(f))
        }
        Locator::Stdio => Ok(Box::new(io::stdin())),
        Locator::Remote { bucket, key, .. } => {
            let store = ctx.store_for(locator)?;
            let bytes = store.get_object(bucket, key)?;
            log::debug!("fetched {} bytes from {locator}", bytes.len());
            Ok(Box::new(Cursor::new(bytes)))
        }
    }
}

/// Writable byte stream. Must be [`finish`](ByteSink::finish)ed to commit.
pub struct ByteSink {
    inner: Box<dyn Sink>,
    locator: String,
}

impl ByteSink {
    /// Flush, close the compression envelope and commit the destination.
    ///
    /// # Errors
    /// Returns [`Error::Io`] or [`Error::Backend`] if any step fails.
    pub fn finish(self) -> Result<()> {
        let locator = self.locator;
        self.inner.finish().map_err(|e| unwrap_store_error(e, &locator))?;
        log::debug!("committed {locator}");
        Ok(())
    }
}

impl Write for ByteSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Open `locator` for writing with the given compression envelope.
///
/// # Errors
/// Returns [`Error::UnsupportedOperation`] when writing through an archive,
/// [`Error::Format`] for page-only codecs, and [`Error::Io`] when a local
/// file cannot be created (including a missing parent without `makedirs`).
pub fn open_write(locator: &Locator, compression: Compression, ctx: &IoContext) -> Result<ByteSink> {
    match compression {
        Compression::Zip => {
            return Err(Error::UnsupportedOperation(format!(
                "cannot write {locator} through a zip archive"
            )));
        }
        Compression::Snappy => {
            return Err(Error::Format(
                "snappy is a parquet page codec, not a stream envelope".into(),
            ));
        }
        Compression::None | Compression::Gzip => {}
    }

    let target: Box<dyn Sink> = match locator {
        Locator::Local(path) => {
            if ctx.makedirs {
                make_parent_dirs(path)?;
            }
            let f = File::create(path)
                .map_err(|e| Error::io(format!("create {}", path.display()), e))?;
            Box::new(FileSink(BufWriter::new(f)))
        }
        Locator::Stdio => Box::new(StdoutSink(io::stdout())),
        Locator::Remote { bucket, key, .. } => Box::new(RemoteSink {
            store: Arc::clone(ctx.store_for(locator)?),
            bucket: bucket.clone(),
            key: key.clone(),
            acl: ctx.acl.clone(),
            buf: Vec::new(),
        }),
    };

    let inner = match codec_for(compression) {
        Some(codec) => codec
            .wrap_writer(target)
            .map_err(|e| Error::io(format!("start {} stream {locator}", codec.name()), e))?,
        None => target,
    };
    Ok(ByteSink {
        inner,
        locator: locator.to_string(),
    })
}

pub(crate) fn make_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).map_err(|e| Error::io(format!("mkdir -p {}", parent.display()), e))?;
    }
    Ok(())
}

fn unwrap_store_error(e: io::Error, locator: &str) -> Error {
    if let Some(store_err) = e.get_ref().and_then(|inner| inner.downcast_ref::<StoreError>()) {
        return Error::Backend(store_err.clone());
    }
    Error::io(format!("finish {locator}"), e)
}

struct FileSink(BufWriter<File>);

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Sink for FileSink {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.0.flush()
    }
}

struct StdoutSink(io::Stdout);

impl Write for StdoutSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Sink for StdoutSink {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.0.flush()
    }
}

/// Buffers the whole object and uploads it on finish.
struct RemoteSink {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
    acl: Option<String>,
    buf: Vec<u8>,
}

impl Write for RemoteSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for RemoteSink {
    fn finish(self: Box<Self>) -> io::Result<()> {
        self.store
            .put_object(&self.bucket, &self.key, &self.buf, self.acl.as_deref())
            .map_err(io::Error::other)
    }
}
