use log::debug;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};

/// Where finished audio goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    Stdout,
    File(PathBuf),
}

impl OutputSink {
    /// `"stdout"` (or `"-"`) selects standard output, anything else is a path
    pub fn from_arg(arg: &str) -> Self {
        match arg {
            "stdout" | "-" => OutputSink::Stdout,
            path => OutputSink::File(PathBuf::from(path)),
        }
    }

    /// Write `bytes` in full.
    ///
    /// Files are written to a temporary file next to the target and renamed
    /// into place, so a failed write never leaves a truncated file behind.
    pub fn write(&self, bytes: &[u8]) -> io::Result<()> {
        match self {
            OutputSink::Stdout => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle.write_all(bytes)?;
                handle.flush()
            }
            OutputSink::File(path) => write_file(path, bytes),
        }
    }
}

impl fmt::Display for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSink::Stdout => write!(f, "stdout"),
            OutputSink::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = staging_file(directory)?;
    temp.write_all(bytes)?;
    temp.flush()?;

    // Overwrites keep the mode of the file being replaced
    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }
    temp.persist(path).map_err(|e| e.error)?;

    debug!("💾 Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Temp file in `directory` created with the same umask-derived mode a plain
/// `File::create` would get, instead of tempfile's owner-only default.
#[cfg(unix)]
fn staging_file(directory: &Path) -> io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    Builder::new()
        .permissions(fs::Permissions::from_mode(0o666))
        .tempfile_in(directory)
}

#[cfg(not(unix))]
fn staging_file(directory: &Path) -> io::Result<NamedTempFile> {
    Builder::new().tempfile_in(directory)
}
