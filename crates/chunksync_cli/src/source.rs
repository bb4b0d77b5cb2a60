//! Turning command-line SOURCE/DEST arguments into sync jobs.

use crate::client::ReqwestClient;
use crate::error::{CliError, CliResult};
use chunksync_engine::{ChunkSource, HttpSource, LocalSource};
use chunksync_manifest::ChunkSizeLimits;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns true if `source` names a file on a chunk server.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Opens a local path or remote URL as a chunk source.
pub fn open(source: &str, limits: ChunkSizeLimits) -> CliResult<Box<dyn ChunkSource>> {
    if is_remote(source) {
        let client = ReqwestClient::new()?;
        Ok(Box::new(HttpSource::from_url(source, client)?))
    } else {
        Ok(Box::new(LocalSource::open_with_limits(source, limits)?))
    }
}

/// One source file and where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Local path or URL of the source file.
    pub source: String,
    /// Destination file.
    pub dest: PathBuf,
}

/// The jobs for one `sync` invocation.
#[derive(Debug, Default)]
pub struct Targets {
    /// Files to sync, in order.
    pub jobs: Vec<Job>,
    /// Directory to create before the first job.
    pub dest_dir: Option<PathBuf>,
}

/// Expands SOURCE and DEST into per-file jobs.
///
/// A local directory source yields one job per regular file, sorted by
/// name, each landing in DEST as a directory. A file source landing on an
/// existing directory keeps its file name. Nothing is created here.
pub fn plan(source: &str, dest: &Path) -> CliResult<Targets> {
    if is_remote(source) {
        let name = source.rsplit('/').next().unwrap_or_default();
        return Ok(single(source, dest, name));
    }

    let path = Path::new(source);
    let meta = fs::metadata(path).map_err(|e| CliError::io(path, e))?;
    if !meta.is_dir() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Ok(single(source, dest, &name));
    }

    if dest.exists() && !dest.is_dir() {
        return Err(CliError::DestinationNotDirectory(dest.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| CliError::io(path, e))? {
        let entry = entry.map_err(|e| CliError::io(path, e))?;
        entries.push(entry.path());
    }
    entries.sort();

    let mut jobs = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.is_dir() {
            return Err(CliError::OnlyFiles(entry));
        }
        let Some(name) = entry.file_name() else {
            continue;
        };
        jobs.push(Job {
            dest: dest.join(name),
            source: entry.to_string_lossy().into_owned(),
        });
    }

    Ok(Targets {
        jobs,
        dest_dir: Some(dest.to_path_buf()),
    })
}

fn single(source: &str, dest: &Path, name: &str) -> Targets {
    let dest = if dest.is_dir() && !name.is_empty() {
        dest.join(name)
    } else {
        dest.to_path_buf()
    };
    Targets {
        jobs: vec![Job {
            source: source.to_string(),
            dest,
        }],
        dest_dir: None,
    }
}
