//! Load an uploaded bhavcopy: a plain CSV, or the first `fo*.csv` member of a zip.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use zip::read::ZipArchive;

use crate::config::ArchiveCfg;
use crate::table::Table;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file format: {0:?} (upload .zip or .csv only)")]
    UnsupportedFormat(String),
    #[error("cannot open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt archive")]
    Archive(#[from] zip::result::ZipError),
    #[error("malformed CSV")]
    Csv(#[from] csv::Error),
}

/// `Ok(None)` means a readable archive without a matching member.
pub fn load_source(path: &Path, archive: &ArchiveCfg) -> Result<Option<Table>, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "zip" => {
            let file = open(path)?;
            read_csv_from_zip(BufReader::new(file), archive)
        }
        "csv" => load_csv(path).map(Some),
        _ => Err(LoadError::UnsupportedFormat(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )),
    }
}

pub fn load_csv(path: &Path) -> Result<Table, LoadError> {
    let file = open(path)?;
    let table = Table::from_reader(BufReader::new(file))?;
    info!("Loaded {} rows from {}", table.len(), path.display());
    debug!("Columns: {:?}", table.headers());
    Ok(table)
}

pub fn read_csv_from_zip<R: Read + Seek>(
    reader: R,
    archive: &ArchiveCfg,
) -> Result<Option<Table>, LoadError> {
    let mut zip = ZipArchive::new(reader)?;
    let prefix = archive.member_prefix.to_lowercase();
    let suffix = archive.member_suffix.to_lowercase();

    for i in 0..zip.len() {
        let entry = zip.by_index(i)?;
        let name = entry.name().to_lowercase();
        if entry.is_dir() || !name.starts_with(&prefix) || !name.ends_with(&suffix) {
            debug!("Skipping archive member {}", entry.name());
            continue;
        }
        let member = entry.name().to_string();
        let table = Table::from_reader(entry)?;
        info!("Loaded {} rows from archive member {}", table.len(), member);
        return Ok(Some(table));
    }
    Ok(None)
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })
}
