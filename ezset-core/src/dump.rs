//! Save and restore dump files
//!
//! Dumps are ipset's native line-oriented `create`/`add` text, optionally
//! gzip-compressed.

use crate::error::{IpsetError, Result};
use crate::options::{RestoreOptions, SaveOptions};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn has_gz_suffix(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Final path of a saved dump: `.gz` is appended when compressing
///
/// Returns the path and whether it will be gzip-compressed.
pub fn save_target(path: &Path, gzip: bool) -> (PathBuf, bool) {
    if has_gz_suffix(path) {
        (path.to_path_buf(), true)
    } else if gzip {
        let mut name = path.as_os_str().to_os_string();
        name.push(".gz");
        (PathBuf::from(name), true)
    } else {
        (path.to_path_buf(), false)
    }
}

/// Write dump text to `target`, which must already be resolved by [`save_target`]
pub fn write_dump(target: &Path, gzip: bool, dump: &str, opts: &SaveOptions) -> Result<()> {
    opts.validate()?;

    let mut open = OpenOptions::new();
    open.write(true);
    if opts.overwrite {
        open.create(true).truncate(true);
    } else {
        open.create_new(true);
    }

    let file = open.open(target).map_err(|e| match e.kind() {
        std::io::ErrorKind::AlreadyExists => IpsetError::FileExists(target.to_path_buf()),
        _ => IpsetError::Io(e),
    })?;

    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::new(opts.compression_level));
        encoder.write_all(dump.as_bytes())?;
        encoder.finish()?.sync_all()?;
    } else {
        let mut file = file;
        file.write_all(dump.as_bytes())?;
        file.sync_all()?;
    }

    tracing::debug!("Wrote {} bytes of dump to {}", dump.len(), target.display());
    Ok(())
}

/// Read a dump file, decompressing `.gz` files
pub fn read_dump(path: &Path) -> Result<String> {
    let mut text = String::new();
    if has_gz_suffix(path) {
        GzDecoder::new(File::open(path)?).read_to_string(&mut text)?;
    } else {
        text = fs::read_to_string(path)?;
    }
    Ok(text)
}

/// Keep the lines of a dump that survive the restore filters
pub fn filter_dump(text: &str, opts: &RestoreOptions) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !(opts.skip_create_sets && line.starts_with("create ")))
        .filter(|line| !(opts.skip_add_entries && line.starts_with("add ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// File handed to `ipset restore -file`
#[derive(Debug)]
pub enum RestoreInput {
    /// The caller's file, used as-is
    Original(PathBuf),

    /// A decompressed and/or filtered copy, deleted on drop
    Filtered(NamedTempFile),
}

impl RestoreInput {
    pub fn path(&self) -> &Path {
        match self {
            RestoreInput::Original(path) => path,
            RestoreInput::Filtered(file) => file.path(),
        }
    }
}

/// Prepare a dump for restoring
///
/// A temporary copy is only written when decompression or filtering applies.
pub fn prepare_restore(path: &Path, opts: &RestoreOptions) -> Result<RestoreInput> {
    if !path.is_file() {
        return Err(IpsetError::FileNotFound(path.to_path_buf()));
    }

    if !has_gz_suffix(path) && !opts.skip_create_sets && !opts.skip_add_entries {
        return Ok(RestoreInput::Original(path.to_path_buf()));
    }

    let filtered = filter_dump(&read_dump(path)?, opts);

    let mut tmp = tempfile::Builder::new()
        .prefix("ipset_restore_file-")
        .tempfile()?;
    tmp.write_all(filtered.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;

    tracing::debug!(
        "Prepared restore copy of {} at {}",
        path.display(),
        tmp.path().display()
    );
    Ok(RestoreInput::Filtered(tmp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DUMP: &str = "create blocklist hash:ip family inet hashsize 1024 maxelem 65536\n  add blocklist 10.0.0.1\nadd blocklist 10.0.0.2\n";

    #[test]
    fn test_save_target() {
        let (path, gzip) = save_target(Path::new("/tmp/rules.save"), true);
        assert_eq!(path, PathBuf::from("/tmp/rules.save.gz"));
        assert!(gzip);

        let (path, gzip) = save_target(Path::new("/tmp/rules.gz"), false);
        assert_eq!(path, PathBuf::from("/tmp/rules.gz"));
        assert!(gzip);

        let (_, gzip) = save_target(Path::new("/tmp/rules.save"), false);
        assert!(!gzip);
    }

    #[test]
    fn test_write_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("rules.save");
        fs::write(&target, "keep me").unwrap();

        let err = write_dump(&target, false, DUMP, &SaveOptions::default()).unwrap_err();
        assert!(matches!(err, IpsetError::FileExists(_)));
        assert_eq!(fs::read_to_string(&target).unwrap(), "keep me");

        let overwrite = SaveOptions {
            overwrite: true,
            ..Default::default()
        };
        write_dump(&target, false, DUMP, &overwrite).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), DUMP);
    }

    #[test]
    fn test_gzip_round_trip() {
        let dir = TempDir::new().unwrap();
        let (target, gzip) = save_target(&dir.path().join("rules.save"), true);
        let opts = SaveOptions {
            gzip: true,
            compression_level: 6,
            ..Default::default()
        };

        write_dump(&target, gzip, DUMP, &opts).unwrap();
        assert_eq!(read_dump(&target).unwrap(), DUMP);
    }

    #[test]
    fn test_invalid_compression_level() {
        let dir = TempDir::new().unwrap();
        let opts = SaveOptions {
            compression_level: 12,
            ..Default::default()
        };
        let err = write_dump(&dir.path().join("x.gz"), true, DUMP, &opts).unwrap_err();
        assert!(matches!(err, IpsetError::Validation(_)));
    }

    #[test]
    fn test_filter_dump() {
        let skip_create = RestoreOptions {
            skip_create_sets: true,
            ..Default::default()
        };
        assert_eq!(
            filter_dump(DUMP, &skip_create),
            "add blocklist 10.0.0.1\nadd blocklist 10.0.0.2"
        );

        let skip_add = RestoreOptions {
            skip_add_entries: true,
            ..Default::default()
        };
        assert_eq!(
            filter_dump(DUMP, &skip_add),
            "create blocklist hash:ip family inet hashsize 1024 maxelem 65536"
        );
    }

    #[test]
    fn test_plain_restore_uses_original() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("rules.save");
        fs::write(&source, DUMP).unwrap();

        let input = prepare_restore(&source, &RestoreOptions::default()).unwrap();
        assert!(matches!(input, RestoreInput::Original(_)));
        assert_eq!(input.path(), source.as_path());
    }

    #[test]
    fn test_filtered_copy_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("rules.save");
        fs::write(&source, DUMP).unwrap();

        let opts = RestoreOptions {
            skip_add_entries: true,
            ..Default::default()
        };
        let input = prepare_restore(&source, &opts).unwrap();
        let tmp_path = input.path().to_path_buf();

        assert_ne!(tmp_path, source);
        assert!(!fs::read_to_string(&tmp_path).unwrap().contains("add "));

        drop(input);
        assert!(!tmp_path.exists());
    }

    #[test]
    fn test_missing_restore_file() {
        let err = prepare_restore(Path::new("/nonexistent/rules.save"), &RestoreOptions::default())
            .unwrap_err();
        assert!(matches!(err, IpsetError::FileNotFound(_)));
    }
}
