use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};

/// Fixed name of the generated report inside the storage directory.
pub const REPORT_FILENAME: &str = "report.html";

/// Single-slot storage area: one directory holding at most one uploaded
/// source file and at most one generated `report.html`.
///
/// The store owns the guard that serializes upload/profile cycles; callers
/// hold it for a full cycle so clear/save interleavings from concurrent
/// requests cannot corrupt the slot.
pub struct ReportStore {
    dir: PathBuf,
    guard: Mutex<()>,
}

impl ReportStore {
    /// Opens the store, creating the directory if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            guard: Mutex::new(()),
        })
    }

    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deletes every file currently in the storage directory.
    ///
    /// Succeeds when the directory is already empty. A failed delete is
    /// fatal for the current request: the slot would otherwise hold
    /// artifacts from two different cycles.
    pub fn clear(&self) -> io::Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    /// Writes the uploaded bytes to `<dir>/<filename>`, overwriting.
    ///
    /// The filename is reduced to its final path component first, so a
    /// crafted name like `../../etc/passwd` cannot escape the directory.
    pub fn save_upload(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let name = sanitize_filename(filename).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unusable upload filename: {:?}", filename),
            )
        })?;
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Writes the profiling engine's output to `<dir>/report.html`, overwriting.
    pub fn save_report(&self, html: &str) -> io::Result<PathBuf> {
        let path = self.report_path();
        fs::write(&path, html)?;
        Ok(path)
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(REPORT_FILENAME)
    }

    pub fn report_exists(&self) -> bool {
        self.report_path().is_file()
    }
}

/// Reduces an uploaded filename to a safe final path component.
///
/// Both `/` and `\` count as separators regardless of platform, since the
/// name comes from an arbitrary client. Returns `None` when nothing usable
/// remains (empty, `.`, `..`).
fn sanitize_filename(filename: &str) -> Option<&str> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();
    match name {
        "" | "." | ".." => None,
        _ => Some(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn tmp_store(name: &str) -> ReportStore {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("tabular-profiler-{name}-{nanos}"));
        ReportStore::new(dir).unwrap()
    }

    fn file_count(store: &ReportStore) -> usize {
        fs::read_dir(store.dir()).unwrap().count()
    }

    #[test]
    fn sanitize_keeps_plain_names_and_strips_paths() {
        assert_eq!(sanitize_filename("data.csv"), Some("data.csv"));
        assert_eq!(sanitize_filename("a.b.xlsx"), Some("a.b.xlsx"));
        assert_eq!(sanitize_filename("../../etc/passwd"), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\temp\\data.xls"), Some("data.xls"));
        assert_eq!(sanitize_filename("dir/.."), None);
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("   "), None);
    }

    #[test]
    fn clear_is_a_noop_on_an_empty_directory() {
        let store = tmp_store("clear-empty");
        store.clear().unwrap();
        assert_eq!(file_count(&store), 0);
    }

    #[test]
    fn upload_and_report_occupy_a_single_slot() {
        let store = tmp_store("slot");
        assert!(!store.report_exists());

        let path = store.save_upload("data.csv", b"a,b\n1,2\n").unwrap();
        assert!(path.is_file());
        assert_eq!(path.file_name().unwrap(), "data.csv");

        store.save_report("<html></html>").unwrap();
        assert!(store.report_exists());
        assert_eq!(file_count(&store), 2);

        // A new cycle begins with clear(): nothing survives.
        store.clear().unwrap();
        assert_eq!(file_count(&store), 0);
        assert!(!store.report_exists());
    }

    #[test]
    fn save_upload_escaping_name_stays_inside_the_directory() {
        let store = tmp_store("escape");
        let path = store.save_upload("../outside.csv", b"x").unwrap();
        assert_eq!(path.parent().unwrap(), store.dir());
        assert!(!store.dir().parent().unwrap().join("outside.csv").exists());
    }

    #[test]
    fn save_upload_rejects_unusable_names() {
        let store = tmp_store("reject");
        let err = store.save_upload("..", b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn lock_serializes_cycles() {
        let store = tmp_store("lock");
        tokio_test::block_on(async {
            let held = store.lock().await;
            // A second lock attempt must not succeed while the first is held.
            assert!(store.guard.try_lock().is_err());
            drop(held);
            assert!(store.guard.try_lock().is_ok());
        });
    }
}
