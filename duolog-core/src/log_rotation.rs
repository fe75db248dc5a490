use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use chrono::Utc;

use crate::{
    config::DUOLOG_CONFIG,
    error::{Error, Result},
    log_writer::{LogWriter, open_append},
};

#[cfg(not(test))]
mod limits {
    pub const MIN_ROTATION_DURATION_MS: u64 = 1_000;
    pub const MIN_FILE_SIZE: u64 = 4_096;
    pub const MIN_LINES: u64 = 10;
}


const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%6f";

/// Configuration of a [`RotatingFile`].
///
/// Files are named `<filename>_<timestamp>.<extension>` inside `folder`.
/// A new file is started as soon as any of `max_file_size`, `max_lines` or
/// `rotate_every` is reached. After each rotation, files older than
/// `max_age` are deleted, then the oldest files beyond `max_files`.
#[derive(Debug, Clone)]
pub struct RotationConfig {
    pub folder: PathBuf,
    pub filename: String,
    pub extension: String,
    pub max_file_size: Option<u64>,
    pub max_lines: Option<u64>,
    pub rotate_every: Option<Duration>,
    pub max_files: u32,
    pub max_age: Option<Duration>,
}

impl RotationConfig {
    /// JSON-lines files rotated every 100 MiB, keeping the 10 most recent.
    pub fn new<P: Into<PathBuf>>(folder: P, filename: &str) -> Self {
        Self {
            folder: folder.into(),
            filename: filename.into(),
            extension: "jsonl".into(),
            max_file_size: Some(100 * 1024 * 1024),
            max_lines: None,
            rotate_every: None,
            max_files: 10,
            max_age: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_file_size.is_none() && self.max_lines.is_none() && self.rotate_every.is_none()
        {
            return Err(Error::Configuration(
                "at least one of max_file_size, max_lines or rotate_every must be set".into(),
            ));
        }
        if let Some(max_size) = self.max_file_size {
            if max_size < limits::MIN_FILE_SIZE {
                return Err(Error::Configuration(format!(
                    "max_file_size must be at least {} bytes",
                    limits::MIN_FILE_SIZE
                )));
            }
        }
        if let Some(max_lines) = self.max_lines {
            if max_lines < limits::MIN_LINES {
                return Err(Error::Configuration(format!(
                    "max_lines must be at least {}",
                    limits::MIN_LINES
                )));
            }
        }
        if let Some(every) = self.rotate_every {
            if every.as_millis() < limits::MIN_ROTATION_DURATION_MS as u128 {
                return Err(Error::Configuration(format!(
                    "rotate_every must be at least {} ms",
                    limits::MIN_ROTATION_DURATION_MS
                )));
            }
        }
        if self.max_files < 1 {
            return Err(Error::Configuration("max_files must be at least 1".into()));
        }
        Ok(())
    }
}

/// A log file writer that starts a new timestamped file on size, line count
/// or age, and prunes old files.
pub struct RotatingFile {
    config: RotationConfig,
    current_file: BufWriter<File>,
    current_lines: u64,
    current_size: u64,
    file_opened_at: Instant,
}

impl RotatingFile {
    pub fn new(config: RotationConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.folder).map_err(|source| Error::CreateDirectory {
            path: config.folder.clone(),
            source,
        })?;
        let (current_file, current_size) =
            open_timestamped_file(&config.folder, &config.filename, &config.extension)?;
        Ok(Self {
            config,
            current_file,
            current_lines: 0,
            current_size,
            file_opened_at: Instant::now(),
        })
    }

    fn should_rotate(&self) -> bool {
        if let Some(max_lines) = self.config.max_lines {
            if self.current_lines >= max_lines {
                return true;
            }
        }
        if let Some(max_size) = self.config.max_file_size {
            if self.current_size >= max_size {
                return true;
            }
        }
        if let Some(every) = self.config.rotate_every {
            if self.file_opened_at.elapsed() >= every {
                return true;
            }
        }
        false
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.current_file.flush()?;
        let (new_file, size) = open_timestamped_file(
            &self.config.folder,
            &self.config.filename,
            &self.config.extension,
        )?;
        self.current_file = new_file;
        self.current_lines = 0;
        self.current_size = size;
        self.file_opened_at = Instant::now();
        self.cleanup();
        Ok(())
    }

    /// Retention runs after a rotation. Failures to delete are ignored: the
    /// next rotation retries.
    fn cleanup(&self) {
        let mut files = self.rotated_files();
        if let Some(max_age) = self.config.max_age {
            let now = Utc::now();
            files.retain(|(path, written_at)| {
                let expired = (now - *written_at)
                    .to_std()
                    .is_ok_and(|age| age > max_age);
                if expired {
                    let _ = fs::remove_file(path);
                }
                !expired
            });
        }
        // Sorted lexicographically, which is chronological given the naming.
        while files.len() > self.config.max_files as usize {
            let (oldest, _) = files.remove(0);
            let _ = fs::remove_file(oldest);
        }
    }

    fn rotated_files(&self) -> Vec<(PathBuf, chrono::DateTime<Utc>)> {
        let Ok(entries) = fs::read_dir(&self.config.folder) else {
            return Vec::new();
        };
        let prefix = format!("{}_", self.config.filename);
        let suffix = format!(".{}", self.config.extension);
        let mut files: Vec<_> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let timestamp = name.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
                let written_at =
                    chrono::NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;
                Some((entry.path(), written_at.and_utc()))
            })
            .collect();
        files.sort();
        files
    }
}

impl LogWriter for RotatingFile {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        if self.should_rotate() {
            self.rotate()?;
        }
        writeln!(self.current_file, "{line}")?;
        self.current_lines += 1;
        self.current_size += line.len() as u64 + 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.current_file.flush()?;
        self.current_file.get_ref().sync_data()
    }
}

fn open_timestamped_file(
    folder: &Path,
    filename: &str,
    extension: &str,
) -> io::Result<(BufWriter<File>, u64)> {
    let timestamp = Utc::now().format(TIMESTAMP_FORMAT);
    let file = open_append(&folder.join(format!("{filename}_{timestamp}.{extension}")))?;
    let size = file.metadata()?.len();
    Ok((
        BufWriter::with_capacity(DUOLOG_CONFIG.BUFFER_CAPACITY, file),
        size,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn config(folder: &Path) -> RotationConfig {
        RotationConfig {
            folder: folder.to_path_buf(),
            filename: "app".into(),
            extension: "log".into(),
            max_file_size: None,
            max_lines: None,
            rotate_every: None,
            max_files: 20,
            max_age: None,
        }
    }

    fn log_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                if name.starts_with("app_") && name.ends_with(".log") {
                    Some(e.path())
                } else {
                    None
                }
            })
            .collect();
        files.sort();
        files
    }

    fn read_all_log_content(dir: &Path) -> String {
        log_files(dir)
            .into_iter()
            .map(|f| fs::read_to_string(f).unwrap())
            .collect()
    }

    #[test]
    fn test_rotation_by_interval_creates_multiple_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RotatingFile::new(RotationConfig {
            rotate_every: Some(Duration::from_millis(50)),
            ..config(dir.path())
        })
        .unwrap();

        writer.write_line("line1").unwrap();
        writer.flush().unwrap();
        assert_eq!(log_files(dir.path()).len(), 1);

        thread::sleep(Duration::from_millis(60));
        writer.write_line("line2").unwrap();
        writer.flush().unwrap();
        assert_eq!(log_files(dir.path()).len(), 2);

        thread::sleep(Duration::from_millis(60));
        writer.write_line("line3").unwrap();
        writer.flush().unwrap();
        assert_eq!(log_files(dir.path()).len(), 3);

        let content = read_all_log_content(dir.path());
        assert_eq!(content, "line1\nline2\nline3\n");
    }

    #[test]
    fn test_rotation_by_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RotatingFile::new(RotationConfig {
            max_lines: Some(3),
            ..config(dir.path())
        })
        .unwrap();

        for i in 0..9 {
            thread::sleep(Duration::from_millis(1));
            writer.write_line(&format!("line{i}")).unwrap();
        }
        writer.flush().unwrap();

        assert_eq!(log_files(dir.path()).len(), 3);
        let content = read_all_log_content(dir.path());
        for i in 0..9 {
            assert!(content.contains(&format!("line{i}")));
        }
    }

    #[test]
    fn test_rotation_by_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RotatingFile::new(RotationConfig {
            max_file_size: Some(1024),
            ..config(dir.path())
        })
        .unwrap();

        // ~100 bytes per line, 30 lines: at least 3 files.
        for i in 0..30 {
            thread::sleep(Duration::from_millis(1));
            writer
                .write_line(&format!(
                    "line{i:03} padding to make this line about one hundred bytes long............."
                ))
                .unwrap();
        }
        writer.flush().unwrap();

        let file_count = log_files(dir.path()).len();
        assert!(
            file_count >= 3,
            "expected >= 3 files from file-size rotation, got {file_count}"
        );
        let content = read_all_log_content(dir.path());
        for i in 0..30 {
            assert!(content.contains(&format!("line{i:03}")));
        }
    }

    #[test]
    fn test_rotation_lines_trigger_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RotatingFile::new(RotationConfig {
            max_file_size: Some(10240),
            max_lines: Some(2),
            ..config(dir.path())
        })
        .unwrap();

        for i in 0..6 {
            thread::sleep(Duration::from_millis(1));
            writer.write_line(&format!("short{i}")).unwrap();
        }
        writer.flush().unwrap();

        assert_eq!(log_files(dir.path()).len(), 3);
    }

    #[test]
    fn test_cleanup_keeps_max_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RotatingFile::new(RotationConfig {
            max_lines: Some(1),
            max_files: 3,
            ..config(dir.path())
        })
        .unwrap();

        for i in 0..6 {
            thread::sleep(Duration::from_millis(2));
            writer.write_line(&format!("line{i}")).unwrap();
        }
        writer.flush().unwrap();

        let files = log_files(dir.path());
        assert_eq!(files.len(), 3);
        // The newest file is the one being written and is never pruned.
        assert_eq!(fs::read_to_string(files.last().unwrap()).unwrap(), "line5\n");
    }

    #[test]
    fn test_cleanup_removes_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path()).unwrap();
        let old_file = dir.path().join("app_20200101000000000000.log");
        File::create(&old_file).unwrap();
        let unrelated = dir.path().join("other_20200101000000000000.log");
        File::create(&unrelated).unwrap();

        let mut writer = RotatingFile::new(RotationConfig {
            max_lines: Some(1),
            max_age: Some(Duration::from_secs(3600)),
            ..config(dir.path())
        })
        .unwrap();

        writer.write_line("line1").unwrap();
        thread::sleep(Duration::from_millis(2));
        writer.write_line("line2").unwrap();
        writer.flush().unwrap();

        assert!(!old_file.exists());
        assert!(unrelated.exists());
        assert_eq!(log_files(dir.path()).len(), 2);
    }

    #[test]
    fn test_creates_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut writer = RotatingFile::new(RotationConfig {
            max_lines: Some(10),
            ..config(&nested)
        })
        .unwrap();
        writer.write_line("hello").unwrap();
        writer.flush().unwrap();
        assert_eq!(read_all_log_content(&nested), "hello\n");
    }

    #[test]
    fn test_validation_no_rotation_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let result = RotatingFile::new(config(dir.path()));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_validation_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let result = RotatingFile::new(RotationConfig {
            max_file_size: Some(100),
            ..config(dir.path())
        });
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_validation_max_lines() {
        let dir = tempfile::tempdir().unwrap();
        let result = RotatingFile::new(RotationConfig {
            max_lines: Some(0),
            ..config(dir.path())
        });
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_validation_interval() {
        let dir = tempfile::tempdir().unwrap();
        let result = RotatingFile::new(RotationConfig {
            rotate_every: Some(Duration::from_millis(1)),
            ..config(dir.path())
        });
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_validation_max_files() {
        let dir = tempfile::tempdir().unwrap();
        let result = RotatingFile::new(RotationConfig {
            max_lines: Some(5),
            max_files: 0,
            ..config(dir.path())
        });
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
