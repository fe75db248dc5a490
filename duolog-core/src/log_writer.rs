use std::{
    fs::File,
    io::{self, BufWriter, Seek, SeekFrom, Write},
    path::Path,
};

use crate::config::DUOLOG_CONFIG;

/// Destination of encoded structured records, one line at a time.
pub trait LogWriter: Send {
    /// Writes `line` followed by a newline.
    fn write_line(&mut self, line: &str) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

impl<W: LogWriter + ?Sized> LogWriter for Box<W> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Appends to a single file, created if it does not exist.
pub struct LogFile {
    file: BufWriter<File>,
}

impl LogFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, io::Error> {
        let file = open_append(path.as_ref())?;
        Ok(Self {
            file: BufWriter::with_capacity(DUOLOG_CONFIG.BUFFER_CAPACITY, file),
        })
    }
}

impl LogWriter for LogFile {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.file, "{line}")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.get_ref().sync_data()
    }
}

/// Writes records to any stream: a pipe, stdout, an in-memory buffer.
pub struct LogStream<W> {
    stream: W,
}

impl<W: Write + Send> LogStream<W> {
    pub fn new(stream: W) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}

impl<W: Write + Send> LogWriter for LogStream<W> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        // One call per record so a shared stream never splits a line.
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        self.stream.write_all(buf.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

pub(crate) fn open_append(path: &Path) -> Result<File, io::Error> {
    let mut file = File::options()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    file.seek(SeekFrom::End(0))?;
    Ok(file)
}
