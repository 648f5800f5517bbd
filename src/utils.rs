use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Lazy, single-pass reader over a wordlist: one value per line, trimmed,
/// blank lines skipped. Bytes that are not valid UTF-8 are replaced with
/// U+FFFD instead of failing the line; only real I/O errors are yielded.
pub struct WordlistLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> WordlistLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for WordlistLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&self.buf);
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        return Some(Ok(trimmed.to_string()));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub fn open_wordlist<P: AsRef<Path>>(path: P) -> io::Result<WordlistLines<BufReader<File>>> {
    let file = File::open(path.as_ref())?;
    Ok(WordlistLines::new(BufReader::new(file)))
}

/// Fails when `path` is missing or is not a regular file.
pub fn ensure_readable_file<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let meta = std::fs::metadata(path.as_ref())?;
    if !meta.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' is not a regular file", path.as_ref().display()),
        ));
    }
    File::open(path.as_ref()).map(|_| ())
}
