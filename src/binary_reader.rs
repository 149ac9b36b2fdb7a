use debug_print::*;
use std::fs::File;
use std::io::{self, BufRead, Read};

/// Byte source for raw pictures: stdin, a file or a slice.
pub struct BinaryReader<'a> {
    input: Box<dyn BufRead + 'a>,
    bytes_read: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn standard(stdin: &'a io::Stdin) -> BinaryReader<'a> {
        BinaryReader {
            input: Box::new(stdin.lock()),
            bytes_read: 0,
        }
    }

    pub fn file(path: &str) -> io::Result<BinaryReader<'a>> {
        File::open(path).map(|file| BinaryReader {
            input: Box::new(io::BufReader::new(file)),
            bytes_read: 0,
        })
    }

    pub fn vec(v: &'a [u8]) -> BinaryReader<'a> {
        BinaryReader {
            input: Box::new(v),
            bytes_read: 0,
        }
    }

    /// Fills `buf` completely. Returns `Ok(false)` when the input ended
    /// before the first byte, and an `UnexpectedEof` error when it ended
    /// part way.
    pub fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<bool> {
        let len = buf.len();
        let mut read_bytes = 0;
        while read_bytes < len {
            match self.input.read(&mut buf[read_bytes..]) {
                Ok(0) => break,
                Ok(s) => read_bytes += s,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.bytes_read += read_bytes;
        debug_eprintln!("read {} of {} bytes", read_bytes, len);
        if read_bytes == 0 && len > 0 {
            Ok(false)
        } else if read_bytes < len {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated picture: {read_bytes} of {len} bytes"),
            ))
        } else {
            Ok(true)
        }
    }

    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }
}

impl<'a> Read for BinaryReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.input.read(buf)?;
        self.bytes_read += n;
        Ok(n)
    }
}
