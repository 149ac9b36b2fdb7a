use std::fs::File;
use std::io::{self, Write};

/// Byte sink for the finished stream: stdout, a file or a vector.
pub struct BinaryWriter<'a> {
    output: Box<dyn Write + 'a>,
    bytes_written: usize,
}

impl<'a> BinaryWriter<'a> {
    pub fn standard(stdout: &'a io::Stdout) -> BinaryWriter<'a> {
        BinaryWriter {
            output: Box::new(stdout.lock()),
            bytes_written: 0,
        }
    }

    pub fn file(path: &str) -> io::Result<BinaryWriter<'a>> {
        File::create(path).map(|file| BinaryWriter {
            output: Box::new(io::BufWriter::new(file)),
            bytes_written: 0,
        })
    }

    pub fn vec(v: &'a mut Vec<u8>) -> BinaryWriter<'a> {
        BinaryWriter {
            output: Box::new(v),
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}

impl<'a> Write for BinaryWriter<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.output.write(buf)?;
        self.bytes_written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}
