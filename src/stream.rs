//! Byte-at-a-time I/O contract used by both coder back ends.
//!
//! The codec core touches the outside world only through `ByteSink` and
//! `ByteSource`.  Framing, buffering, and checksums belong to the caller
//! (or to the `container` module).

use std::io::{Read,Write};
use crate::Error;

/// Receives coder output one byte at a time.
pub trait ByteSink {
    fn put(&mut self,byte: u8) -> Result<(),Error>;
}

/// Supplies coder input one byte at a time.
pub trait ByteSource {
    fn get(&mut self) -> Result<u8,Error>;
}

impl ByteSink for Vec<u8> {
    fn put(&mut self,byte: u8) -> Result<(),Error> {
        self.push(byte);
        Ok(())
    }
}

/// Source over a borrowed slice.  Exhaustion is reported as `Error::Truncated`,
/// which a well formed stream never hits (the coder knows where to stop).
pub struct SliceSource<'a> {
    buf: &'a [u8],
    ptr: usize
}

impl <'a> SliceSource<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, ptr: 0 }
    }
    /// bytes consumed so far
    pub fn consumed(&self) -> usize {
        self.ptr
    }
}

impl <'a> ByteSource for SliceSource<'a> {
    fn get(&mut self) -> Result<u8,Error> {
        match self.buf.get(self.ptr) {
            Some(byte) => {
                self.ptr += 1;
                Ok(*byte)
            },
            None => Err(Error::Truncated)
        }
    }
}

/// Sink over anything implementing `std::io::Write`
pub struct WriteSink<W: Write> {
    writer: W
}

impl <W: Write> WriteSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl <W: Write> ByteSink for WriteSink<W> {
    fn put(&mut self,byte: u8) -> Result<(),Error> {
        self.writer.write_all(&[byte])?;
        Ok(())
    }
}

/// Source over anything implementing `std::io::Read`
pub struct ReadSource<R: Read> {
    reader: R
}

impl <R: Read> ReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl <R: Read> ByteSource for ReadSource<R> {
    fn get(&mut self) -> Result<u8,Error> {
        let mut by: [u8;1] = [0];
        match self.reader.read_exact(&mut by) {
            Ok(()) => Ok(by[0]),
            Err(e) if e.kind()==std::io::ErrorKind::UnexpectedEof => Err(Error::Truncated),
            Err(e) => Err(Error::Io(e))
        }
    }
}

/// Sink wrapper counting the bytes that pass through it.
pub struct CountingSink<'a,S: ByteSink> {
    inner: &'a mut S,
    written: u64
}

impl <'a,S: ByteSink> CountingSink<'a,S> {
    pub fn new(inner: &'a mut S) -> Self {
        Self { inner, written: 0 }
    }
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl <'a,S: ByteSink> ByteSink for CountingSink<'a,S> {
    fn put(&mut self,byte: u8) -> Result<(),Error> {
        self.inner.put(byte)?;
        self.written += 1;
        Ok(())
    }
}

#[test]
fn slice_source_truncates() {
    let mut src = SliceSource::new(&[1,2]);
    assert_eq!(src.get().unwrap(),1);
    assert_eq!(src.get().unwrap(),2);
    assert!(matches!(src.get(),Err(Error::Truncated)));
    assert_eq!(src.consumed(),2);
}

#[test]
fn counting_sink_counts() {
    let mut buf: Vec<u8> = Vec::new();
    let mut sink = CountingSink::new(&mut buf);
    for b in 0..5 {
        sink.put(b).unwrap();
    }
    assert_eq!(sink.written(),5);
    assert_eq!(buf,vec![0,1,2,3,4]);
}
