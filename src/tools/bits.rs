//! Bit packing for the `lzhuff` back end.
//! Bits accumulate LSB-first in a 64-bit word; every full word is committed
//! to the byte sink as 8 little-endian bytes.  The final word is padded
//! with zero bits at flush, so a compressed stream is always a whole
//! number of 64-bit words after its header.

use crate::Error;
use crate::stream::{ByteSink,ByteSource};

pub struct BitWriter {
    b64: u64,
    bits: u32
}

impl BitWriter {
    pub fn new() -> Self {
        Self { b64: 0, bits: 0 }
    }
    pub fn put_bit<S: ByteSink>(&mut self,bit: u64,sink: &mut S) -> Result<(),Error> {
        self.b64 |= (bit & 1) << self.bits;
        self.bits += 1;
        if self.bits == 64 {
            for byte in self.b64.to_le_bytes() {
                sink.put(byte)?;
            }
            self.b64 = 0;
            self.bits = 0;
        }
        Ok(())
    }
    /// write `count` bits of `value`, least significant first
    pub fn put_bits<S: ByteSink>(&mut self,value: u64,count: u32,sink: &mut S) -> Result<(),Error> {
        for b in 0..count {
            self.put_bit(value >> b,sink)?;
        }
        Ok(())
    }
    /// pad the current word with zeros and commit it
    pub fn flush<S: ByteSink>(&mut self,sink: &mut S) -> Result<(),Error> {
        while self.bits > 0 {
            self.put_bit(0,sink)?;
        }
        Ok(())
    }
}

pub struct BitReader {
    b64: u64,
    bits: u32
}

impl BitReader {
    pub fn new() -> Self {
        Self { b64: 0, bits: 0 }
    }
    pub fn get_bit<R: ByteSource>(&mut self,src: &mut R) -> Result<u64,Error> {
        if self.bits == 0 {
            let mut word: [u8;8] = [0;8];
            for slot in word.iter_mut() {
                *slot = src.get()?;
            }
            self.b64 = u64::from_le_bytes(word);
            self.bits = 64;
        }
        let bit = self.b64 & 1;
        self.b64 >>= 1;
        self.bits -= 1;
        Ok(bit)
    }
    /// read `count` bits, least significant first
    pub fn get_bits<R: ByteSource>(&mut self,count: u32,src: &mut R) -> Result<u64,Error> {
        let mut value = 0;
        for b in 0..count {
            value |= self.get_bit(src)? << b;
        }
        Ok(value)
    }
}

#[cfg(test)]
use crate::stream::SliceSource;

#[test]
fn word_alignment() {
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new();
    writer.put_bits(0b1011,4,&mut buf).unwrap();
    assert_eq!(buf.len(),0); // nothing committed until a word fills
    writer.flush(&mut buf).unwrap();
    assert_eq!(buf.len(),8);
    assert_eq!(buf[0],0b1011);
    assert_eq!(&buf[1..],&[0;7]);
}

#[test]
fn bit_round_trip() {
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new();
    writer.put_bits(0xDEADBEEF,32,&mut buf).unwrap();
    writer.put_bits(0x3,2,&mut buf).unwrap();
    writer.put_bits(0x1234567890ABCDEF,64,&mut buf).unwrap();
    writer.flush(&mut buf).unwrap();
    assert_eq!(buf.len() % 8,0);
    let mut src = SliceSource::new(&buf);
    let mut reader = BitReader::new();
    assert_eq!(reader.get_bits(32,&mut src).unwrap(),0xDEADBEEF);
    assert_eq!(reader.get_bits(2,&mut src).unwrap(),0x3);
    assert_eq!(reader.get_bits(64,&mut src).unwrap(),0x1234567890ABCDEF);
}

#[test]
fn truncation_is_reported() {
    let buf: Vec<u8> = vec![0xFF;4]; // not a whole word
    let mut src = SliceSource::new(&buf);
    let mut reader = BitReader::new();
    assert!(matches!(reader.get_bit(&mut src),Err(Error::Truncated)));
}
