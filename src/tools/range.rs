//! Adaptive range coder over 64-bit registers.
//! This is used by the `lzrc` module.  Each symbol narrows `[low,low+range)`
//! in proportion to its model frequency; settled top bytes are emitted as
//! they stabilize, and the model is bumped after every symbol so the
//! decoder can stay in lockstep with identical updates.

use crate::Error;
use crate::stream::{ByteSink,ByteSource};
use crate::tools::model::Model;

/// Straddle threshold.  Must exceed any model total, so that the encoder
/// and decoder can run the identical test on identical state no matter
/// which models the neighboring symbols use.
const RENORM_FLOOR: u64 = 1 << 57;

pub struct RangeCoder {
    low: u64,
    range: u64,
    code: u64
}

impl RangeCoder {
    pub fn new() -> Self {
        Self {
            low: 0,
            range: u64::MAX,
            code: 0
        }
    }
    /// the top byte has settled when low and low+range-ish agree on it
    fn settled(&self) -> bool {
        (self.low >> 56) == (self.low.wrapping_add(self.range) >> 56)
    }
    fn emit<S: ByteSink>(&mut self,sink: &mut S) -> Result<(),Error> {
        sink.put((self.low >> 56) as u8)?;
        self.low <<= 8;
        self.range <<= 8;
        Ok(())
    }
    fn consume<R: ByteSource>(&mut self,src: &mut R) -> Result<(),Error> {
        let byte = src.get()?;
        self.code = (self.code << 8).wrapping_add(byte as u64);
        self.low <<= 8;
        self.range <<= 8;
        Ok(())
    }
    /// Encode one symbol under the given model, bumping the model afterwards.
    pub fn encode<S: ByteSink>(&mut self,pm: &mut Model,sym: usize,sink: &mut S) -> Result<(),Error> {
        if self.range < RENORM_FLOOR {
            // low straddles a byte boundary; force two bytes out and restart
            // the range below it, mirrored exactly by the decoder
            self.emit(sink)?;
            self.emit(sink)?;
            self.range = u64::MAX - self.low;
        }
        let total = pm.total();
        let start = pm.cumulative(sym);
        let size = pm.freq(sym);
        self.range /= total;
        self.low += start * self.range;
        self.range *= size;
        pm.update(sym,1);
        while self.settled() {
            self.emit(sink)?;
        }
        Ok(())
    }
    /// Decode one symbol under the given model, bumping the model afterwards.
    pub fn decode<R: ByteSource>(&mut self,pm: &mut Model,src: &mut R) -> Result<usize,Error> {
        if self.range < RENORM_FLOOR {
            self.consume(src)?;
            self.consume(src)?;
            self.range = u64::MAX - self.low;
        }
        let total = pm.total();
        if total == 0 {
            return Err(Error::InvalidArgument);
        }
        let step = self.range / total;
        if step == 0 {
            return Err(Error::IllegalSequence);
        }
        let sum = self.code.wrapping_sub(self.low) / step;
        let sym = match pm.index_of(sum) {
            Some(s) => s,
            None => return Err(Error::IllegalSequence)
        };
        let size = pm.freq(sym);
        if size == 0 {
            return Err(Error::IllegalSequence);
        }
        let start = pm.cumulative(sym);
        self.range = step;
        self.low += start * self.range;
        self.range *= size;
        pm.update(sym,1);
        while self.settled() {
            self.consume(src)?;
        }
        Ok(sym)
    }
    /// Shift out whatever is left in `low`; always 8 bytes so the decoder's
    /// code register never starves.
    pub fn flush<S: ByteSink>(&mut self,sink: &mut S) -> Result<(),Error> {
        for _i in 0..8 {
            self.range = u64::MAX;
            self.emit(sink)?;
        }
        Ok(())
    }
    /// Fill the code register before the first `decode`.
    pub fn preload<R: ByteSource>(&mut self,src: &mut R) -> Result<(),Error> {
        self.code = 0;
        for _i in 0..8 {
            self.code = (self.code << 8) + src.get()? as u64;
        }
        Ok(())
    }
}

#[cfg(test)]
use crate::stream::SliceSource;

#[test]
fn symbol_round_trip() {
    let syms: Vec<usize> = vec![3,3,3,1,0,255,254,3,3,17,0,0,0,3];
    let mut enc = RangeCoder::new();
    let mut pm = Model::new(256);
    let mut buf: Vec<u8> = Vec::new();
    for s in &syms {
        enc.encode(&mut pm,*s,&mut buf).unwrap();
    }
    enc.flush(&mut buf).unwrap();
    let mut dec = RangeCoder::new();
    let mut pm = Model::new(256);
    let mut src = SliceSource::new(&buf);
    dec.preload(&mut src).unwrap();
    for s in &syms {
        assert_eq!(dec.decode(&mut pm,&mut src).unwrap(),*s);
    }
}

#[test]
fn round_trip_across_models() {
    // alternate between differently shaped models, as the driver does
    let mut enc = RangeCoder::new();
    let mut flag = Model::new(2);
    let mut byte = Model::new(256);
    let mut buf: Vec<u8> = Vec::new();
    let data: Vec<usize> = (0..2000).map(|i| (i * 37) % 256).collect();
    for b in &data {
        enc.encode(&mut flag,*b & 1,&mut buf).unwrap();
        enc.encode(&mut byte,*b,&mut buf).unwrap();
    }
    enc.flush(&mut buf).unwrap();
    let mut dec = RangeCoder::new();
    let mut flag = Model::new(2);
    let mut byte = Model::new(256);
    let mut src = SliceSource::new(&buf);
    dec.preload(&mut src).unwrap();
    for b in &data {
        assert_eq!(dec.decode(&mut flag,&mut src).unwrap(),*b & 1);
        assert_eq!(dec.decode(&mut byte,&mut src).unwrap(),*b);
    }
}

#[test]
fn skewed_model_round_trip() {
    // drive one model hard so renormalization and straddle resets both fire
    let mut enc = RangeCoder::new();
    let mut pm = Model::new(2);
    let mut buf: Vec<u8> = Vec::new();
    let bits: Vec<usize> = (0..5000).map(|i| usize::from(i % 41 == 0)).collect();
    for b in &bits {
        enc.encode(&mut pm,*b,&mut buf).unwrap();
    }
    enc.flush(&mut buf).unwrap();
    assert!(buf.len() < bits.len() / 2);
    let mut dec = RangeCoder::new();
    let mut pm = Model::new(2);
    let mut src = SliceSource::new(&buf);
    dec.preload(&mut src).unwrap();
    for b in &bits {
        assert_eq!(dec.decode(&mut pm,&mut src).unwrap(),*b);
    }
}
