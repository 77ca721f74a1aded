//! LZ compression with adaptive range coding.
//!
//! This is the recommended back end.  Every token is entropy coded under a
//! dedicated probability model: a two-symbol literal/reference flag, the
//! literal byte, the match length, the bit count of the distance, and one
//! two-symbol model per distance bit position.  All models adapt after
//! every symbol, and the decoder applies the identical updates, so the
//! stream carries no code tables at all.
//!
//! A match length symbol of 255 (one past the longest legal match) marks
//! the end of the stream; the coder then flushes its final eight bytes.

use crate::{Error,ExpandFailure,Options};
use crate::stream::{ByteSink,ByteSource,CountingSink,SliceSource};
use crate::tools::model::Model;
use crate::tools::range::RangeCoder;
use crate::tools::match_finder::{scan_window,Match,SeqTree};

/// minimum string length that will be tokenized
const MIN_MATCH: usize = 3;
/// longest legal match, leaving 255 free as the stream terminator
const MAX_MATCH: usize = 254;
const END_OF_STREAM: usize = 255;

/// One probability model per token context.  Encoder and decoder build
/// this identically so their adaptive updates stay in lockstep.
struct Models {
    literal: Model,
    size: Model,
    byte: Model,
    bits: Model,
    dist: Vec<Model>
}

impl Models {
    fn new() -> Self {
        Self {
            literal: Model::new(2),
            size: Model::new(256),
            byte: Model::new(256),
            bits: Model::new(32),
            dist: (0..32).map(|_| Model::new(2)).collect()
        }
    }
}

fn bit_len(dist: usize) -> usize {
    let mut i = dist;
    let mut bits = 0;
    while i > 0 {
        i >>= 1;
        bits += 1;
    }
    bits
}

/// A short match far away costs more to encode than its literals.
fn reject(len: usize,bits: usize) -> bool {
    len <= MIN_MATCH && bits > 8
}

/// Main compression function.  Emits coder bytes to `sink` and returns how
/// many were written.  The stream is self delimiting; no header is added
/// (see the `container` module for framing).
pub fn compress<S: ByteSink>(input: &[u8],sink: &mut S,opt: &Options) -> Result<u64,Error> {
    let window = opt.checked_window()?;
    if input.len() as u64 > i64::MAX as u64 {
        return Err(Error::TooBig);
    }
    let mut out = CountingSink::new(sink);
    let mut rc = RangeCoder::new();
    let mut pm = Models::new();
    let mut index = match opt.accel {
        true => Some(SeqTree::create(window,MAX_MATCH)?),
        false => None
    };
    let mut i = 0;
    while i < input.len() {
        let found = match &index {
            Some(tree) => tree.find(input,i,MIN_MATCH),
            None => scan_window(input,i,window,MIN_MATCH,MAX_MATCH)
        };
        let Match { mut len, dist } = found.unwrap_or(Match { len: 0, dist: 0 });
        let bits = bit_len(dist);
        if reject(len,bits) {
            log::trace!("reject {}:{} at {}",dist,len,i);
            len = 0;
        }
        let next = match len >= MIN_MATCH {
            true => {
                rc.encode(&mut pm.literal,0,&mut out)?;
                rc.encode(&mut pm.size,len,&mut out)?;
                rc.encode(&mut pm.bits,bits,&mut out)?;
                // the top bit of the distance is implicit
                let mut d = dist;
                for b in 0..bits-1 {
                    rc.encode(&mut pm.dist[b],d & 1,&mut out)?;
                    d >>= 1;
                }
                i + len
            },
            false => {
                rc.encode(&mut pm.literal,1,&mut out)?;
                rc.encode(&mut pm.byte,input[i] as usize,&mut out)?;
                i + 1
            }
        };
        if let Some(tree) = &mut index {
            for p in i..next {
                tree.insert(input,p);
                if p + 1 >= window {
                    tree.evict(input,p + 1 - window);
                }
            }
        }
        i = next;
    }
    rc.encode(&mut pm.literal,0,&mut out)?;
    rc.encode(&mut pm.size,END_OF_STREAM,&mut out)?;
    rc.flush(&mut out)?;
    log::debug!("compressed {} bytes into {}",input.len(),out.written());
    Ok(out.written())
}

/// Main decompression function.  Reads coder bytes from `src` and fills
/// `output` until the end-of-stream token; returns the number of bytes
/// written.  On failure the count of bytes successfully written rides
/// along in the error.
pub fn expand<R: ByteSource>(src: &mut R,output: &mut [u8]) -> Result<usize,ExpandFailure> {
    let mut written = 0;
    match run_expand(src,output,&mut written) {
        Ok(()) => Ok(written),
        Err(source) => Err(ExpandFailure { written, source })
    }
}

fn run_expand<R: ByteSource>(src: &mut R,output: &mut [u8],written: &mut usize) -> Result<(),Error> {
    let mut rc = RangeCoder::new();
    let mut pm = Models::new();
    rc.preload(src)?;
    loop {
        let flag = rc.decode(&mut pm.literal,src)?;
        if flag == 1 {
            if *written >= output.len() {
                return Err(Error::NoSpace);
            }
            output[*written] = rc.decode(&mut pm.byte,src)? as u8;
            *written += 1;
            continue;
        }
        let len = rc.decode(&mut pm.size,src)?;
        if len == END_OF_STREAM {
            return Ok(());
        }
        if len < MIN_MATCH || len > MAX_MATCH {
            return Err(Error::IllegalSequence);
        }
        let bits = rc.decode(&mut pm.bits,src)?;
        if bits == 0 || bits > 16 {
            return Err(Error::IllegalSequence);
        }
        let mut dist = 0;
        for b in 0..bits-1 {
            dist |= rc.decode(&mut pm.dist[b],src)? << b;
        }
        dist |= 1 << (bits - 1);
        if dist > *written {
            return Err(Error::Range);
        }
        if *written + len > output.len() {
            return Err(Error::NoSpace);
        }
        // One byte at a time on purpose: when distance < length the copy
        // source overlaps the destination and the run feeds itself.
        for k in *written..*written + len {
            output[k] = output[k - dist];
        }
        *written += len;
    }
}

/// Convenience function, calls `compress` returning a new Vec
pub fn compress_slice(input: &[u8],opt: &Options) -> Result<Vec<u8>,Error> {
    let mut ans: Vec<u8> = Vec::new();
    compress(input,&mut ans,opt)?;
    Ok(ans)
}

/// Convenience function, calls `expand` with a slice and an output capacity
pub fn expand_slice(data: &[u8],capacity: usize) -> Result<Vec<u8>,ExpandFailure> {
    let mut src = SliceSource::new(data);
    let mut ans = vec![0;capacity];
    let written = expand(&mut src,&mut ans)?;
    ans.truncate(written);
    Ok(ans)
}

// *************** TESTS *****************

#[cfg(test)]
fn rc_options(window: usize,accel: bool) -> Options {
    Options {
        window,
        backend: crate::Backend::RangeCoder,
        accel
    }
}

#[cfg(test)]
fn assert_round_trip(data: &[u8],opt: &Options) -> Vec<u8> {
    let compressed = compress_slice(data,opt).expect("compression failed");
    let expanded = expand_slice(&compressed,data.len()).expect("expansion failed");
    assert_eq!(data.to_vec(),expanded);
    compressed
}

#[test]
fn empty_input() {
    let opt = rc_options(1024,false);
    let compressed = assert_round_trip(&[],&opt);
    // nothing but the coder flush and at most a straddle pair
    assert!(compressed.len() >= 8 && compressed.len() <= 12);
}

#[test]
fn single_byte() {
    assert_round_trip(&[0x42],&rc_options(1024,false));
    assert_round_trip(&[0x00],&rc_options(1024,true));
}

#[test]
fn hello_world() {
    let data = "Hello World Hello.World Hello World".as_bytes();
    assert_eq!(data.len(),35);
    let opt = rc_options(1024,false);
    let compressed = assert_round_trip(data,&opt);
    assert!(compressed.len() <= data.len(),
        "{} did not shrink below {}",compressed.len(),data.len());
    // the repeats must be visible to the finder as acceptable matches
    let m = scan_window(data,12,1024,MIN_MATCH,MAX_MATCH).unwrap();
    assert!(m.len >= 5 && !reject(m.len,bit_len(m.dist)));
    let m = scan_window(data,18,1024,MIN_MATCH,MAX_MATCH).unwrap();
    assert_eq!(m.len,11);
    assert!(!reject(m.len,bit_len(m.dist)));
}

#[test]
fn zeros_compress_tightly() {
    let data = vec![0u8;4096];
    let opt = rc_options(1024,false);
    let compressed = assert_round_trip(&data,&opt);
    assert!(compressed.len() <= 40,"zeros took {} bytes",compressed.len());
    // driver behavior: one literal, then the run folds onto itself
    let m = scan_window(&data,1,1024,MIN_MATCH,MAX_MATCH).unwrap();
    assert_eq!(m,Match { len: MAX_MATCH, dist: 1 });
}

#[test]
fn pattern_overlap_expansion() {
    let data: Vec<u8> = (0..4096).map(|i| [1u8,2,3,4][i % 4]).collect();
    let opt = rc_options(1024,false);
    let compressed = assert_round_trip(&data,&opt);
    assert!(compressed.len() < 60,"pattern took {} bytes",compressed.len());
    let m = scan_window(&data,4,1024,MIN_MATCH,MAX_MATCH).unwrap();
    assert_eq!(m,Match { len: MAX_MATCH, dist: 4 });
}

#[test]
fn ascending_bytes() {
    let data: Vec<u8> = (0..=255u8).collect();
    assert_round_trip(&data,&rc_options(1024,false));
}

#[test]
fn text_round_trips_at_all_windows() {
    let mut data = Vec::new();
    while data.len() < 30000 {
        data.extend_from_slice(b"What can be squeezed may also be unsqueezed, said no one in particular. ");
        data.push((data.len() % 251) as u8);
    }
    for bits in [10,12,16] {
        let opt = rc_options(1 << bits,false);
        let compressed = assert_round_trip(&data,&opt);
        assert!(compressed.len() < data.len() / 2);
    }
}

#[test]
fn accelerated_stream_is_identical() {
    let mut data = Vec::new();
    while data.len() < 20000 {
        data.extend_from_slice(b"abracadabra alakazam ");
        data.extend_from_slice(&[0,0,0,0,0,1,2,3]);
    }
    let linear = compress_slice(&data,&rc_options(4096,false)).unwrap();
    let accel = compress_slice(&data,&rc_options(4096,true)).unwrap();
    assert_eq!(linear,accel);
    let expanded = expand_slice(&accel,data.len()).unwrap();
    assert_eq!(data,expanded);
}

#[test]
fn random_data_stays_bounded() {
    use rand::{Rng,SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xD1CE);
    let data: Vec<u8> = (0..65536).map(|_| rng.gen()).collect();
    let opt = rc_options(1024,true);
    let compressed = assert_round_trip(&data,&opt);
    // incompressible input must not blow up
    assert!(compressed.len() < data.len() + data.len() / 8 + 64);
}

#[test]
fn window_is_validated() {
    let opt = rc_options(512,false);
    assert!(matches!(compress_slice(&[1,2,3],&opt),Err(Error::InvalidArgument)));
    let opt = rc_options(3000,false);
    assert!(matches!(compress_slice(&[1,2,3],&opt),Err(Error::InvalidArgument)));
    let opt = rc_options(1 << 17,false);
    assert!(matches!(compress_slice(&[1,2,3],&opt),Err(Error::InvalidArgument)));
    let opt = rc_options(1 << 16,false);
    assert!(compress_slice(&[1,2,3],&opt).is_ok());
}

#[test]
fn failing_sink_stops_compression() {
    struct FailAfter {
        limit: usize,
        attempts: usize
    }
    impl ByteSink for FailAfter {
        fn put(&mut self,_byte: u8) -> Result<(),Error> {
            self.attempts += 1;
            if self.attempts > self.limit {
                return Err(Error::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)));
            }
            Ok(())
        }
    }
    let data = vec![0u8;4096];
    for limit in [0,1,5] {
        let mut sink = FailAfter { limit, attempts: 0 };
        let r = compress(&data,&mut sink,&rc_options(1024,false));
        assert!(matches!(r,Err(Error::Io(_))));
        // the failing put is the last one attempted
        assert_eq!(sink.attempts,limit + 1);
    }
}

#[test]
fn truncated_stream_reports_progress() {
    let data = b"squeeze squeeze squeeze squeeze squeeze".to_vec();
    let compressed = compress_slice(&data,&rc_options(1024,false)).unwrap();
    // the decoder consumes every stream byte, so losing the last one is
    // always detected
    let cut = &compressed[0..compressed.len()-1];
    let err = expand_slice(cut,data.len()).unwrap_err();
    assert!(matches!(err.source,Error::Truncated));
    assert!(err.written <= data.len());
}

#[test]
fn small_output_buffer_is_no_space() {
    let data = vec![9u8;100];
    let compressed = compress_slice(&data,&rc_options(1024,false)).unwrap();
    let err = expand_slice(&compressed,10).unwrap_err();
    assert!(matches!(err.source,Error::NoSpace));
    assert!(err.written <= 10);
}
