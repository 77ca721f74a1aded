//! LZ compression with adaptive Huffman coding.
//!
//! This is the legacy back end.  Literal bytes and match lengths share one
//! code tree (lengths ride on Deflate-style symbols 257..=285 with extra
//! bits), distances use a second tree over the 30 Deflate distance codes
//! with their own extra bits.  Both trees start empty: the first use of a
//! symbol is announced through the not-yet-transmitted escape followed by
//! the raw symbol index, after which the tree adapts on every occurrence.
//!
//! The stream starts with the original byte count as a 64-bit little
//! endian word and the window width as 8 bits; the bit stream that follows
//! is packed LSB-first into 64-bit words (see `tools::bits`).  The decoder
//! stops at the header length, so no terminator symbol is needed.

use crate::{Error,ExpandFailure,Options};
use crate::stream::{ByteSink,ByteSource,CountingSink,SliceSource};
use crate::tools::bits::{BitReader,BitWriter};
use crate::tools::huff_tree::HuffTree;
use crate::tools::match_finder::{scan_window,Match,SeqTree};

const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 258;

// literal/length tree: 512 leaves
const LIT_LEAVES: usize = 512;
const LEN_SYM_BASE: usize = 257;
const LIT_NYT: usize = 286;

// distance tree: 32 leaves
const POS_LEAVES: usize = 32;
const POS_NYT: usize = 30;

/// length bases for symbols 257..=285
const LEN_BASE: [u16;29] = [
    3, 4, 5, 6, 7, 8, 9, 10,
    11, 13, 15, 17,
    19, 23, 27, 31,
    35, 43, 51, 59,
    67, 83, 99, 115,
    131, 163, 195, 227, 258
];

/// extra bits carried after each length symbol
const LEN_EXTRA: [u8;29] = [
    0, 0, 0, 0, 0, 0, 0, 0,
    1, 1, 1, 1,
    2, 2, 2, 2,
    3, 3, 3, 3,
    4, 4, 4, 4,
    5, 5, 5, 5, 0
];

/// distance bases for codes 0..=29
const POS_BASE: [u16;30] = [
    1, 2, 3, 4,
    5, 7,
    9, 13,
    17, 25,
    33, 49,
    65, 97,
    129, 193,
    257, 385,
    513, 769,
    1025, 1537,
    2049, 3073,
    4097, 6145,
    8193, 12289,
    16385, 24577
];

/// extra bits carried after each distance code
const POS_EXTRA: [u8;30] = [
    0, 0, 0, 0,
    1, 1,
    2, 2,
    3, 3,
    4, 4,
    5, 5,
    6, 6,
    7, 7,
    8, 8,
    9, 9,
    10, 10,
    11, 11,
    12, 12,
    13, 13
];

fn len_code(len: usize) -> usize {
    LEN_BASE.partition_point(|&b| (b as usize) <= len) - 1
}

fn pos_code(dist: usize) -> usize {
    POS_BASE.partition_point(|&b| (b as usize) <= dist) - 1
}

/// same break-even rule as the range-coder back end
fn reject(len: usize,dist: usize) -> bool {
    len <= MIN_MATCH && dist > 0xFF
}

/// Write one literal/length symbol, escaping through NYT on first use.
fn put_symbol<S: ByteSink>(tree: &mut HuffTree,nyt: usize,raw_bits: u32,sym: usize,
                           writer: &mut BitWriter,sink: &mut S) -> Result<(),Error> {
    if tree.seen(sym) {
        let (path,bits) = tree.path(sym);
        writer.put_bits(path,bits,sink)?;
        tree.bump(sym);
    } else {
        let (path,bits) = tree.path(nyt);
        writer.put_bits(path,bits,sink)?;
        tree.bump(nyt);
        writer.put_bits(sym as u64,raw_bits,sink)?;
        if !tree.insert(sym) {
            return Err(Error::TooBig);
        }
    }
    Ok(())
}

/// Walk the tree by stream bits down to a leaf, mirroring `put_symbol`'s
/// frequency update.  A raw escape payload is resolved by the caller.
fn get_symbol<R: ByteSource>(tree: &mut HuffTree,reader: &mut BitReader,src: &mut R) -> Result<usize,Error> {
    let mut ix = tree.root();
    while !tree.is_leaf(ix) {
        let bit = reader.get_bit(src)?;
        ix = tree.step(ix,bit);
        if ix < 0 {
            return Err(Error::IllegalSequence);
        }
    }
    let sym = ix as usize;
    tree.bump(sym);
    Ok(sym)
}

/// Main compression function.  Returns the number of bytes emitted.
pub fn compress<S: ByteSink>(input: &[u8],sink: &mut S,opt: &Options) -> Result<u64,Error> {
    let window = opt.checked_window()?;
    if input.len() as u64 > i64::MAX as u64 {
        return Err(Error::TooBig);
    }
    let mut out = CountingSink::new(sink);
    let mut writer = BitWriter::new();
    let mut lit = HuffTree::new(LIT_LEAVES,LIT_NYT);
    let mut pos = HuffTree::new(POS_LEAVES,POS_NYT);
    lit.insert(LIT_NYT);
    pos.insert(POS_NYT);
    let mut index = match opt.accel {
        true => Some(SeqTree::create(window,MAX_MATCH)?),
        false => None
    };
    writer.put_bits(input.len() as u64,64,&mut out)?;
    writer.put_bits(window.trailing_zeros() as u64,8,&mut out)?;
    let mut i = 0;
    while i < input.len() {
        let found = match &index {
            Some(tree) => tree.find(input,i,MIN_MATCH),
            None => scan_window(input,i,window,MIN_MATCH,MAX_MATCH)
        };
        let Match { mut len, dist } = found.unwrap_or(Match { len: 0, dist: 0 });
        if reject(len,dist) {
            log::trace!("reject {}:{} at {}",dist,len,i);
            len = 0;
        }
        let next = match len >= MIN_MATCH {
            true => {
                let code = len_code(len);
                put_symbol(&mut lit,LIT_NYT,9,LEN_SYM_BASE + code,&mut writer,&mut out)?;
                let extra = LEN_EXTRA[code] as u32;
                if extra > 0 {
                    writer.put_bits((len - LEN_BASE[code] as usize) as u64,extra,&mut out)?;
                }
                let code = pos_code(dist);
                put_symbol(&mut pos,POS_NYT,5,code,&mut writer,&mut out)?;
                let extra = POS_EXTRA[code] as u32;
                if extra > 0 {
                    writer.put_bits((dist - POS_BASE[code] as usize) as u64,extra,&mut out)?;
                }
                i + len
            },
            false => {
                put_symbol(&mut lit,LIT_NYT,9,input[i] as usize,&mut writer,&mut out)?;
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
    writer.flush(&mut out)?;
    log::debug!("compressed {} bytes into {}",input.len(),out.written());
    Ok(out.written())
}

/// Main decompression function; the mirror of `compress`.  Returns the
/// number of bytes written, which the stream header fixes in advance.
pub fn expand<R: ByteSource>(src: &mut R,output: &mut [u8]) -> Result<usize,ExpandFailure> {
    let mut written = 0;
    match run_expand(src,output,&mut written) {
        Ok(()) => Ok(written),
        Err(source) => Err(ExpandFailure { written, source })
    }
}

fn run_expand<R: ByteSource>(src: &mut R,output: &mut [u8],written: &mut usize) -> Result<(),Error> {
    let mut reader = BitReader::new();
    let expected = reader.get_bits(64,src)? as usize;
    let win_bits = reader.get_bits(8,src)?;
    if !(10..=15).contains(&win_bits) {
        return Err(Error::InvalidArgument);
    }
    if expected > output.len() {
        return Err(Error::NoSpace);
    }
    let mut lit = HuffTree::new(LIT_LEAVES,LIT_NYT);
    let mut pos = HuffTree::new(POS_LEAVES,POS_NYT);
    lit.insert(LIT_NYT);
    pos.insert(POS_NYT);
    while *written < expected {
        let mut sym = get_symbol(&mut lit,&mut reader,src)?;
        if sym == LIT_NYT {
            sym = reader.get_bits(9,src)? as usize;
            let valid = sym <= 0xFF || (LEN_SYM_BASE..LEN_SYM_BASE+29).contains(&sym);
            if !valid || lit.seen(sym) {
                return Err(Error::IllegalSequence);
            }
            if !lit.insert(sym) {
                return Err(Error::TooBig);
            }
        }
        if sym <= 0xFF {
            output[*written] = sym as u8;
            *written += 1;
            continue;
        }
        if !(LEN_SYM_BASE..LEN_SYM_BASE+29).contains(&sym) {
            return Err(Error::IllegalSequence);
        }
        let code = sym - LEN_SYM_BASE;
        let mut len = LEN_BASE[code] as usize;
        let extra = LEN_EXTRA[code] as u32;
        if extra > 0 {
            len += reader.get_bits(extra,src)? as usize;
        }
        let mut code = get_symbol(&mut pos,&mut reader,src)?;
        if code == POS_NYT {
            code = reader.get_bits(5,src)? as usize;
            if code >= 30 || pos.seen(code) {
                return Err(Error::IllegalSequence);
            }
            if !pos.insert(code) {
                return Err(Error::TooBig);
            }
        }
        if code >= 30 {
            return Err(Error::IllegalSequence);
        }
        let mut dist = POS_BASE[code] as usize;
        let extra = POS_EXTRA[code] as u32;
        if extra > 0 {
            dist += reader.get_bits(extra,src)? as usize;
        }
        if dist > *written {
            return Err(Error::Range);
        }
        if *written + len > expected {
            return Err(Error::NoSpace);
        }
        // byte at a time, the copy may overlap its own output
        for k in *written..*written + len {
            output[k] = output[k - dist];
        }
        *written += len;
    }
    Ok(())
}

/// Convenience function, calls `compress` returning a new Vec
pub fn compress_slice(input: &[u8],opt: &Options) -> Result<Vec<u8>,Error> {
    let mut ans: Vec<u8> = Vec::new();
    compress(input,&mut ans,opt)?;
    Ok(ans)
}

/// Convenience function; the output buffer is sized from the header.
pub fn expand_slice(data: &[u8]) -> Result<Vec<u8>,ExpandFailure> {
    let fail = |source| ExpandFailure { written: 0, source };
    if data.len() < 8 {
        return Err(fail(Error::Truncated));
    }
    // the length is bit-packed but lands exactly in the first LE word
    let expected = u64::from_le_bytes(data[0..8].try_into().unwrap());
    let expected = usize::try_from(expected).map_err(|_| fail(Error::TooBig))?;
    let mut ans: Vec<u8> = Vec::new();
    if ans.try_reserve_exact(expected).is_err() {
        return Err(fail(Error::NoMemory));
    }
    ans.resize(expected,0);
    let mut src = SliceSource::new(data);
    let written = expand(&mut src,&mut ans)?;
    ans.truncate(written);
    Ok(ans)
}

// *************** TESTS *****************

#[cfg(test)]
fn huff_options(window: usize,accel: bool) -> Options {
    Options {
        window,
        backend: crate::Backend::AdaptiveHuffman,
        accel
    }
}

#[cfg(test)]
fn assert_round_trip(data: &[u8],opt: &Options) -> Vec<u8> {
    let compressed = compress_slice(data,opt).expect("compression failed");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(data.to_vec(),expanded);
    compressed
}

#[test]
fn deflate_tables_are_consistent() {
    for len in MIN_MATCH..=MAX_MATCH {
        let code = len_code(len);
        let base = LEN_BASE[code] as usize;
        let extra = LEN_EXTRA[code] as usize;
        assert!(base <= len && len - base < (1 << extra).max(1),
            "len {} fell outside code {}",len,code);
    }
    for dist in 1..=32768usize {
        let code = pos_code(dist);
        let base = POS_BASE[code] as usize;
        let extra = POS_EXTRA[code] as usize;
        assert!(base <= dist && dist - base < (1 << extra).max(1),
            "dist {} fell outside code {}",dist,code);
    }
}

#[test]
fn empty_input() {
    let compressed = assert_round_trip(&[],&huff_options(1024,false));
    // header only, padded to whole words
    assert_eq!(compressed.len(),16);
}

#[test]
fn single_byte() {
    assert_round_trip(&[0x42],&huff_options(1024,false));
}

#[test]
fn text_round_trip() {
    let data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = assert_round_trip(data,&huff_options(4096,false));
    let expanded = expand_slice(&compressed).unwrap();
    assert_eq!(expanded.len(),data.len());
}

#[test]
fn long_text_shrinks() {
    let mut data = Vec::new();
    while data.len() < 40000 {
        data.extend_from_slice(b"the chaunt of the priests of Mung; the chaunt of the priests. ");
    }
    let compressed = assert_round_trip(&data,&huff_options(32768,false));
    assert!(compressed.len() < data.len() / 2);
}

#[test]
fn runs_and_patterns() {
    assert_round_trip(&vec![0u8;4096],&huff_options(1024,false));
    let data: Vec<u8> = (0..4096).map(|i| [1u8,2,3,4][i % 4]).collect();
    assert_round_trip(&data,&huff_options(1024,false));
}

#[test]
fn random_round_trip() {
    use rand::{Rng,SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xACE);
    let data: Vec<u8> = (0..16384).map(|_| rng.gen()).collect();
    assert_round_trip(&data,&huff_options(1024,true));
}

#[test]
fn accelerated_stream_is_identical() {
    let mut data = Vec::new();
    while data.len() < 10000 {
        data.extend_from_slice(b"mismatched shoes and socks ");
        data.extend_from_slice(&[5,5,5,5,5]);
    }
    let linear = compress_slice(&data,&huff_options(2048,false)).unwrap();
    let accel = compress_slice(&data,&huff_options(2048,true)).unwrap();
    assert_eq!(linear,accel);
}

#[test]
fn window_is_validated() {
    // the distance tables stop at 2^15
    let opt = huff_options(1 << 16,false);
    assert!(matches!(compress_slice(&[1,2,3],&opt),Err(Error::InvalidArgument)));
    let opt = huff_options(1 << 15,false);
    assert!(compress_slice(&[1,2,3],&opt).is_ok());
}

#[test]
fn truncated_stream_is_detected() {
    let data = b"a stream cut short is a stream cut short".to_vec();
    let compressed = compress_slice(&data,&huff_options(1024,false)).unwrap();
    let err = expand_slice(&compressed[0..compressed.len()-8]).unwrap_err();
    assert!(matches!(err.source,Error::Truncated));
    assert!(err.written < data.len());
}

#[test]
fn oversize_header_is_no_space() {
    let data = b"tiny".to_vec();
    let compressed = compress_slice(&data,&huff_options(1024,false)).unwrap();
    let mut small = [0u8;2];
    let mut src = SliceSource::new(&compressed);
    let err = expand(&mut src,&mut small).unwrap_err();
    assert!(matches!(err.source,Error::NoSpace));
}
