//! The `squeeze4` carrier format.
//!
//! The coder streams are headerless (range coder) or minimally framed
//! (Huffman), so files carry a thin wrapper: an 8-byte magic, a one-byte
//! back-end tag, the original byte count as little-endian u64, the coder
//! bytes, and a trailing 64-bit FNV-1a checksum of the coder bytes.  The
//! wrapper is a convenience, not part of the codec core; any carrier that
//! preserves the coder bytes and the original length works as well.

use crate::{Backend,Error,ExpandFailure,Options};
use crate::stream::SliceSource;
use crate::{lzrc,lzhuff};

pub const MAGIC: [u8;8] = *b"squeeze4";

const TAG_RC: u8 = b'r';
const TAG_HUFF: u8 = b'h';

/// FNV offset basis for 64 bits
const FNV_BASIS: u64 = 0xCBF29CE484222325;
/// FNV prime for 64 bits
const FNV_PRIME: u64 = 0x100000001B3;

/// Fowler-Noll-Vo 1a hash of a byte slice
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_BASIS;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Compress into a framed file image.
pub fn compress_slice(input: &[u8],opt: &Options) -> Result<Vec<u8>,Error> {
    let mut ans: Vec<u8> = Vec::new();
    ans.extend_from_slice(&MAGIC);
    ans.push(match opt.backend {
        Backend::RangeCoder => TAG_RC,
        Backend::AdaptiveHuffman => TAG_HUFF
    });
    ans.extend_from_slice(&(input.len() as u64).to_le_bytes());
    let body = ans.len();
    match opt.backend {
        Backend::RangeCoder => lzrc::compress(input,&mut ans,opt)?,
        Backend::AdaptiveHuffman => lzhuff::compress(input,&mut ans,opt)?
    };
    let check = fnv1a(&ans[body..]);
    ans.extend_from_slice(&check.to_le_bytes());
    Ok(ans)
}

/// Expand a framed file image, verifying magic and checksum.
pub fn expand_slice(data: &[u8]) -> Result<Vec<u8>,Error> {
    if data.len() < MAGIC.len() + 1 + 8 + 8 {
        return Err(Error::Truncated);
    }
    if data[0..8] != MAGIC {
        return Err(Error::IllegalSequence);
    }
    let tag = data[8];
    let expected = u64::from_le_bytes(data[9..17].try_into().unwrap());
    let expected = usize::try_from(expected).map_err(|_| Error::TooBig)?;
    let body = &data[17..data.len()-8];
    let check = u64::from_le_bytes(data[data.len()-8..].try_into().unwrap());
    if fnv1a(body) != check {
        return Err(Error::BadChecksum);
    }
    let mut ans: Vec<u8> = Vec::new();
    if ans.try_reserve_exact(expected).is_err() {
        return Err(Error::NoMemory);
    }
    ans.resize(expected,0);
    let mut src = SliceSource::new(body);
    let written = match tag {
        TAG_RC => lzrc::expand(&mut src,&mut ans),
        TAG_HUFF => lzhuff::expand(&mut src,&mut ans),
        _ => return Err(Error::IllegalSequence)
    };
    let written = written.map_err(|ExpandFailure { source, .. }| source)?;
    if written != expected {
        return Err(Error::IllegalSequence);
    }
    Ok(ans)
}

// *************** TESTS *****************

#[test]
fn fnv_reference_values() {
    // published FNV-1a 64 test vectors
    assert_eq!(fnv1a(b""),0xCBF29CE484222325);
    assert_eq!(fnv1a(b"a"),0xAF63DC4C8601EC8C);
    assert_eq!(fnv1a(b"foobar"),0x85944171F73967E8);
}

#[test]
fn frame_header_layout() {
    // magic, back-end tag, little-endian length
    let prefix = "73 71 75 65 65 7A 65 34 72 00 00 00 00 00 00 00 00";
    let framed = compress_slice(&[],&crate::STD_OPTIONS).unwrap();
    assert_eq!(framed[0..17].to_vec(),hex::decode(prefix.replace(" ","")).unwrap());
    let opt = Options { window: 1024, backend: Backend::AdaptiveHuffman, accel: false };
    let framed = compress_slice(&[],&opt).unwrap();
    assert_eq!(framed[8],b'h');
}

#[test]
fn framed_round_trip_both_backends() {
    let data = b"How much squash could a squeezer squeeze, if a squeezer could squeeze squash?".to_vec();
    for backend in [Backend::RangeCoder,Backend::AdaptiveHuffman] {
        let opt = Options { window: 1024, backend, accel: true };
        let framed = compress_slice(&data,&opt).expect("compression failed");
        assert_eq!(&framed[0..8],&MAGIC);
        let expanded = expand_slice(&framed).expect("expansion failed");
        assert_eq!(data,expanded);
    }
}

#[test]
fn magic_is_checked() {
    let data = b"some squeezable bytes some squeezable bytes".to_vec();
    let mut framed = compress_slice(&data,&crate::STD_OPTIONS).unwrap();
    framed[0] = b'S';
    assert!(matches!(expand_slice(&framed),Err(Error::IllegalSequence)));
}

#[test]
fn checksum_is_checked() {
    let data = b"some squeezable bytes some squeezable bytes".to_vec();
    let mut framed = compress_slice(&data,&crate::STD_OPTIONS).unwrap();
    let flip = framed.len() - 12; // inside the coder bytes
    framed[flip] ^= 0x10;
    assert!(matches!(expand_slice(&framed),Err(Error::BadChecksum)));
}

#[test]
fn short_file_is_truncated() {
    assert!(matches!(expand_slice(b"squeeze4"),Err(Error::Truncated)));
}
