//! # Squeeze Library
//!
//! Compress or expand arbitrary byte streams losslessly.
//! * `lzrc` couples a sliding-window match finder with an adaptive range coder
//!   over Fenwick-tree probability models (recommended back end)
//! * `lzhuff` couples the same match finder with a Vitter-style adaptive
//!   Huffman coder over Deflate-style length/distance tables (legacy back end)
//! * `container` wraps either coder stream in the `squeeze4` carrier format
//!   (magic, original length, FNV-1a checksum)
//!
//! The codec reads and writes single bytes through the traits in `stream`,
//! so callers can plug in buffers, files, or anything else.  There are
//! convenience functions for working directly with slices.
//!
//! ## Buffer Example
//!
//! ```rs
//! use squeeze::*;
//! let test_data = "This is the chaunt of the priests.  The chaunt of the priests of Mung.".as_bytes();
//! let compressed = lzrc::compress_slice(test_data,&STD_OPTIONS).expect("compression failed");
//! let expanded = lzrc::expand_slice(&compressed,test_data.len()).expect("expansion failed");
//! assert_eq!(test_data.to_vec(),expanded);
//! ```
//!
//! ## Sink Example
//!
//! ```rs
//! use squeeze::*;
//! let mut out_file = std::fs::File::create("some_output_path").expect("create failed");
//! let mut sink = stream::WriteSink::new(&mut out_file);
//! let written = lzrc::compress("squeeze me".as_bytes(),&mut sink,&STD_OPTIONS)
//!     .expect("compression failed");
//! eprintln!("emitted {} bytes",written);
//! ```

mod tools;
pub mod stream;
pub mod lzrc;
pub mod lzhuff;
pub mod container;

/// Codec Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("i/o error")]
    Io(#[from] std::io::Error),
    #[error("invalid argument")]
    InvalidArgument,
    #[error("input too large")]
    TooBig,
    #[error("decoded reference out of range")]
    Range,
    #[error("no space in output buffer")]
    NoSpace,
    #[error("illegal byte sequence")]
    IllegalSequence,
    #[error("unexpected end of stream")]
    Truncated,
    #[error("out of memory")]
    NoMemory,
    #[error("checksum failed")]
    BadChecksum
}

/// Error wrapper returned by the expansion functions, carrying the count
/// of bytes that were successfully written before the failure.
#[derive(thiserror::Error,Debug)]
#[error("{source} after {written} bytes")]
pub struct ExpandFailure {
    /// bytes written to the output before the error
    pub written: usize,
    #[source]
    pub source: Error
}

/// Selectable entropy coding back end
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum Backend {
    /// adaptive range coder over Fenwick-tree models (recommended)
    RangeCoder,
    /// adaptive Huffman over Deflate-style tables (legacy)
    AdaptiveHuffman
}

/// Options controlling compression
#[derive(Clone)]
pub struct Options {
    /// back-reference radius, a power of two in [2^10,2^16],
    /// except the Huffman back end tops out at 2^15
    pub window: usize,
    /// entropy coding back end
    pub backend: Backend,
    /// maintain the ordered-tree index; false forces the linear finder
    pub accel: bool
}

pub const STD_OPTIONS: Options = Options {
    window: 32768,
    backend: Backend::RangeCoder,
    accel: true
};

impl Options {
    /// check the window against the back end's supported range
    pub(crate) fn checked_window(&self) -> Result<usize,Error> {
        let max = match self.backend {
            Backend::RangeCoder => 1 << 16,
            Backend::AdaptiveHuffman => 1 << 15
        };
        if self.window < 1 << 10 || self.window > max || !self.window.is_power_of_two() {
            return Err(Error::InvalidArgument);
        }
        Ok(self.window)
    }
}
