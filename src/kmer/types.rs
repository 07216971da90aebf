use serde::{Deserialize, Serialize};
use std::fmt;
use fxhash::FxHasher64;
use std::hash::Hasher;
use std::iter;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Number of 2-bit bases packed into one storage word.
const BASES_PER_WORD: usize = 32;

/// Errors raised while decoding k-mers, records or k-mer files.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid nucleotide {0:?}")]
    InvalidBase(char),

    #[error("invalid extension {0:?}")]
    InvalidExtension(char),

    #[error("empty k-mer")]
    EmptyKmer,

    #[error("malformed record {0:?}: expected `<KMER> <B><F>`")]
    MalformedRecord(String),

    #[error("line {line}: {source}")]
    Line {
        line: usize,
        source: Box<ParseError>,
    },

    #[error("line {line}: k-mer length mismatch, expected {expected}, got {actual}")]
    LengthMismatch {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{}: file contains no k-mer records", path.display())]
    EmptyFile { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A single DNA base.
///
/// 2-bit codes: A -> 00, C -> 01, G -> 10, T -> 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nucleotide {
    A,
    C,
    G,
    T,
}

impl Nucleotide {
    pub fn from_byte(byte: u8) -> Result<Self, ParseError> {
        match byte {
            b'A' | b'a' => Ok(Nucleotide::A),
            b'C' | b'c' => Ok(Nucleotide::C),
            b'G' | b'g' => Ok(Nucleotide::G),
            b'T' | b't' => Ok(Nucleotide::T),
            _ => Err(ParseError::InvalidBase(byte as char)),
        }
    }

    #[inline]
    pub const fn from_code(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Nucleotide::A,
            0b01 => Nucleotide::C,
            0b10 => Nucleotide::G,
            _ => Nucleotide::T,
        }
    }

    #[inline]
    pub const fn code(self) -> u8 {
        match self {
            Nucleotide::A => 0b00,
            Nucleotide::C => 0b01,
            Nucleotide::G => 0b10,
            Nucleotide::T => 0b11,
        }
    }

    pub const fn as_char(self) -> char {
        match self {
            Nucleotide::A => 'A',
            Nucleotide::C => 'C',
            Nucleotide::G => 'G',
            Nucleotide::T => 'T',
        }
    }
}

impl fmt::Display for Nucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// The neighbour of a k-mer on one side: a base, or `Fence` when the k-mer sits at the
/// boundary of a contig. Written as `F` in k-mer files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Extension {
    Base(Nucleotide),
    Fence,
}

impl Extension {
    pub fn from_byte(byte: u8) -> Result<Self, ParseError> {
        match byte {
            b'F' | b'f' => Ok(Extension::Fence),
            _ => match Nucleotide::from_byte(byte) {
                Ok(base) => Ok(Extension::Base(base)),
                Err(_) => Err(ParseError::InvalidExtension(byte as char)),
            },
        }
    }

    pub const fn is_fence(self) -> bool {
        matches!(self, Extension::Fence)
    }

    pub const fn base(self) -> Option<Nucleotide> {
        match self {
            Extension::Base(base) => Some(base),
            Extension::Fence => None,
        }
    }

    pub const fn as_char(self) -> char {
        match self {
            Extension::Base(base) => base.as_char(),
            Extension::Fence => 'F',
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Fixed-width nucleotide key, packed 2 bits per base.
///
/// Base `i` lives in word `i / 32` at bit offset `2 * (i % 32)`. Bits past `len` are
/// always zero so that structural equality is sequence equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Kmer {
    len: u32,
    words: Vec<u64>,
}

impl Kmer {
    pub fn from_bases<I>(bases: I) -> Self
    where
        I: IntoIterator<Item = Nucleotide>,
    {
        let mut words: Vec<u64> = Vec::new();
        let mut len = 0usize;
        for (i, base) in bases.into_iter().enumerate() {
            if i % BASES_PER_WORD == 0 {
                words.push(0);
            }
            words[i / BASES_PER_WORD] |= (base.code() as u64) << (2 * (i % BASES_PER_WORD));
            len = i + 1;
        }
        Self {
            len: len as u32,
            words,
        }
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<Nucleotide> {
        if index >= self.len() {
            return None;
        }
        let word = self.words[index / BASES_PER_WORD];
        let bits = (word >> (2 * (index % BASES_PER_WORD))) & 0b11;
        Some(Nucleotide::from_code(bits as u8))
    }

    pub fn bases(&self) -> impl Iterator<Item = Nucleotide> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// The k-mer one step forward in the de Bruijn graph: drop the first base and
    /// append `next`.
    pub fn shifted(&self, next: Nucleotide) -> Kmer {
        Kmer::from_bases(self.bases().skip(1).chain(iter::once(next)))
    }

    /// Deterministic 64-bit hash used for slot placement.
    ///
    /// FxHash over the length and the packed words. The algorithm is fixed by the
    /// `fxhash` crate rather than by the toolchain, so ranks built separately still
    /// place every key in the same slot.
    pub fn hash64(&self) -> u64 {
        let mut hasher = FxHasher64::default();
        hasher.write_u32(self.len);
        for word in &self.words {
            hasher.write_u64(*word);
        }
        hasher.finish()
    }
}

impl FromStr for Kmer {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::EmptyKmer);
        }
        let bases = s
            .bytes()
            .map(Nucleotide::from_byte)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Kmer::from_bases(bases))
    }
}

impl fmt::Display for Kmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for base in self.bases() {
            write!(f, "{}", base.as_char())?;
        }
        Ok(())
    }
}

/// The record stored in the table: a k-mer with its backward and forward extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmerPair {
    pub kmer: Kmer,
    pub backward: Extension,
    pub forward: Extension,
}

impl KmerPair {
    pub fn new(kmer: Kmer, backward: Extension, forward: Extension) -> Self {
        Self {
            kmer,
            backward,
            forward,
        }
    }

    /// Nothing precedes this k-mer, so a contig starts here.
    pub fn is_start(&self) -> bool {
        self.backward.is_fence()
    }

    /// Nothing follows this k-mer, so a contig ends here.
    pub fn is_end(&self) -> bool {
        self.forward.is_fence()
    }

    /// Key of the successor record, or `None` at a contig end.
    pub fn next_kmer(&self) -> Option<Kmer> {
        self.forward.base().map(|base| self.kmer.shifted(base))
    }

    pub fn hash64(&self) -> u64 {
        self.kmer.hash64()
    }
}

impl FromStr for KmerPair {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace();
        let (Some(kmer), Some(ext), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(ParseError::MalformedRecord(s.to_string()));
        };
        let &[backward, forward] = ext.as_bytes() else {
            return Err(ParseError::MalformedRecord(s.to_string()));
        };

        Ok(KmerPair {
            kmer: kmer.parse()?,
            backward: Extension::from_byte(backward)?,
            forward: Extension::from_byte(forward)?,
        })
    }
}

impl fmt::Display for KmerPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.kmer, self.backward, self.forward)
    }
}
