//! Placeholder "FHE" layer for agent strategy weights and votes.
//!
//! Values are tagged and run through a reversible text transform. This is
//! obfuscation, not encryption: anyone who can read a stored blob can recover
//! the plaintext with [`decode`]. Homomorphic "operations" are performed by
//! decoding, computing in the clear, and re-encoding.

pub mod codec;

pub use codec::{compute, decode, encode, CodecError, Operation, FHE_TAG};
