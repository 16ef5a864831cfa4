//! Translation core between the record sets committed on chain and the
//! DNS wire taxonomy.
//!
//! A resource is decoded once from its raw bytes, then turned into as
//! many signed DNS messages as there are questions about its name.
//! Everything here is a pure function of its inputs plus one clock read
//! for the SOA serial; the crate keeps no state and never logs.

pub mod base32;
pub mod builder;
pub mod pointer;
pub mod reader;
pub mod record;
pub mod respond;

/// TTL applied to every record emitted from a resource. Constant
/// because resources are committed at a fixed tree interval.
pub const DEFAULT_TTL: u32 = 21600;

pub use pointer::is_ptr;
pub use record::{DecodeError, Record, Resource, Tag, Target};
pub use respond::{notimp, nx, root, servfail, synth, to_dns};
