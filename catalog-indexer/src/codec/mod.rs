//! Decoding of change-data-capture messages.

mod envelope;

pub use envelope::{
    decode, ChangeEnvelope, DecodeError, Decoded, EntitySnapshot, Operation, SourceMetadata,
};
