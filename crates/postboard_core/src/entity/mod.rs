//! Entity identifiers and the record trait.

mod id;
mod record;

pub use id::EntityId;
pub use record::{decode_record, encode_record, Record};
