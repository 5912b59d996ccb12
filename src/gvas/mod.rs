//! Decoding of engine property-list save files
//!
//! A save is a header followed by a list of tagged properties, each carrying
//! a name, a wire type name, and a declared payload size. Lists end with a
//! property named `None`. See [`SaveObject`] for the entry point.

mod cursor;
mod decoder;
mod header;
mod property;
mod save;

pub use self::cursor::{Checkpoint, Cursor};
pub use self::decoder::PropertyDecoder;
pub use self::header::{CustomVersion, EngineVersion, SaveHeader, MAGIC};
pub use self::property::*;
pub use self::save::SaveObject;
