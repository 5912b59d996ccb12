/*!

Decoding of Unreal Engine property-list save files (GVAS) and reconciliation
of what they record into a sparse store of tracked values.

A save lists the objects a player collected, opened, or activated as engine
object paths. Savetrack decodes the save, derives a stable key for each
object, and notifies whichever observer registered for that key. The values
that differ from an observer's default are persisted through a pluggable
settings store.

## Features

- ✔ Safe: Every read is bounds checked and nesting depth is capped, so
  corrupt input yields an error instead of a panic
- ✔ Forgiving: Property types that are not modeled are kept as opaque bytes
  and decoding continues past them
- ✔ Atomic: A save that fails to decode changes nothing
- ✔ Embeddable: No global state. Registries are plain values a host owns

## Quick Start

```rust
use savetrack::{Game, Listener, ListenerRegistry, MemorySettings, Reconciler, Value};
use std::cell::Cell;
use std::rc::Rc;

fn fstring(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

// ThingsToActivate: an array with a single object path
let path = "/Game/Maps/Area1.Area1:PersistentLevel.Chest_7";
let mut payload = Vec::new();
payload.extend_from_slice(&1u32.to_le_bytes());
fstring(&mut payload, path);

let mut data = Vec::new();
fstring(&mut data, "ThingsToActivate");
fstring(&mut data, "ArrayProperty");
data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
data.extend_from_slice(&0u32.to_le_bytes());
fstring(&mut data, "StrProperty");
data.push(0);
data.extend_from_slice(&payload);
fstring(&mut data, "None");

let found = Rc::new(Cell::new(false));
let marker = Rc::clone(&found);
let registry = ListenerRegistry::new(MemorySettings::new(), Game::Sl.id());
registry.register(
    "Area1:Chest_7",
    Listener::new(move |_key, value| marker.set(value.is_truthy())),
);

registry.load(&data, &Reconciler::new(Game::Sl)).unwrap();
assert!(found.get());
assert_eq!(registry.get("Area1:Chest_7"), Value::Bool(true));
```

## One Level Lower

The decoded property tree is available without any reconciliation through
[`gvas::SaveObject`]. Properties keep their wire type name, declared size,
and payload offset alongside the decoded value.

```rust
use savetrack::gvas::{Cursor, PropertyDecoder};

let data = [5, 0, 0, 0, b'N', b'o', b'n', b'e', 0];
let mut cursor = Cursor::new(&data);
let properties = PropertyDecoder::new().decode_document(&mut cursor).unwrap();
assert!(properties.is_empty());
```

## Caveats

Caller is responsible for:

- Reading the whole save into memory. There is no streaming mode
- Picking the game a save belongs to, as it selects the override rules and
  whether actor state is scanned

*/

mod depth;
mod errors;
pub mod gvas;
mod key;
mod reconcile;
mod registry;
mod settings;
pub(crate) mod util;
mod value;

pub use self::errors::*;
pub use self::key::{canonicalize, canonicalize_in, make_alt, CanonicalKey};
pub use self::reconcile::{
    Game, KeyPattern, OverrideRule, OverrideTable, Reconciler, Scan, Section, SectionSet,
};
pub use self::registry::{Callback, Listener, ListenerRegistry};
#[cfg(feature = "json")]
pub use self::settings::JsonSettings;
pub use self::settings::{MemorySettings, SettingsStore};
pub use self::value::{Value, ValueStore};
