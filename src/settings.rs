//! Persistence of the value store
//!
//! The registry never writes durable storage itself. It hands the whole
//! store to a [`SettingsStore`] under the current game's namespace and asks
//! for a single commit once a batch of changes is complete.

use crate::{SettingsError, ValueStore};
use std::collections::HashMap;

/// Namespaced storage for value stores with an explicit flush
pub trait SettingsStore {
    /// Returns the store previously saved under `namespace`
    fn get_map(&self, namespace: &str) -> Option<&ValueStore>;

    /// Replaces the store saved under `namespace`. Not durable until
    /// [`commit`](SettingsStore::commit) is called.
    fn set_map(&mut self, namespace: &str, values: ValueStore);

    /// Flushes every pending change
    fn commit(&mut self) -> Result<(), SettingsError>;
}

impl<T: SettingsStore + ?Sized> SettingsStore for &'_ mut T {
    fn get_map(&self, namespace: &str) -> Option<&ValueStore> {
        (**self).get_map(namespace)
    }

    fn set_map(&mut self, namespace: &str, values: ValueStore) {
        (**self).set_map(namespace, values)
    }

    fn commit(&mut self) -> Result<(), SettingsError> {
        (**self).commit()
    }
}

impl<T: SettingsStore + ?Sized> SettingsStore for Box<T> {
    fn get_map(&self, namespace: &str) -> Option<&ValueStore> {
        (**self).get_map(namespace)
    }

    fn set_map(&mut self, namespace: &str, values: ValueStore) {
        (**self).set_map(namespace, values)
    }

    fn commit(&mut self) -> Result<(), SettingsError> {
        (**self).commit()
    }
}

/// Settings that live only as long as the process. Counts commits so hosts
/// and tests can observe batching.
#[derive(Debug, Default, Clone)]
pub struct MemorySettings {
    maps: HashMap<String, ValueStore>,
    commits: usize,
}

impl MemorySettings {
    pub fn new() -> Self {
        MemorySettings::default()
    }

    /// Number of times [`SettingsStore::commit`] was called
    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl SettingsStore for MemorySettings {
    fn get_map(&self, namespace: &str) -> Option<&ValueStore> {
        self.maps.get(namespace)
    }

    fn set_map(&mut self, namespace: &str, values: ValueStore) {
        self.maps.insert(namespace.to_string(), values);
    }

    fn commit(&mut self) -> Result<(), SettingsError> {
        self.commits += 1;
        Ok(())
    }
}

#[cfg(feature = "json")]
pub use self::json::JsonSettings;

#[cfg(feature = "json")]
mod json {
    use super::SettingsStore;
    use crate::{SettingsError, ValueStore};
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use std::io::{Read, Write};
    use std::path::{Path, PathBuf};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct SettingsDocument {
        #[serde(rename = "mapId", default)]
        map_id: String,

        #[serde(default)]
        maps: BTreeMap<String, MapSettings>,

        /// Global settings owned by the host
        #[serde(flatten)]
        other: BTreeMap<String, serde_json::Value>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct MapSettings {
        #[serde(rename = "saveData", default)]
        save_data: ValueStore,

        /// Per map settings owned by the host (active layers, search text)
        #[serde(flatten)]
        other: BTreeMap<String, serde_json::Value>,
    }

    /// Settings kept as one JSON document, laid out as
    /// `{"mapId": .., "maps": {<game>: {"saveData": {..}}}}`. Keys the host
    /// stores alongside are preserved across a load and commit.
    #[derive(Debug)]
    pub struct JsonSettings {
        path: Option<PathBuf>,
        document: SettingsDocument,
    }

    impl JsonSettings {
        /// Creates empty settings that are only written by [`Self::to_writer`]
        pub fn new(map_id: &str) -> Self {
            JsonSettings {
                path: None,
                document: SettingsDocument {
                    map_id: map_id.to_string(),
                    ..SettingsDocument::default()
                },
            }
        }

        /// Reads settings from a reader. Commits are not persisted anywhere.
        pub fn from_reader<R: Read>(reader: R) -> Result<Self, SettingsError> {
            let document = serde_json::from_reader(reader)?;
            Ok(JsonSettings {
                path: None,
                document,
            })
        }

        /// Opens settings backed by a file. A missing file starts out empty
        /// with `map_id` selected; every commit rewrites the file.
        pub fn open<P: AsRef<Path>>(path: P, map_id: &str) -> Result<Self, SettingsError> {
            let path = path.as_ref();
            let mut settings = match std::fs::File::open(path) {
                Ok(file) => JsonSettings::from_reader(std::io::BufReader::new(file))?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => JsonSettings::new(map_id),
                Err(e) => return Err(e.into()),
            };

            settings.path = Some(path.to_path_buf());
            Ok(settings)
        }

        /// The game whose settings the host currently shows
        pub fn map_id(&self) -> &str {
            &self.document.map_id
        }

        pub fn set_map_id(&mut self, map_id: &str) {
            self.document.map_id = map_id.to_string();
            self.document.maps.entry(map_id.to_string()).or_default();
        }

        pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), SettingsError> {
            serde_json::to_writer_pretty(writer, &self.document)?;
            Ok(())
        }
    }

    impl SettingsStore for JsonSettings {
        fn get_map(&self, namespace: &str) -> Option<&ValueStore> {
            self.document.maps.get(namespace).map(|m| &m.save_data)
        }

        fn set_map(&mut self, namespace: &str, values: ValueStore) {
            self.document
                .maps
                .entry(namespace.to_string())
                .or_default()
                .save_data = values;
        }

        fn commit(&mut self) -> Result<(), SettingsError> {
            if let Some(path) = &self.path {
                let data = serde_json::to_vec_pretty(&self.document)?;
                std::fs::write(path, data)?;
                log::debug!("settings written to {}", path.display());
            }
            Ok(())
        }
    }

}
