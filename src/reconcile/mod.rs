//! Turning a decoded save into stored values and notifications
//!
//! A save lists the objects the player affected in three reserved arrays
//! (removed, activated, opened for good). One game additionally records
//! actor state in a map. Everything else at the top level is a standalone
//! setting keyed by the property's own name.

mod actor;
mod policy;

pub use self::policy::{KeyPattern, OverrideRule, OverrideTable};

use crate::gvas::{PropertyValue, SaveObject};
use crate::registry::ListenerRegistry;
use crate::util::capitalize_first;
use crate::{canonicalize, make_alt, CanonicalKey, Error, SettingsStore, Value, ValueStore};
use std::collections::BTreeMap;
use std::fmt;

/// The game a save belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Game {
    /// Supraland
    Sl,

    /// Supraland Crash
    Slc,

    /// Supraland Six Inches Under
    Siu,
}

impl Game {
    /// Identifier used for settings namespaces
    pub fn id(&self) -> &'static str {
        match self {
            Game::Sl => "sl",
            Game::Slc => "slc",
            Game::Siu => "siu",
        }
    }

    pub fn from_id(id: &str) -> Option<Game> {
        match id {
            "sl" => Some(Game::Sl),
            "slc" => Some(Game::Slc),
            "siu" => Some(Game::Siu),
            _ => None,
        }
    }

    /// Whether saves of this game carry the actor state map
    pub fn tracks_actor_state(&self) -> bool {
        matches!(self, Game::Siu)
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A reserved top level property that lists affected objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Section {
    #[cfg_attr(feature = "serde", serde(rename = "ThingsToRemove"))]
    Removed,

    #[cfg_attr(feature = "serde", serde(rename = "ThingsToActivate"))]
    Activated,

    #[cfg_attr(feature = "serde", serde(rename = "ThingsToOpenForever"))]
    Opened,

    #[cfg_attr(feature = "serde", serde(rename = "ActorSaveData"))]
    ActorState,
}

impl Section {
    /// The sections stored as arrays of object paths
    pub const LISTS: [Section; 3] = [Section::Removed, Section::Activated, Section::Opened];

    const ALL: [Section; 4] = [
        Section::Removed,
        Section::Activated,
        Section::Opened,
        Section::ActorState,
    ];

    /// Property name of the section within a save
    pub fn name(&self) -> &'static str {
        match self {
            Section::Removed => "ThingsToRemove",
            Section::Activated => "ThingsToActivate",
            Section::Opened => "ThingsToOpenForever",
            Section::ActorState => "ActorSaveData",
        }
    }

    pub fn from_name(name: &str) -> Option<Section> {
        Section::ALL.iter().copied().find(|x| x.name() == name)
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The sections a key was listed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionSet(u8);

impl SectionSet {
    pub fn insert(&mut self, section: Section) {
        self.0 |= section.bit();
    }

    pub fn contains(&self, section: Section) -> bool {
        self.0 & section.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Section> + '_ {
        Section::ALL.iter().copied().filter(move |x| self.contains(*x))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SectionSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter().map(|x| x.name()))
    }
}

/// What a save says, before it is matched against listeners
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Scan {
    /// Every key listed in a section, with the sections listing it
    pub sections: BTreeMap<CanonicalKey, SectionSet>,

    /// Top level scalar properties keyed by property name
    pub scalars: BTreeMap<CanonicalKey, Value>,
}

impl Scan {
    /// Keys listed in the given section
    pub fn keys_in(&self, section: Section) -> impl Iterator<Item = &CanonicalKey> + '_ {
        self.sections
            .iter()
            .filter(move |(_, sections)| sections.contains(section))
            .map(|(key, _)| key)
    }

    fn list(&mut self, key: CanonicalKey, section: Section) {
        self.sections.entry(key).or_default().insert(section);
    }
}

/// Applies saves of one game to a listener registry
///
/// ```
/// use savetrack::{Game, Listener, ListenerRegistry, MemorySettings, Reconciler, Value};
///
/// let reconciler = Reconciler::new(Game::Sl);
/// let registry = ListenerRegistry::new(MemorySettings::new(), Game::Sl.id());
/// registry.register("PlayerCoins", Listener::new(|_, _| {}).with_default(0i64));
///
/// let mut data = Vec::new();
/// for s in ["PlayerCoins", "IntProperty"] {
///     data.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
///     data.extend_from_slice(s.as_bytes());
///     data.push(0);
/// }
/// data.extend_from_slice(&4u32.to_le_bytes());
/// data.extend_from_slice(&0u32.to_le_bytes());
/// data.push(0);
/// data.extend_from_slice(&250i32.to_le_bytes());
///
/// registry.load(&data, &reconciler).unwrap();
/// assert_eq!(registry.get("PlayerCoins"), Value::Int(250));
/// ```
#[derive(Debug, Clone)]
pub struct Reconciler {
    game: Game,
    overrides: OverrideTable,
}

impl Reconciler {
    /// Creates a reconciler with the game's known override rules
    pub fn new(game: Game) -> Self {
        Reconciler {
            game,
            overrides: OverrideTable::for_game(game),
        }
    }

    pub fn with_overrides(game: Game, overrides: OverrideTable) -> Self {
        Reconciler { game, overrides }
    }

    pub fn game(&self) -> Game {
        self.game
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Collects the keys each section lists and the top level scalars
    pub fn scan(&self, save: &SaveObject) -> Scan {
        let mut scan = Scan::default();
        for prop in save.properties() {
            match &prop.value {
                PropertyValue::Array(array) => {
                    let section = match Section::from_name(&prop.name) {
                        Some(x) if Section::LISTS.contains(&x) => x,
                        _ => continue,
                    };

                    if array.struct_type.is_some() {
                        continue;
                    }

                    for path in array.strings() {
                        if let Some(key) = canonicalize(path) {
                            scan.list(key, section);
                        }
                    }
                }
                PropertyValue::Map(_) | PropertyValue::Opaque(_)
                    if prop.type_tag == "MapProperty"
                        && prop.name == Section::ActorState.name() =>
                {
                    if !self.game.tracks_actor_state() {
                        continue;
                    }

                    actor::scan_value(&prop.value, &mut |area: &str, name: &str| {
                        let key = make_alt(area, &capitalize_first(name));
                        scan.list(key, Section::ActorState);
                    });
                }
                value => {
                    if let Some(value) = Value::from_property(value) {
                        scan.scalars
                            .insert(CanonicalKey::from(prop.name.as_str()), value);
                    }
                }
            }
        }

        scan
    }

    /// Computes the values to store: section listings and scalars of keys
    /// that have a listener, minus anything equal to the listener's default
    pub fn resolve<S: SettingsStore>(
        &self,
        registry: &ListenerRegistry<S>,
        scan: &Scan,
    ) -> ValueStore {
        let mut values = ValueStore::new();
        for (key, sections) in &scan.sections {
            let listener = match registry.listener(key) {
                Some(x) => x,
                None => continue,
            };

            let found = match self.overrides.required_section(key) {
                Some(required) if listener.accepts(required) => sections.contains(required),
                Some(_) => continue,
                None if sections.iter().any(|x| listener.accepts(x)) => true,
                None => continue,
            };

            let value = Value::Bool(found);
            if value != listener.default_value() {
                values.insert(key.clone(), value);
            }
        }

        for (key, value) in &scan.scalars {
            if let Some(listener) = registry.listener(key) {
                if *value != listener.default_value() {
                    values.insert(key.clone(), value.clone());
                }
            }
        }

        values
    }

    /// Replaces the registry's store with what the save says. The new store
    /// is committed once, then every listener is reset to its default and
    /// every stored key is replayed.
    ///
    /// Fails with [`ReentrantLoad`](crate::ErrorKind::ReentrantLoad) when
    /// called from a callback of an in flight load. A failed commit leaves
    /// the store as it was and notifies no one.
    pub fn process<S: SettingsStore>(
        &self,
        registry: &ListenerRegistry<S>,
        save: &SaveObject,
    ) -> Result<(), Error> {
        let _guard = registry.begin_load()?;
        let scan = self.scan(save);
        let values = self.resolve(registry, &scan);
        let stored = values.len();
        registry.replace_values(values)?;

        log::info!(
            "reconciled {} listed keys and {} scalars into {} stored values ({})",
            scan.sections.len(),
            scan.scalars.len(),
            stored,
            self.game
        );

        registry.fire_defaults();
        registry.fire_stored();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("sl", Some(Game::Sl))]
    #[case("slc", Some(Game::Slc))]
    #[case("siu", Some(Game::Siu))]
    #[case("SL", None)]
    fn test_game_ids(#[case] id: &str, #[case] expected: Option<Game>) {
        assert_eq!(Game::from_id(id), expected);
        if let Some(game) = expected {
            assert_eq!(game.id(), id);
        }
    }

    #[test]
    fn test_section_names() {
        for section in Section::ALL {
            assert_eq!(Section::from_name(section.name()), Some(section));
        }
        assert_eq!(Section::from_name("Player Position"), None);
    }

    #[test]
    fn test_section_set() {
        let mut set = SectionSet::default();
        assert!(set.is_empty());
        set.insert(Section::Opened);
        set.insert(Section::Removed);
        set.insert(Section::Opened);
        assert!(set.contains(Section::Opened));
        assert!(!set.contains(Section::Activated));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Section::Removed, Section::Opened]
        );
    }
}
