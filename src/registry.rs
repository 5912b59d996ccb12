use crate::gvas::SaveObject;
use crate::reconcile::{Reconciler, Section};
use crate::{CanonicalKey, Error, ErrorKind, SettingsStore, Value, ValueStore};
use std::cell::{Cell, Ref, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Observer notified with a key and its new value
pub type Callback = Rc<dyn Fn(&CanonicalKey, &Value)>;

/// A registration for a single key.
///
/// Any context the observer needs is captured by the callback closure.
#[derive(Clone)]
pub struct Listener {
    callback: Callback,
    filter: Option<Section>,
    default_value: Option<Value>,
}

impl Listener {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&CanonicalKey, &Value) + 'static,
    {
        Listener {
            callback: Rc::new(callback),
            filter: None,
            default_value: None,
        }
    }

    /// Only listings in the given section mark the key as found
    pub fn with_filter(mut self, section: Section) -> Self {
        self.filter = Some(section);
        self
    }

    /// The value the observer starts out with. Defaults to `false`.
    pub fn with_default<V: Into<Value>>(mut self, value: V) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn filter(&self) -> Option<Section> {
        self.filter
    }

    pub fn default_value(&self) -> Value {
        self.default_value.clone().unwrap_or_default()
    }

    /// Whether a listing in `section` applies to this listener
    pub fn accepts(&self, section: Section) -> bool {
        self.filter.map_or(true, |x| x == section)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Listener")
            .field("filter", &self.filter)
            .field("default_value", &self.default_value)
            .finish_non_exhaustive()
    }
}

type Pending = Vec<(CanonicalKey, Callback, Value)>;

/// Keyed observers together with the sparse store of values that differ
/// from each observer's default.
///
/// A key has at most one listener; registering again replaces it. Methods
/// take `&self` so callbacks may call back into the registry for other keys.
/// No internal borrow is held while a callback runs.
///
/// ```
/// use savetrack::{Listener, ListenerRegistry, MemorySettings, Value};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let registry = ListenerRegistry::new(MemorySettings::new(), "sl");
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let log = Rc::clone(&seen);
/// registry.register(
///     "Map:Chest_7",
///     Listener::new(move |key, value| log.borrow_mut().push((key.to_string(), value.clone()))),
/// );
///
/// registry.set("Map:Chest_7", true).unwrap();
/// assert_eq!(registry.get("Map:Chest_7"), Value::Bool(true));
/// assert_eq!(registry.non_default_count(), 1);
/// assert_eq!(seen.borrow().len(), 1);
/// ```
#[derive(Debug)]
pub struct ListenerRegistry<S> {
    namespace: String,
    listeners: RefCell<BTreeMap<CanonicalKey, Listener>>,
    values: RefCell<ValueStore>,
    settings: RefCell<S>,
    loading: Cell<bool>,
}

impl<S: SettingsStore> ListenerRegistry<S> {
    /// Creates a registry persisting under `namespace`, starting from the
    /// values the settings already hold there.
    pub fn new(settings: S, namespace: &str) -> Self {
        let values = settings.get_map(namespace).cloned().unwrap_or_default();
        ListenerRegistry {
            namespace: namespace.to_string(),
            listeners: RefCell::new(BTreeMap::new()),
            values: RefCell::new(values),
            settings: RefCell::new(settings),
            loading: Cell::new(false),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Registers the listener for `key`, replacing any previous one
    pub fn register<K: Into<CanonicalKey>>(&self, key: K, listener: Listener) {
        self.listeners.borrow_mut().insert(key.into(), listener);
    }

    /// Removes the listener for `key`. Returns whether one was registered.
    pub fn unregister(&self, key: &str) -> bool {
        self.listeners.borrow_mut().remove(key).is_some()
    }

    /// Drops every listener without notifying any of them
    pub fn clear_listeners(&self) {
        self.listeners.borrow_mut().clear();
    }

    pub fn has_listener(&self, key: &str) -> bool {
        self.listeners.borrow().contains_key(key)
    }

    /// Returns true when any value is stored
    pub fn has_any_data(&self) -> bool {
        !self.values.borrow().is_empty()
    }

    /// The stored value, else the registered default, else `false`
    pub fn get(&self, key: &str) -> Value {
        if let Some(value) = self.values.borrow().get(key) {
            return value.clone();
        }

        self.default_for(key)
    }

    /// Number of stored keys whose value differs from their default
    pub fn non_default_count(&self) -> usize {
        let values = self.values.borrow();
        let listeners = self.listeners.borrow();
        values
            .iter()
            .filter(|(key, value)| {
                let default = listeners
                    .get(key.as_str())
                    .map(|x| x.default_value())
                    .unwrap_or_default();
                **value != default
            })
            .count()
    }

    /// Copy of the stored values
    pub fn values(&self) -> ValueStore {
        self.values.borrow().clone()
    }

    pub fn settings(&self) -> Ref<'_, S> {
        self.settings.borrow()
    }

    pub fn into_settings(self) -> S {
        self.settings.into_inner()
    }

    /// Writes a single value, commits, and notifies the key's listener.
    /// Keys without a listener are ignored.
    pub fn set<V: Into<Value>>(&self, key: &str, value: V) -> Result<(), Error> {
        let value = value.into();
        let (key, listener) = match self.listeners.borrow().get_key_value(key) {
            Some((key, listener)) => (key.clone(), listener.clone()),
            None => return Ok(()),
        };

        let previous = self.values.borrow().clone();
        {
            let mut values = self.values.borrow_mut();
            if value == listener.default_value() {
                values.remove(&key);
            } else {
                values.insert(key.clone(), value.clone());
            }
        }

        if let Err(e) = self.persist() {
            self.restore(previous);
            return Err(e);
        }

        (listener.callback)(&key, &value);
        Ok(())
    }

    /// Clears every stored value, commits, and notifies every listener with
    /// its default
    pub fn reset_all(&self) -> Result<(), Error> {
        let previous = self.values.take();
        if let Err(e) = self.persist() {
            self.restore(previous);
            return Err(e);
        }

        self.fire_defaults();
        Ok(())
    }

    /// Replays stored values once observers have registered. Observers are
    /// assumed to show their default already, so only stored values that
    /// differ from it are sent.
    pub fn load_defaults(&self) {
        let pending = self.pending(|key, listener, values| {
            values
                .get(key)
                .filter(|value| **value != listener.default_value())
                .cloned()
        });

        log::debug!("replaying {} stored values", pending.len());
        fire(pending);
    }

    /// Decodes a save and reconciles it into the store. A save that fails
    /// to decode leaves the store and listeners untouched.
    pub fn load(&self, data: &[u8], reconciler: &Reconciler) -> Result<SaveObject, Error> {
        if self.loading.get() {
            return Err(Error::new(ErrorKind::ReentrantLoad));
        }

        let save = SaveObject::from_slice(data)?;
        reconciler.process(self, &save)?;
        Ok(save)
    }

    pub(crate) fn begin_load(&self) -> Result<LoadGuard<'_>, Error> {
        if self.loading.replace(true) {
            return Err(Error::new(ErrorKind::ReentrantLoad));
        }

        Ok(LoadGuard {
            flag: &self.loading,
        })
    }

    pub(crate) fn listener(&self, key: &CanonicalKey) -> Option<Listener> {
        self.listeners.borrow().get(key).cloned()
    }

    /// Swaps in a new store and commits it. On failure the previous store
    /// is put back.
    pub(crate) fn replace_values(&self, values: ValueStore) -> Result<(), Error> {
        let previous = self.values.replace(values);
        if let Err(e) = self.persist() {
            self.restore(previous);
            return Err(e);
        }

        Ok(())
    }

    pub(crate) fn fire_defaults(&self) {
        let pending = self.pending(|_, listener, _| Some(listener.default_value()));
        fire(pending);
    }

    pub(crate) fn fire_stored(&self) {
        let pending = self.pending(|key, _, values| values.get(key).cloned());
        fire(pending);
    }

    fn default_for(&self, key: &str) -> Value {
        self.listeners
            .borrow()
            .get(key)
            .map(|x| x.default_value())
            .unwrap_or_default()
    }

    fn persist(&self) -> Result<(), Error> {
        let snapshot = self.values.borrow().clone();
        let mut settings = self.settings.borrow_mut();
        settings.set_map(&self.namespace, snapshot);
        settings.commit()?;
        Ok(())
    }

    fn restore(&self, previous: ValueStore) {
        self.settings
            .borrow_mut()
            .set_map(&self.namespace, previous.clone());
        self.values.replace(previous);
    }

    /// Collects the callbacks to run while the registry is borrowed, so
    /// they can run after the borrow ends
    fn pending<F>(&self, mut pick: F) -> Pending
    where
        F: FnMut(&CanonicalKey, &Listener, &ValueStore) -> Option<Value>,
    {
        let listeners = self.listeners.borrow();
        let values = self.values.borrow();
        listeners
            .iter()
            .filter_map(|(key, listener)| {
                pick(key, listener, &values)
                    .map(|value| (key.clone(), Rc::clone(&listener.callback), value))
            })
            .collect()
    }
}

fn fire(pending: Pending) {
    for (key, callback, value) in pending {
        callback(&key, &value);
    }
}

/// Marks a load as in flight until dropped
pub(crate) struct LoadGuard<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySettings, SettingsError};

    type Seen = Rc<RefCell<Vec<(String, Value)>>>;

    fn recorder(seen: &Seen) -> Listener {
        let seen = Rc::clone(seen);
        Listener::new(move |key, value| seen.borrow_mut().push((key.to_string(), value.clone())))
    }

    fn registry() -> ListenerRegistry<MemorySettings> {
        ListenerRegistry::new(MemorySettings::new(), "sl")
    }

    #[test]
    fn test_get_fallbacks() {
        let registry = registry();
        assert_eq!(registry.get("Map:Chest_7"), Value::Bool(false));

        registry.register("Map:Chest_7", Listener::new(|_, _| {}).with_default(true));
        assert_eq!(registry.get("Map:Chest_7"), Value::Bool(true));

        registry.register("Map:Chest_7", Listener::new(|_, _| {}));
        assert_eq!(registry.get("Map:Chest_7"), Value::Bool(false));
    }

    #[test]
    fn test_register_overwrites() {
        let first: Seen = Rc::default();
        let second: Seen = Rc::default();
        let registry = registry();
        registry.register("Map:Chest_7", recorder(&first));
        registry.register("Map:Chest_7", recorder(&second));
        registry.set("Map:Chest_7", true).unwrap();

        assert!(first.borrow().is_empty());
        assert_eq!(second.borrow().len(), 1);
    }

    #[test]
    fn test_set_is_sparse() {
        let seen: Seen = Rc::default();
        let registry = registry();
        registry.register("PlayerCoins", recorder(&seen).with_default(10i64));

        registry.set("PlayerCoins", 25i64).unwrap();
        assert_eq!(registry.values().len(), 1);
        registry.set("PlayerCoins", 10i64).unwrap();
        assert!(!registry.has_any_data());
        assert_eq!(registry.settings().commits(), 2);
        assert_eq!(
            *seen.borrow(),
            vec![
                (String::from("PlayerCoins"), Value::Int(25)),
                (String::from("PlayerCoins"), Value::Int(10)),
            ]
        );
    }

    #[test]
    fn test_set_without_listener_is_ignored() {
        let registry = registry();
        registry.set("Map:Chest_7", true).unwrap();
        assert!(!registry.has_any_data());
        assert_eq!(registry.settings().commits(), 0);
    }

    #[test]
    fn test_reset_all_fires_defaults() {
        let seen: Seen = Rc::default();
        let registry = registry();
        registry.register("A:One", recorder(&seen));
        registry.register("A:Two", recorder(&seen).with_default(true));
        registry.set("A:One", true).unwrap();
        seen.borrow_mut().clear();

        registry.reset_all().unwrap();
        assert!(!registry.has_any_data());
        assert_eq!(
            *seen.borrow(),
            vec![
                (String::from("A:One"), Value::Bool(false)),
                (String::from("A:Two"), Value::Bool(true)),
            ]
        );
    }

    #[test]
    fn test_load_defaults_skips_default_values() {
        let mut settings = MemorySettings::new();
        let mut stored = ValueStore::new();
        stored.insert(CanonicalKey::from("A:Found"), Value::Bool(true));
        stored.insert(CanonicalKey::from("A:Same"), Value::Bool(true));
        stored.insert(CanonicalKey::from("A:Orphan"), Value::Bool(true));
        settings.set_map("sl", stored);

        let seen: Seen = Rc::default();
        let registry = ListenerRegistry::new(settings, "sl");
        registry.register("A:Found", recorder(&seen));
        registry.register("A:Same", recorder(&seen).with_default(true));
        registry.register("A:Missing", recorder(&seen));
        registry.load_defaults();

        assert_eq!(
            *seen.borrow(),
            vec![(String::from("A:Found"), Value::Bool(true))]
        );
        assert_eq!(registry.non_default_count(), 2);
    }

    #[test]
    fn test_callbacks_may_reenter() {
        let registry = Rc::new(registry());
        let seen: Seen = Rc::default();
        registry.register("A:Other", recorder(&seen));

        let inner = Rc::downgrade(&registry);
        registry.register(
            "A:Lever",
            Listener::new(move |_, value| {
                if let Some(registry) = inner.upgrade() {
                    let current = registry.get("A:Other");
                    registry.set("A:Other", value.clone()).unwrap();
                    assert_eq!(current, Value::Bool(false));
                }
            }),
        );

        registry.set("A:Lever", true).unwrap();
        assert_eq!(registry.get("A:Other"), Value::Bool(true));
        assert_eq!(
            *seen.borrow(),
            vec![(String::from("A:Other"), Value::Bool(true))]
        );
    }

    #[test]
    fn test_unregister_and_clear() {
        let registry = registry();
        registry.register("A:One", Listener::new(|_, _| {}));
        registry.register("A:Two", Listener::new(|_, _| {}));
        assert!(registry.unregister("A:One"));
        assert!(!registry.unregister("A:One"));
        assert!(registry.has_listener("A:Two"));
        registry.clear_listeners();
        assert!(!registry.has_listener("A:Two"));
    }

    /// Holds its initial values but can never commit
    #[derive(Default)]
    struct FailingSettings {
        initial: ValueStore,
    }

    impl FailingSettings {
        fn with(key: &str, value: Value) -> Self {
            let mut initial = ValueStore::new();
            initial.insert(CanonicalKey::from(key), value);
            FailingSettings { initial }
        }
    }

    impl SettingsStore for FailingSettings {
        fn get_map(&self, _namespace: &str) -> Option<&ValueStore> {
            Some(&self.initial)
        }

        fn set_map(&mut self, _namespace: &str, _values: ValueStore) {}

        fn commit(&mut self) -> Result<(), SettingsError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into())
        }
    }

    #[test]
    fn test_failed_commit_restores_values() {
        let seen: Seen = Rc::default();
        let registry = ListenerRegistry::new(FailingSettings::default(), "sl");
        registry.register("A:One", recorder(&seen));

        let err = registry.set("A:One", true).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Settings(_)));
        assert!(!registry.has_any_data());
        assert!(seen.borrow().is_empty());
    }

    fn fstring(out: &mut Vec<u8>, s: &str) {
        out.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
        out.extend_from_slice(s.as_bytes());
        out.push(0);
    }

    fn activated_save(path: &str) -> Vec<u8> {
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
        data
    }

    #[test]
    fn test_failed_commit_on_load_keeps_store() {
        let seen: Seen = Rc::default();
        let settings = FailingSettings::with("A:One", Value::Bool(true));
        let registry = ListenerRegistry::new(settings, "sl");
        registry.register("A:One", recorder(&seen));
        registry.register("A:Two", recorder(&seen));

        let data = activated_save("/Game/Maps/A.A:PersistentLevel.Two");
        let reconciler = Reconciler::new(crate::Game::Sl);
        let err = registry.load(&data, &reconciler).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Settings(_)));
        assert_eq!(registry.get("A:One"), Value::Bool(true));
        assert_eq!(registry.get("A:Two"), Value::Bool(false));
        assert_eq!(registry.non_default_count(), 1);
        assert!(seen.borrow().is_empty());

        // the failed load is no longer in flight
        let err = registry.load(&data, &reconciler).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Settings(_)));
    }

    #[test]
    fn test_failed_commit_on_reset_keeps_store() {
        let seen: Seen = Rc::default();
        let settings = FailingSettings::with("A:One", Value::Bool(true));
        let registry = ListenerRegistry::new(settings, "sl");
        registry.register("A:One", recorder(&seen));

        let err = registry.reset_all().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Settings(_)));
        assert!(registry.has_any_data());
        assert_eq!(registry.get("A:One"), Value::Bool(true));
        assert!(seen.borrow().is_empty());
    }
}
