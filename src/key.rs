use crate::gvas::NONE;
use crate::util::capitalize_first;
use std::borrow::Borrow;
use std::fmt;

/// Stable identifier of a tracked game entity: `area:name`, or a bare
/// setting name when there is no area.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// Wraps a key that is already in canonical form
    pub fn new<S: Into<String>>(key: S) -> Self {
        CanonicalKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The owning level, if any
    pub fn area(&self) -> Option<&str> {
        self.0.split_once(':').map(|(area, _)| area)
    }

    /// The object identifier within its area
    pub fn name(&self) -> &str {
        match self.0.split_once(':') {
            Some((_, name)) => name,
            None => &self.0,
        }
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CanonicalKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CanonicalKey {
    fn from(key: &str) -> Self {
        CanonicalKey::new(key)
    }
}

impl From<String> for CanonicalKey {
    fn from(key: String) -> Self {
        CanonicalKey(key)
    }
}

/// Joins the non-empty parts into a key.
///
/// ```
/// use savetrack::make_alt;
///
/// assert_eq!(make_alt("Map", "Chest_7").as_str(), "Map:Chest_7");
/// assert_eq!(make_alt("", "PlayerStrong").as_str(), "PlayerStrong");
/// ```
pub fn make_alt(area: &str, name: &str) -> CanonicalKey {
    match (area.is_empty(), name.is_empty()) {
        (false, false) => CanonicalKey(format!("{}:{}", area, name)),
        (true, _) => CanonicalKey(name.to_string()),
        (false, true) => CanonicalKey(area.to_string()),
    }
}

/// Derives a key from a fully qualified engine object path.
///
/// The name is the last `.` separated component with its first letter
/// uppercased, as saves spell the same object with differing case. The area
/// is the asset name of the level the object lives in. Returns `None` for
/// the `None` sentinel and for paths without a name.
///
/// ```
/// use savetrack::canonicalize;
///
/// let key = canonicalize("/Game/Foo/Bar.Bar:PersistentLevel.coin442_41").unwrap();
/// assert_eq!(key.as_str(), "Bar:Coin442_41");
/// assert!(canonicalize("None").is_none());
/// ```
pub fn canonicalize(path: &str) -> Option<CanonicalKey> {
    canonicalize_in(path, None)
}

/// Like [`canonicalize`], but a path that carries no area of its own (eg: a
/// sibling referenced as `:Lever_2` or just `Lever_2`) takes the area of the
/// record that contains it.
pub fn canonicalize_in(path: &str, containing_area: Option<&str>) -> Option<CanonicalKey> {
    let name = path.rsplit(is_separator).next().unwrap_or_default();
    if name.is_empty() || name == NONE {
        return None;
    }

    let area = match path.rsplit_once('/') {
        Some((_, asset)) => asset.split(is_separator).next().unwrap_or_default(),
        None => match path.split_once(':') {
            Some((area, _)) => area.split('.').next().unwrap_or_default(),
            None => "",
        },
    };

    let area = if area.is_empty() {
        containing_area.unwrap_or_default()
    } else {
        area
    };

    Some(make_alt(area, &capitalize_first(name)))
}

fn is_separator(c: char) -> bool {
    c == '.' || c == ':'
}
