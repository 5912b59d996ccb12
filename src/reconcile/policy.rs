use super::{Game, Section};
use crate::CanonicalKey;

/// Matches the name part of a key
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum KeyPattern {
    Exact(String),
    Prefix(String),
    Contains(String),
}

impl KeyPattern {
    pub fn matches(&self, key: &CanonicalKey) -> bool {
        let name = key.name();
        match self {
            KeyPattern::Exact(x) => name == x,
            KeyPattern::Prefix(x) => name.starts_with(x.as_str()),
            KeyPattern::Contains(x) => name.contains(x.as_str()),
        }
    }
}

/// Keys matching `pattern` are found only when they are listed in
/// `section`. Listings in the other sections are ignored for them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverrideRule {
    pub pattern: KeyPattern,
    pub section: Section,
}

impl OverrideRule {
    pub fn new(pattern: KeyPattern, section: Section) -> Self {
        OverrideRule { pattern, section }
    }
}

/// Ordered override rules. The first matching rule decides.
///
/// ```
/// use savetrack::{CanonicalKey, Game, OverrideTable, Section};
///
/// let table = OverrideTable::for_game(Game::Sl);
/// let key = CanonicalKey::from("Map:EnemySpawn3_12");
/// assert_eq!(table.required_section(&key), Some(Section::Opened));
/// assert_eq!(table.required_section(&CanonicalKey::from("Map:Chest_7")), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct OverrideTable {
    rules: Vec<OverrideRule>,
}

impl OverrideTable {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        OverrideTable { rules }
    }

    /// The rules known to apply to each game. Graves (`EnemySpawn3`) count
    /// once opened for good and the dead hero once activated; crash bone
    /// spawners only once removed.
    pub fn for_game(game: Game) -> Self {
        let rules = match game {
            Game::Sl => vec![
                OverrideRule::new(
                    KeyPattern::Prefix(String::from("EnemySpawn3")),
                    Section::Opened,
                ),
                OverrideRule::new(
                    KeyPattern::Exact(String::from("DeadHeroIndy")),
                    Section::Activated,
                ),
            ],
            Game::Slc => vec![OverrideRule::new(
                KeyPattern::Prefix(String::from("CrashEnemySpawner")),
                Section::Removed,
            )],
            Game::Siu => Vec::new(),
        };

        OverrideTable { rules }
    }

    pub fn push(&mut self, rule: OverrideRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The only section that counts for the key, if a rule covers it
    pub fn required_section(&self, key: &CanonicalKey) -> Option<Section> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(key))
            .map(|rule| rule.section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(KeyPattern::Exact("DeadHeroIndy".into()), "Map:DeadHeroIndy", true)]
    #[case(KeyPattern::Exact("DeadHeroIndy".into()), "Map:DeadHeroIndy2", false)]
    #[case(KeyPattern::Prefix("EnemySpawn3".into()), "Map:EnemySpawn3_C_5", true)]
    #[case(KeyPattern::Prefix("EnemySpawn3".into()), "EnemySpawn3", true)]
    #[case(KeyPattern::Prefix("EnemySpawn3".into()), "Map:EnemySpawn2_1", false)]
    #[case(KeyPattern::Contains("Spawner".into()), "Crash:CrashEnemySpawner_4", true)]
    fn test_pattern(#[case] pattern: KeyPattern, #[case] key: &str, #[case] expected: bool) {
        assert_eq!(pattern.matches(&CanonicalKey::from(key)), expected);
    }

    #[test]
    fn test_first_rule_wins() {
        let mut table = OverrideTable::for_game(Game::Slc);
        table.push(OverrideRule::new(
            KeyPattern::Contains("Spawner".into()),
            Section::Activated,
        ));

        let spawner = CanonicalKey::from("Crash:CrashEnemySpawner_4");
        assert_eq!(table.required_section(&spawner), Some(Section::Removed));

        let other = CanonicalKey::from("Crash:ScrapSpawner_1");
        assert_eq!(table.required_section(&other), Some(Section::Activated));
    }

    #[test]
    fn test_siu_has_no_overrides() {
        assert!(OverrideTable::for_game(Game::Siu).is_empty());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_from_json() {
        let data = r#"[
            {"pattern": {"prefix": "EnemySpawn3"}, "section": "ThingsToOpenForever"},
            {"pattern": {"exact": "DeadHeroIndy"}, "section": "ThingsToActivate"}
        ]"#;

        let table: OverrideTable = serde_json::from_str(data).unwrap();
        assert_eq!(table, OverrideTable::for_game(Game::Sl));
    }
}
