use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::HabitId;

/// Current streak per habit, as reported by the stats collaborator.
///
/// Keys are habit ids rendered as decimal strings, matching the wire shape
/// `{"1": 4, "2": 0}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreakMap(HashMap<String, u32>);

impl StreakMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, habit_id: HabitId, streak: u32) {
        self.0.insert(habit_id.to_string(), streak);
    }

    #[must_use]
    pub fn streak(&self, habit_id: HabitId) -> Option<u32> {
        self.0.get(&habit_id.to_string()).copied()
    }

    /// A badge is shown only for a present, non-zero streak.
    #[must_use]
    pub fn shows_badge(&self, habit_id: HabitId) -> bool {
        self.streak(habit_id).is_some_and(|streak| streak > 0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries whose key parses as a habit id; other keys are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (HabitId, u32)> + '_ {
        self.0
            .iter()
            .filter_map(|(key, streak)| key.parse::<HabitId>().ok().map(|id| (id, *streak)))
    }
}

impl FromIterator<(HabitId, u32)> for StreakMap {
    fn from_iter<I: IntoIterator<Item = (HabitId, u32)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (habit_id, streak) in iter {
            map.insert(habit_id, streak);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_keyed_wire_map() {
        let map: StreakMap = serde_json::from_str(r#"{"1": 99, "2": 0}"#).unwrap();
        assert_eq!(map.streak(HabitId::new(1)), Some(99));
        assert!(map.shows_badge(HabitId::new(1)));
    }

    #[test]
    fn zero_or_missing_streak_hides_badge() {
        let map: StreakMap = [(HabitId::new(2), 0)].into_iter().collect();
        assert!(!map.shows_badge(HabitId::new(2)));
        assert!(!map.shows_badge(HabitId::new(3)));
        assert_eq!(map.streak(HabitId::new(3)), None);
    }

    #[test]
    fn iter_skips_unparseable_keys() {
        let map: StreakMap = serde_json::from_str(r#"{"7": 3, "abc": 5}"#).unwrap();
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![(HabitId::new(7), 3)]);
    }
}
