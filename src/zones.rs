//! Zone registry - named map regions with sales-driven unlocks

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// A rectangular map region. `unlocked` only ever goes from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    #[serde(flatten)]
    pub rect: Rect,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub threshold: u64,
}

impl Zone {
    pub fn new(id: impl Into<String>, rect: Rect, threshold: u64, unlocked: bool) -> Self {
        Self {
            id: id.into(),
            rect,
            unlocked,
            threshold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
}

impl ZoneRegistry {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones }
    }

    pub fn get(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Locked zones whose threshold has been reached, in configuration order.
    pub fn unlockables_above(&self, bricks_sold_total: u64) -> Vec<String> {
        self.zones
            .iter()
            .filter(|zone| !zone.unlocked && zone.threshold <= bricks_sold_total)
            .map(|zone| zone.id.clone())
            .collect()
    }

    /// Flips each named zone to unlocked and returns the ids that actually
    /// changed, in configuration order.
    pub fn apply_unlocks(&mut self, ids: &[String]) -> Vec<String> {
        let mut changed = Vec::new();
        for zone in self.zones.iter_mut() {
            if !zone.unlocked && ids.contains(&zone.id) {
                zone.unlocked = true;
                changed.push(zone.id.clone());
            }
        }
        changed
    }

    pub fn all_unlocked(&self) -> bool {
        self.zones.iter().all(|zone| zone.unlocked)
    }

    pub fn unlocked_zones(&self) -> Vec<&str> {
        self.zones
            .iter()
            .filter(|zone| zone.unlocked)
            .map(|zone| zone.id.as_str())
            .collect()
    }

    /// Threshold of the last configured zone, used as the 100% mark of the
    /// progress bar. A zero threshold counts as 100.
    pub fn final_threshold(&self) -> u64 {
        match self.zones.last().map(|zone| zone.threshold) {
            Some(0) | None => 100,
            Some(threshold) => threshold,
        }
    }

    /// First zone (configuration order) that fully holds a box of `size` at
    /// `(x, y)`.
    pub fn zone_at(&self, x: i32, y: i32, size: (i32, i32)) -> Option<&Zone> {
        self.zones
            .iter()
            .find(|zone| zone.rect.holds_box_at(x, y, size))
    }

    pub fn pick_unlocked<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Zone> {
        let unlocked: Vec<&Zone> = self.zones.iter().filter(|zone| zone.unlocked).collect();
        if unlocked.is_empty() {
            return None;
        }
        Some(unlocked[rng.gen_range(0..unlocked.len())])
    }

    pub fn snapshot(&self) -> Vec<Zone> {
        self.zones.clone()
    }

    pub fn replace(&mut self, zones: Vec<Zone>) {
        self.zones = zones;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use rand::rngs::mock::StepRng;

    fn registry() -> ZoneRegistry {
        ZoneRegistry::new(GameConfig::default().zones)
    }

    #[test]
    fn test_unlockables_respect_threshold() {
        let zones = registry();
        assert!(zones.unlockables_above(9).is_empty());
        assert_eq!(zones.unlockables_above(10), vec!["Plaza".to_string()]);
        assert_eq!(
            zones.unlockables_above(60),
            vec!["Plaza".to_string(), "Lago".to_string(), "Mirador".to_string()]
        );
    }

    #[test]
    fn test_apply_unlocks_is_monotonic_and_idempotent() {
        let mut zones = registry();
        let ids = zones.unlockables_above(25);
        assert_eq!(zones.apply_unlocks(&ids), vec!["Plaza", "Lago"]);
        assert!(zones.apply_unlocks(&ids).is_empty());
        assert_eq!(zones.unlocked_zones(), vec!["Centro", "Plaza", "Lago"]);
        assert!(!zones.all_unlocked());
    }

    #[test]
    fn test_zone_at_uses_box_bounds() {
        let zones = registry();
        assert_eq!(zones.zone_at(60, 60, (44, 56)).map(|z| z.id.as_str()), Some("Centro"));
        assert_eq!(zones.zone_at(420, 300, (44, 56)).map(|z| z.id.as_str()), Some("Mirador"));
        // Gap between Centro and Plaza.
        assert!(zones.zone_at(370, 60, (44, 56)).is_none());
    }

    #[test]
    fn test_final_threshold_falls_back_to_hundred() {
        let zones = ZoneRegistry::new(vec![Zone::new("Solo", Rect::new(0, 0, 100, 100), 0, true)]);
        assert_eq!(zones.final_threshold(), 100);
        assert_eq!(registry().final_threshold(), 50);
    }

    #[test]
    fn test_pick_unlocked_only_returns_unlocked() {
        let zones = registry();
        let mut rng = StepRng::new(0, 0);
        assert_eq!(zones.pick_unlocked(&mut rng).map(|z| z.id.as_str()), Some("Centro"));

        let none = ZoneRegistry::new(vec![Zone::new("Shut", Rect::new(0, 0, 100, 100), 5, false)]);
        assert!(none.pick_unlocked(&mut rng).is_none());
    }
}
