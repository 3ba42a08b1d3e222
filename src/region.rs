//! Thematic level regions: the static catalog, unlock rules and the per-player
//! availability/visited tables.
use crate::geometry::Color;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::collections::HashMap;

/// Every region the game knows about. Values group regions by how they are
/// unlocked: 1xx are terrain regions, 2xx are track regions.
#[repr(u16)]
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize_repr,
    Deserialize_repr,
)]
pub enum RegionKind {
    #[default]
    None = 0,
    // Terrain, available by default
    AboveWater = 101,
    // Terrain, unlocked by tutorial progress
    EnchantedForest = 111,
    // Terrain, unlocked by endurance
    AridDesert = 121,
    BloomingMeadow = 122,
    StormyArea = 123,
    // Terrain, unlocked by broom altitude
    SnowyMountain = 131,
    // Track, available by default
    MysteriousTunnel = 201,
    // Track, unlocked by broom altitude
    AboveClouds = 211,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionCategory {
    Terrain,
    Track,
}

impl RegionKind {
    pub fn category(self) -> Option<RegionCategory> {
        match self as u16 {
            100..=199 => Some(RegionCategory::Terrain),
            200..=299 => Some(RegionCategory::Track),
            _ => None,
        }
    }
}

/// Immutable catalog entry for a single region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRegion {
    pub kind: RegionKind,
    pub display_name: String,
    /// Terrain color used for every point tagged with this region
    pub color: Color,
}

impl LevelRegion {
    pub fn new(kind: RegionKind, display_name: impl Into<String>, color: Color) -> Self {
        Self {
            kind,
            display_name: display_name.into(),
            color,
        }
    }
}

/// All terrain and track regions available in the game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionCatalog {
    pub terrain: Vec<LevelRegion>,
    pub track: Vec<LevelRegion>,
}

impl RegionCatalog {
    /// The regions shipped with the game.
    pub fn builtin() -> Self {
        Self {
            terrain: vec![
                LevelRegion::new(RegionKind::AboveWater, "Above Water", Color::rgb(0.18, 0.42, 0.65)),
                LevelRegion::new(RegionKind::EnchantedForest, "Enchanted Forest", Color::rgb(0.16, 0.38, 0.2)),
                LevelRegion::new(RegionKind::AridDesert, "Arid Desert", Color::rgb(0.85, 0.72, 0.45)),
                LevelRegion::new(RegionKind::BloomingMeadow, "Blooming Meadow", Color::rgb(0.45, 0.7, 0.3)),
                LevelRegion::new(RegionKind::StormyArea, "Stormy Area", Color::rgb(0.35, 0.35, 0.42)),
                LevelRegion::new(RegionKind::SnowyMountain, "Snowy Mountain", Color::rgb(0.92, 0.94, 0.97)),
            ],
            track: vec![
                LevelRegion::new(RegionKind::MysteriousTunnel, "Mysterious Tunnel", Color::rgb(0.3, 0.2, 0.4)),
                LevelRegion::new(RegionKind::AboveClouds, "Above Clouds", Color::rgb(0.95, 0.95, 1.0)),
            ],
        }
    }

    pub fn terrain_map(&self) -> HashMap<RegionKind, LevelRegion> {
        self.terrain.iter().map(|r| (r.kind, r.clone())).collect()
    }

    pub fn track_map(&self) -> HashMap<RegionKind, LevelRegion> {
        self.track.iter().map(|r| (r.kind, r.clone())).collect()
    }

    pub fn get(&self, kind: RegionKind) -> Option<&LevelRegion> {
        self.terrain
            .iter()
            .chain(self.track.iter())
            .find(|r| r.kind == kind)
    }
}

impl Default for RegionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Per-player region state, copied into the level at generation start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionTables {
    /// `true` if the region may appear in a level at all
    pub availability: HashMap<RegionKind, bool>,
    /// `true` once the player has finished a race going through the region
    pub visited: HashMap<RegionKind, bool>,
}

impl RegionTables {
    pub fn new(availability: HashMap<RegionKind, bool>, visited: HashMap<RegionKind, bool>) -> Self {
        Self {
            availability,
            visited,
        }
    }

    /// Missing entries count as locked.
    pub fn is_available(&self, kind: RegionKind) -> bool {
        self.availability.get(&kind).copied().unwrap_or(false)
    }

    /// Missing entries count as not visited.
    pub fn is_visited(&self, kind: RegionKind) -> bool {
        self.visited.get(&kind).copied().unwrap_or(false)
    }

    /// Makes sure every catalog region has an availability entry (locked unless
    /// stated otherwise).
    pub fn fill_missing(&mut self, catalog: &RegionCatalog) {
        for region in catalog.terrain.iter().chain(catalog.track.iter()) {
            self.availability.entry(region.kind).or_insert(false);
        }
    }
}

/// A region unlocked once some progression value reaches `min_value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionUnlockValue {
    pub region: RegionKind,
    pub min_value: f32,
}

/// A region unlocked once the tutorial moves past `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionUnlockStage {
    pub region: RegionKind,
    pub stage: u32,
}

/// Rules deciding which regions are currently available to a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionUnlocks {
    pub default_regions: Vec<RegionKind>,
    #[serde(default)]
    pub by_tutorial: Vec<RegionUnlockStage>,
    #[serde(default)]
    pub by_endurance: Vec<RegionUnlockValue>,
    #[serde(default)]
    pub by_altitude: Vec<RegionUnlockValue>,
}

impl Default for RegionUnlocks {
    fn default() -> Self {
        Self {
            default_regions: vec![RegionKind::AboveWater, RegionKind::MysteriousTunnel],
            by_tutorial: vec![RegionUnlockStage {
                region: RegionKind::EnchantedForest,
                stage: 3,
            }],
            by_endurance: vec![
                RegionUnlockValue { region: RegionKind::AridDesert, min_value: 20.0 },
                RegionUnlockValue { region: RegionKind::BloomingMeadow, min_value: 40.0 },
                RegionUnlockValue { region: RegionKind::StormyArea, min_value: 60.0 },
            ],
            by_altitude: vec![
                RegionUnlockValue { region: RegionKind::SnowyMountain, min_value: 30.0 },
                RegionUnlockValue { region: RegionKind::AboveClouds, min_value: 45.0 },
            ],
        }
    }
}

impl RegionUnlocks {
    /// Applies the unlock rules on top of `current`. Regions with a rule get
    /// their value recomputed; regions without a rule keep their entry.
    pub fn availability(
        &self,
        current: &HashMap<RegionKind, bool>,
        tutorial_stage: u32,
        endurance: u8,
        max_altitude: f32,
    ) -> HashMap<RegionKind, bool> {
        let mut availability = current.clone();
        for region in &self.default_regions {
            availability.insert(*region, true);
        }
        for rule in &self.by_tutorial {
            availability.insert(rule.region, tutorial_stage > rule.stage);
        }
        for rule in &self.by_endurance {
            availability.insert(rule.region, endurance as f32 >= rule.min_value);
        }
        for rule in &self.by_altitude {
            availability.insert(rule.region, max_altitude >= rule.min_value);
        }
        availability
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_categories() {
        assert_eq!(RegionKind::AboveWater.category(), Some(RegionCategory::Terrain));
        assert_eq!(RegionKind::SnowyMountain.category(), Some(RegionCategory::Terrain));
        assert_eq!(RegionKind::AboveClouds.category(), Some(RegionCategory::Track));
        assert_eq!(RegionKind::None.category(), None);
    }

    #[test]
    fn test_region_kind_defaults_to_none() {
        assert_eq!(RegionKind::default(), RegionKind::None);
        assert_eq!(RegionKind::default().category(), None);
    }

    #[test]
    fn test_builtin_catalog_is_consistent() {
        let catalog = RegionCatalog::builtin();
        assert_eq!(catalog.terrain.len(), 6);
        assert_eq!(catalog.track.len(), 2);
        assert!(catalog
            .terrain
            .iter()
            .all(|r| r.kind.category() == Some(RegionCategory::Terrain)));
        assert!(catalog
            .track
            .iter()
            .all(|r| r.kind.category() == Some(RegionCategory::Track)));
        assert!(catalog.get(RegionKind::None).is_none());
    }

    #[test]
    fn test_missing_table_entries() {
        let tables = RegionTables::default();
        assert!(!tables.is_available(RegionKind::AboveWater));
        assert!(!tables.is_visited(RegionKind::AboveWater));

        let mut tables = RegionTables::default();
        tables.fill_missing(&RegionCatalog::builtin());
        assert_eq!(tables.availability.len(), 8);
        assert!(tables.availability.values().all(|available| !available));
    }

    #[test]
    fn test_unlock_rules() {
        let unlocks = RegionUnlocks::default();
        let availability = unlocks.availability(&HashMap::new(), 0, 45, 10.0);

        assert_eq!(availability[&RegionKind::AboveWater], true);
        assert_eq!(availability[&RegionKind::MysteriousTunnel], true);
        assert_eq!(availability[&RegionKind::EnchantedForest], false);
        assert_eq!(availability[&RegionKind::AridDesert], true);
        assert_eq!(availability[&RegionKind::BloomingMeadow], true);
        assert_eq!(availability[&RegionKind::StormyArea], false);
        assert_eq!(availability[&RegionKind::SnowyMountain], false);

        let later = unlocks.availability(&availability, 4, 45, 50.0);
        assert_eq!(later[&RegionKind::EnchantedForest], true);
        assert_eq!(later[&RegionKind::AboveClouds], true);
    }
}
