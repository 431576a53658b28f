//! Progression - zone unlocks, level titles and the win condition, all
//! derived from cumulative bricks sold.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{config::GameConfig, economy::GameState, zones::ZoneRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub index: usize,
    /// 1-based number for display.
    pub number: usize,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockReport {
    pub unlocked: Vec<String>,
    /// Set only when the percentage moved since the last check.
    pub progress: Option<u8>,
    /// True on the single check that declared the game won.
    pub victory: bool,
}

#[derive(Debug, Clone)]
pub struct Progression {
    level_thresholds: Vec<u64>,
    level_titles: Vec<String>,
    level: Option<usize>,
    progress: Option<u8>,
}

impl Progression {
    pub fn new(level_thresholds: Vec<u64>, level_titles: Vec<String>) -> Self {
        Self {
            level_thresholds,
            level_titles,
            level: None,
            progress: None,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.level_thresholds.clone(), config.level_titles.clone())
    }

    /// Unlocks every zone whose threshold is reached, refreshes the progress
    /// percentage and flags victory the first time all zones are open.
    /// Repeating the call without a state change has no further effect.
    pub fn check_unlocks(&mut self, state: &mut GameState, zones: &mut ZoneRegistry) -> UnlockReport {
        let candidates = zones.unlockables_above(state.bricks_sold_total);
        let unlocked = zones.apply_unlocks(&candidates);
        for zone in &unlocked {
            info!(zone = %zone, bricks_sold_total = state.bricks_sold_total, "zone_unlocked");
        }

        let percent = progress_percent(state.bricks_sold_total, zones.final_threshold());
        let progress = if self.progress != Some(percent) {
            self.progress = Some(percent);
            Some(percent)
        } else {
            None
        };

        let victory = zones.all_unlocked() && !state.game_won;
        if victory {
            state.game_won = true;
            info!(bricks_sold_total = state.bricks_sold_total, "game_won");
        }

        UnlockReport {
            unlocked,
            progress,
            victory,
        }
    }

    /// Returns the new level when it differs from the last one reported.
    pub fn check_level(&mut self, state: &GameState) -> Option<LevelInfo> {
        let level = self.level_for(state.bricks_sold_total);
        if self.level == Some(level.index) {
            return None;
        }
        self.level = Some(level.index);
        info!(level = level.number, title = %level.title, "level_changed");
        Some(level)
    }

    pub fn level_for(&self, bricks_sold_total: u64) -> LevelInfo {
        let index = self
            .level_thresholds
            .iter()
            .rposition(|&threshold| bricks_sold_total >= threshold)
            .unwrap_or(0);
        let title_index = index.min(self.level_titles.len().saturating_sub(1));
        LevelInfo {
            index,
            number: index + 1,
            title: self
                .level_titles
                .get(title_index)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Forgets what was last reported so the next checks publish afresh.
    pub fn forget_published(&mut self) {
        self.level = None;
        self.progress = None;
    }
}

pub fn progress_percent(bricks_sold_total: u64, final_threshold: u64) -> u8 {
    let percent = bricks_sold_total.saturating_mul(100) / final_threshold.max(1);
    percent.min(100) as u8
}
