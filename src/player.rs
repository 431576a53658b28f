//! Player position, held movement keys and zone membership

use serde::{Deserialize, Serialize};

use crate::{config::GameConfig, geometry::Rect, zones::ZoneRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldDirections {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldDirections {
    pub fn set(&mut self, direction: Direction, held: bool) {
        match direction {
            Direction::Up => self.up = held,
            Direction::Down => self.down = held,
            Direction::Left => self.left = held,
            Direction::Right => self.right = held,
        }
    }

    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    pub fn release_all(&mut self) {
        *self = Self::default();
    }
}

/// Map extents plus the per-frame step.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub map_w: i32,
    pub map_h: i32,
    pub margin: i32,
    pub speed: i32,
}

impl Bounds {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            map_w: config.map_w,
            map_h: config.map_h,
            margin: config.map_margin,
            speed: config.move_speed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub zone: String,
}

impl Player {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            x: config.player.x,
            y: config.player.y,
            w: config.player.w,
            h: config.player.h,
            zone: config.start_zone.clone(),
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    /// Applies one frame of movement for every held direction. Returns
    /// whether the position changed.
    pub fn step(&mut self, held: &HeldDirections, bounds: &Bounds) -> bool {
        let (start_x, start_y) = (self.x, self.y);
        let max_x = (bounds.map_w - self.w - bounds.margin).max(bounds.margin);
        let max_y = (bounds.map_h - self.h - bounds.margin).max(bounds.margin);
        if held.up {
            self.y = (self.y - bounds.speed).max(bounds.margin);
        }
        if held.down {
            self.y = (self.y + bounds.speed).min(max_y);
        }
        if held.left {
            self.x = (self.x - bounds.speed).max(bounds.margin);
        }
        if held.right {
            self.x = (self.x + bounds.speed).min(max_x);
        }
        (self.x, self.y) != (start_x, start_y)
    }

    /// Recomputes the zone from the current position. Keeps the last known
    /// zone when the player stands outside every zone. Returns the new zone
    /// id when it changed.
    pub fn refresh_zone(&mut self, zones: &ZoneRegistry) -> Option<String> {
        let zone = zones.zone_at(self.x, self.y, (self.w, self.h))?;
        if zone.id == self.zone {
            return None;
        }
        self.zone = zone.id.clone();
        Some(self.zone.clone())
    }

    /// Moves the player to the standard entry point of `zone_id`.
    pub fn place_in_zone(&mut self, zones: &ZoneRegistry, zone_id: &str) -> bool {
        let Some(zone) = zones.get(zone_id) else {
            return false;
        };
        self.x = zone.rect.x + 20;
        self.y = zone.rect.y + 20;
        self.zone = zone.id.clone();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Player, Bounds, ZoneRegistry) {
        let config = GameConfig::default();
        (
            Player::from_config(&config),
            Bounds::from_config(&config),
            ZoneRegistry::new(config.zones),
        )
    }

    #[test]
    fn test_step_moves_by_speed() {
        let (mut player, bounds, _) = setup();
        let mut held = HeldDirections::default();
        assert!(!player.step(&held, &bounds));

        held.set(Direction::Right, true);
        held.set(Direction::Down, true);
        assert!(player.step(&held, &bounds));
        assert_eq!((player.x, player.y), (66, 66));
    }

    #[test]
    fn test_step_clamps_to_map() {
        let (mut player, bounds, _) = setup();
        let mut held = HeldDirections::default();
        held.set(Direction::Up, true);
        held.set(Direction::Left, true);
        for _ in 0..50 {
            player.step(&held, &bounds);
        }
        assert_eq!((player.x, player.y), (4, 4));
        assert!(!player.step(&held, &bounds));

        held.release_all();
        held.set(Direction::Right, true);
        held.set(Direction::Down, true);
        for _ in 0..500 {
            player.step(&held, &bounds);
        }
        assert_eq!((player.x, player.y), (760 - 44 - 4, 520 - 56 - 4));
    }

    #[test]
    fn test_refresh_zone_keeps_last_zone_in_gaps() {
        let (mut player, _, zones) = setup();
        player.x = 370;
        assert_eq!(player.refresh_zone(&zones), None);
        assert_eq!(player.zone, "Centro");

        player.x = 420;
        assert_eq!(player.refresh_zone(&zones), Some("Plaza".to_string()));
        assert_eq!(player.refresh_zone(&zones), None);
    }

    #[test]
    fn test_place_in_zone() {
        let (mut player, _, zones) = setup();
        assert!(player.place_in_zone(&zones, "Lago"));
        assert_eq!((player.x, player.y, player.zone.as_str()), (40, 260, "Lago"));
        assert!(!player.place_in_zone(&zones, "Nowhere"));
    }
}
