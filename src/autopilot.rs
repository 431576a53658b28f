//! Scripted player used by the headless runner: walks to the nearest trash,
//! turns trash into bricks, sells them and reinvests in the shop.

use crate::{game::Game, player::Direction};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutopilotStats {
    pub decisions: u64,
    pub bricks_made: u64,
    pub sales: u64,
    pub helpers_hired: u64,
    pub upgrades: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Autopilot {
    stats: AutopilotStats,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> AutopilotStats {
        self.stats
    }

    /// Issues one round of input against `game`.
    pub fn drive(&mut self, game: &mut Game) {
        self.stats.decisions += 1;
        self.steer(game);

        while game.state().trash_count >= u64::from(game.state().trash_per_brick) {
            if game.create_brick().is_err() {
                break;
            }
            self.stats.bricks_made += 1;
        }
        if game.state().bricks > 0 && game.sell_bricks().is_ok() {
            self.stats.sales += 1;
        }

        let config = game.config();
        let (upgrade_cost, hire_cost, floor) = (
            config.upgrade_cost,
            config.hire_cost,
            config.min_trash_per_brick,
        );
        let (rate, money) = (game.state().trash_per_brick, game.state().money);
        if rate > floor && money >= upgrade_cost {
            if game.upgrade_efficiency().is_ok() {
                self.stats.upgrades += 1;
            }
        } else if money >= hire_cost && game.hire_helper().is_ok() {
            self.stats.helpers_hired += 1;
        }
    }

    fn steer(&mut self, game: &mut Game) {
        let player = game.player().bounds();
        if !game.trash().overlapping(&player).is_empty() {
            game.collect_nearby();
        }
        game.release_all();

        let (cx, cy) = (player.x + player.w / 2, player.y + player.h / 2);
        let half = game.trash().item_size() / 2;
        let target = game
            .trash()
            .iter()
            .map(|item| (item.x + half, item.y + half))
            .min_by_key(|&(tx, ty)| (tx - cx).abs() + (ty - cy).abs());
        let Some((tx, ty)) = target else {
            return;
        };
        let dead_zone = game.config().move_speed;
        if tx - cx > dead_zone {
            game.set_held(Direction::Right, true);
        } else if cx - tx > dead_zone {
            game.set_held(Direction::Left, true);
        }
        if ty - cy > dead_zone {
            game.set_held(Direction::Down, true);
        } else if cy - ty > dead_zone {
            game.set_held(Direction::Up, true);
        }
    }
}
