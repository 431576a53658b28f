//! Resource conversion: trash -> eco-bricks -> money, plus the shop.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GameConfig;

/// The numeric state of a session. Every counter is unsigned, and
/// `bricks_sold_total` only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub trash_count: u64,
    pub bricks: u64,
    pub money: u64,
    pub helpers: u64,
    pub trash_per_brick: u32,
    pub bricks_sold_total: u64,
    pub game_won: bool,
}

impl GameState {
    pub fn new(trash_per_brick: u32) -> Self {
        Self {
            trash_count: 0,
            bricks: 0,
            money: 0,
            helpers: 0,
            trash_per_brick,
            bricks_sold_total: 0,
            game_won: false,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.trash_per_brick)
    }
}

/// Counters shown on the HUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Trash,
    Bricks,
    Money,
    Helpers,
    TrashPerBrick,
    BricksSoldTotal,
}

impl Stat {
    pub const ALL: [Stat; 6] = [
        Stat::Trash,
        Stat::Bricks,
        Stat::Money,
        Stat::Helpers,
        Stat::TrashPerBrick,
        Stat::BricksSoldTotal,
    ];

    pub fn read(self, state: &GameState) -> u64 {
        match self {
            Stat::Trash => state.trash_count,
            Stat::Bricks => state.bricks,
            Stat::Money => state.money,
            Stat::Helpers => state.helpers,
            Stat::TrashPerBrick => u64::from(state.trash_per_brick),
            Stat::BricksSoldTotal => state.bricks_sold_total,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionDenied {
    #[error("not enough trash to make a brick ({have}/{need})")]
    InsufficientTrash { have: u64, need: u64 },
    #[error("no eco-bricks to sell")]
    NoBricks,
    #[error("not enough money ({have}/{cost})")]
    InsufficientFunds { have: u64, cost: u64 },
    #[error("reset needs confirmation")]
    ResetNotConfirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sale {
    pub bricks: u64,
    pub revenue: u64,
}

/// Prices and shop effects. Stateless: every operation takes the state it
/// mutates and either applies fully or leaves it untouched.
#[derive(Debug, Clone)]
pub struct Economy {
    brick_price: u64,
    hire_cost: u64,
    upgrade_cost: u64,
    upgrade_effect: u32,
    min_trash_per_brick: u32,
}

impl Economy {
    pub fn new(
        brick_price: u64,
        hire_cost: u64,
        upgrade_cost: u64,
        upgrade_effect: u32,
        min_trash_per_brick: u32,
    ) -> Self {
        Self {
            brick_price,
            hire_cost,
            upgrade_cost,
            upgrade_effect,
            min_trash_per_brick: min_trash_per_brick.max(2),
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.brick_price,
            config.hire_cost,
            config.upgrade_cost,
            config.upgrade_effect,
            config.min_trash_per_brick,
        )
    }

    pub fn min_trash_per_brick(&self) -> u32 {
        self.min_trash_per_brick
    }

    pub fn credit_trash(&self, state: &mut GameState) {
        state.trash_count += 1;
    }

    pub fn convert_to_brick(&self, state: &mut GameState) -> Result<(), ActionDenied> {
        let need = u64::from(state.trash_per_brick);
        if state.trash_count < need {
            return Err(ActionDenied::InsufficientTrash {
                have: state.trash_count,
                need,
            });
        }
        state.trash_count -= need;
        state.bricks += 1;
        Ok(())
    }

    pub fn sell_bricks(&self, state: &mut GameState) -> Result<Sale, ActionDenied> {
        if state.bricks == 0 {
            return Err(ActionDenied::NoBricks);
        }
        let sale = Sale {
            bricks: state.bricks,
            revenue: state.bricks * self.brick_price,
        };
        state.money += sale.revenue;
        state.bricks_sold_total += sale.bricks;
        state.bricks = 0;
        Ok(sale)
    }

    pub fn hire_helper(&self, state: &mut GameState) -> Result<(), ActionDenied> {
        self.charge(state, self.hire_cost)?;
        state.helpers += 1;
        Ok(())
    }

    /// Lowers the trash-per-brick rate, never below the floor. Returns the
    /// new rate.
    pub fn upgrade_efficiency(&self, state: &mut GameState) -> Result<u32, ActionDenied> {
        self.charge(state, self.upgrade_cost)?;
        state.trash_per_brick = state
            .trash_per_brick
            .saturating_sub(self.upgrade_effect)
            .max(self.min_trash_per_brick);
        Ok(state.trash_per_brick)
    }

    fn charge(&self, state: &mut GameState, cost: u64) -> Result<(), ActionDenied> {
        if state.money < cost {
            return Err(ActionDenied::InsufficientFunds {
                have: state.money,
                cost,
            });
        }
        state.money -= cost;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn economy() -> Economy {
        Economy::from_config(&GameConfig::default())
    }

    #[test]
    fn test_collect_convert_sell_scenario() {
        let economy = economy();
        let mut state = GameState::new(5);
        for _ in 0..5 {
            economy.credit_trash(&mut state);
        }
        assert_eq!(state.trash_count, 5);

        economy.convert_to_brick(&mut state).unwrap();
        assert_eq!((state.trash_count, state.bricks), (0, 1));

        let sale = economy.sell_bricks(&mut state).unwrap();
        assert_eq!(sale, Sale { bricks: 1, revenue: 2 });
        assert_eq!(state.bricks, 0);
        assert_eq!(state.money, 2);
        assert_eq!(state.bricks_sold_total, 1);
    }

    #[test]
    fn test_denied_actions_leave_state_untouched() {
        let economy = economy();
        let mut state = GameState::new(5);
        state.trash_count = 4;
        let before = state.clone();

        assert_eq!(
            economy.convert_to_brick(&mut state),
            Err(ActionDenied::InsufficientTrash { have: 4, need: 5 })
        );
        assert_eq!(economy.sell_bricks(&mut state), Err(ActionDenied::NoBricks));
        assert!(economy.hire_helper(&mut state).is_err());
        assert!(economy.upgrade_efficiency(&mut state).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_hire_helper_scenario() {
        let economy = economy();
        let mut state = GameState::new(5);
        state.money = 10;
        economy.hire_helper(&mut state).unwrap();
        assert_eq!((state.money, state.helpers), (0, 1));

        assert_eq!(
            economy.hire_helper(&mut state),
            Err(ActionDenied::InsufficientFunds { have: 0, cost: 10 })
        );
        assert_eq!(state.helpers, 1);
    }

    #[test]
    fn test_upgrade_is_floored() {
        let economy = Economy::new(2, 10, 25, 2, 2);
        let mut state = GameState::new(5);
        state.money = 100;
        assert_eq!(economy.upgrade_efficiency(&mut state), Ok(3));
        assert_eq!(economy.upgrade_efficiency(&mut state), Ok(2));
        assert_eq!(economy.upgrade_efficiency(&mut state), Ok(2));
        assert_eq!(state.money, 25);
    }

    #[test]
    fn test_sale_multiplies_by_price() {
        let economy = Economy::new(3, 10, 25, 1, 2);
        let mut state = GameState::new(5);
        state.bricks = 4;
        state.bricks_sold_total = 6;
        economy.sell_bricks(&mut state).unwrap();
        assert_eq!(state.money, 12);
        assert_eq!(state.bricks_sold_total, 10);
    }
}
