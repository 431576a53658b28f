//! The game controller. Owns every piece of mutable state and is the only
//! place where clock tasks and player input turn into component calls.

use std::collections::VecDeque;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    clock::{Clock, TimerHandle},
    config::{ConfigError, GameConfig},
    economy::{ActionDenied, Economy, GameState, Stat},
    events::{Notification, NotificationSink, NullSink, RemovalCause},
    persistence::{MemoryStore, PersistenceError, SaveGateway, SaveRecord, Store, WinnerRecord},
    player::{Bounds, Direction, HeldDirections, Player},
    progression::{progress_percent, LevelInfo, Progression},
    rng::{RngManager, HELPER_STREAM, SPAWN_STREAM},
    trash::{TrashError, TrashId, TrashItem, TrashRegistry},
    zones::{Zone, ZoneRegistry},
};

/// Work items driven by the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Frame,
    Spawn,
    HelperTick,
    CollisionSweep,
    Autosave,
    Expire(TrashId),
    Victory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopAction {
    Hire,
    Upgrade,
    Sell,
    Create,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Input {
    Move { direction: Direction, held: bool },
    Collect,
    CollectItem { id: TrashId },
    Shop { action: ShopAction },
    Save,
    Load,
    Reset { confirmed: bool },
    ClaimPrize { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrizeAward {
    FreeShirtAndCoupon,
    Coupon,
}

impl PrizeAward {
    pub fn message(self, name: &str) -> String {
        match self {
            PrizeAward::FreeShirtAndCoupon => format!(
                "Congratulations {name}! You are the first winner and get a FREE T-SHIRT plus a 40% discount coupon."
            ),
            PrizeAward::Coupon => format!("Thank you {name}! You received a 40% discount coupon."),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrizeError {
    #[error("the game has not been won yet")]
    NotWon,
    #[error("a name is required to claim the prize")]
    EmptyName,
    #[error("the prize was already claimed this session")]
    AlreadyClaimed,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Denied(#[from] ActionDenied),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Prize(#[from] PrizeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub now_ms: u64,
    pub tasks_run: usize,
}

/// Everything a renderer needs to draw the current frame.
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    pub now_ms: u64,
    pub state: GameState,
    pub player: Player,
    pub zones: Vec<Zone>,
    pub trash: Vec<TrashItem>,
    pub trash_size: i32,
    pub map_w: i32,
    pub map_h: i32,
    pub level: LevelInfo,
    pub progress: u8,
    pub log: Vec<String>,
}

pub struct GameBuilder {
    config: GameConfig,
    store: Option<Box<dyn Store>>,
    sink: Option<Box<dyn NotificationSink>>,
}

impl GameBuilder {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            store: None,
            sink: None,
        }
    }

    pub fn with_store(mut self, store: impl Store + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> Result<Game, ConfigError> {
        self.config.validate()?;
        let config = self.config;
        let store = self
            .store
            .unwrap_or_else(|| Box::new(MemoryStore::new()) as Box<dyn Store>);
        let sink = self
            .sink
            .unwrap_or_else(|| Box::new(NullSink) as Box<dyn NotificationSink>);

        let mut game = Game {
            economy: Economy::from_config(&config),
            progression: Progression::from_config(&config),
            state: GameState::from_config(&config),
            zones: ZoneRegistry::new(config.zones.clone()),
            trash: TrashRegistry::new(config.trash_ttl_ms, config.spawn_margin, config.trash_size),
            player: Player::from_config(&config),
            held: HeldDirections::default(),
            bounds: Bounds::from_config(&config),
            clock: Clock::new(),
            rng: RngManager::new(config.seed),
            saves: SaveGateway::new(
                store,
                config.storage.save_key.clone(),
                config.storage.winners_key.clone(),
            ),
            sink,
            published: None,
            pending_victory: None,
            activity: VecDeque::with_capacity(config.log_capacity),
            prize_claimed: false,
            config,
        };
        game.start();
        Ok(game)
    }
}

pub struct Game {
    config: GameConfig,
    economy: Economy,
    progression: Progression,
    state: GameState,
    zones: ZoneRegistry,
    trash: TrashRegistry,
    player: Player,
    held: HeldDirections,
    bounds: Bounds,
    clock: Clock<Task>,
    rng: RngManager,
    saves: SaveGateway,
    sink: Box<dyn NotificationSink>,
    published: Option<GameState>,
    pending_victory: Option<TimerHandle>,
    activity: VecDeque<String>,
    prize_claimed: bool,
}

impl Game {
    fn start(&mut self) {
        let start_zone = self.config.start_zone.clone();
        self.player.place_in_zone(&self.zones, &start_zone);
        self.schedule_tasks();
        self.publish_stats();
        self.check_unlocks();
        self.check_level();
        self.emit(Notification::PlayerMoved {
            x: self.player.x,
            y: self.player.y,
        });
        self.emit(Notification::PlayerZoneChanged {
            zone: self.player.zone.clone(),
        });
        info!(seed = self.rng.seed(), zone = %self.player.zone, "game_started");
        self.log("Game started");
    }

    fn schedule_tasks(&mut self) {
        self.clock.every(self.config.frame_interval_ms, Task::Frame);
        self.clock.every(self.config.spawn_interval_ms, Task::Spawn);
        self.clock.every(self.config.helper_rate_ms, Task::HelperTick);
        self.clock
            .every(self.config.collision_sweep_ms, Task::CollisionSweep);
        self.clock
            .every(self.config.autosave_interval_ms, Task::Autosave);
    }

    /// Moves virtual time forward, running every task that falls due on the
    /// way in due order.
    pub fn advance(&mut self, elapsed_ms: u64) -> TickSummary {
        let until = self.clock.now_ms() + elapsed_ms;
        let mut tasks_run = 0;
        while let Some(task) = self.clock.next_due(until) {
            self.run_task(task);
            tasks_run += 1;
        }
        self.clock.settle(until);
        TickSummary {
            now_ms: until,
            tasks_run,
        }
    }

    /// Runs a single task immediately, outside of the clock.
    pub fn run_task(&mut self, task: Task) {
        match task {
            Task::Frame => self.movement_frame(),
            Task::Spawn => {
                self.spawn_trash();
            }
            Task::HelperTick => self.helpers_collect(),
            Task::CollisionSweep => self.sweep_collisions(),
            Task::Autosave => self.autosave(),
            Task::Expire(id) => self.expire_trash(id),
            Task::Victory => {
                self.pending_victory = None;
                if !self.state.game_won {
                    return;
                }
                info!(bricks_sold_total = self.state.bricks_sold_total, "victory");
                self.emit(Notification::VictoryTriggered);
                self.log("Every zone is unlocked! Claim your prize.");
            }
        }
    }

    pub fn handle(&mut self, input: Input) -> Result<(), GameError> {
        match input {
            Input::Move { direction, held } => self.held.set(direction, held),
            Input::Collect => {
                self.collect_nearby();
            }
            Input::CollectItem { id } => {
                let _ = self.collect_trash(id);
            }
            Input::Shop { action } => match action {
                ShopAction::Hire => self.hire_helper()?,
                ShopAction::Upgrade => {
                    self.upgrade_efficiency()?;
                }
                ShopAction::Sell => self.sell_bricks()?,
                ShopAction::Create => self.create_brick()?,
            },
            Input::Save => self.save()?,
            Input::Load => self.load()?,
            Input::Reset { confirmed } => self.reset(confirmed)?,
            Input::ClaimPrize { name } => {
                if let Err(err) = self.claim_prize(&name) {
                    self.log(capitalize(&err.to_string()));
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    // -- trash lifecycle --------------------------------------------------

    /// Spawns one item in a random unlocked zone. Returns `None` when no zone
    /// is unlocked.
    pub fn spawn_trash(&mut self) -> Option<TrashId> {
        let mut rng = self.rng.stream(SPAWN_STREAM);
        let zone = self.zones.pick_unlocked(&mut rng)?;
        let item = self
            .trash
            .spawn(zone, &mut self.clock, &mut rng, Task::Expire)
            .clone();
        debug!(id = %item.id, zone = %item.zone, x = item.x, y = item.y, "trash_spawned");
        let id = item.id;
        self.emit(Notification::TrashSpawned { item });
        Some(id)
    }

    fn expire_trash(&mut self, id: TrashId) {
        if let Some(item) = self.trash.expire(id) {
            debug!(id = %item.id, "trash_expired");
            self.emit(Notification::TrashRemoved {
                id,
                cause: RemovalCause::Expired,
            });
        }
    }

    /// Collects one item by id, as when the player clicks it. An item that
    /// already expired or was taken reports `NotFound` and changes nothing.
    pub fn collect_trash(&mut self, id: TrashId) -> Result<(), TrashError> {
        let item = match self.trash.collect(id, &mut self.clock) {
            Ok(item) => item,
            Err(err) => {
                debug!(%err, "collect_skipped");
                return Err(err);
            }
        };
        self.economy.credit_trash(&mut self.state);
        self.log(format!("Collected trash in {}", item.zone));
        self.emit(Notification::TrashRemoved {
            id,
            cause: RemovalCause::CollectedByPlayer,
        });
        self.publish_stats();
        Ok(())
    }

    /// Collects every item touching the player. Returns how many were taken.
    pub fn collect_nearby(&mut self) -> usize {
        let collected = self.collect_overlapping();
        if collected == 0 {
            self.log("No trash nearby");
        }
        collected
    }

    fn sweep_collisions(&mut self) {
        self.collect_overlapping();
    }

    fn collect_overlapping(&mut self) -> usize {
        let ids = self.trash.overlapping(&self.player.bounds());
        ids.into_iter()
            .filter(|&id| self.collect_trash(id).is_ok())
            .count()
    }

    fn helpers_collect(&mut self) {
        let mut collected = 0;
        for _ in 0..self.state.helpers {
            let taken = {
                let mut rng = self.rng.stream(HELPER_STREAM);
                self.trash.collect_random(&mut rng, &mut self.clock)
            };
            let Ok(item) = taken else {
                break;
            };
            self.economy.credit_trash(&mut self.state);
            self.log(format!("Helper collected trash in {}", item.zone));
            self.emit(Notification::TrashRemoved {
                id: item.id,
                cause: RemovalCause::CollectedByHelper,
            });
            collected += 1;
        }
        if collected > 0 {
            self.publish_stats();
        }
    }

    // -- movement ---------------------------------------------------------

    fn movement_frame(&mut self) {
        if !self.held.any() {
            return;
        }
        if !self.player.step(&self.held, &self.bounds) {
            return;
        }
        self.emit(Notification::PlayerMoved {
            x: self.player.x,
            y: self.player.y,
        });
        if let Some(zone) = self.player.refresh_zone(&self.zones) {
            self.log(format!("Entered zone: {zone}"));
            self.emit(Notification::PlayerZoneChanged { zone });
        }
    }

    pub fn set_held(&mut self, direction: Direction, held: bool) {
        self.held.set(direction, held);
    }

    pub fn release_all(&mut self) {
        self.held.release_all();
    }

    // -- economy ----------------------------------------------------------

    pub fn create_brick(&mut self) -> Result<(), ActionDenied> {
        if let Err(denied) = self.economy.convert_to_brick(&mut self.state) {
            return Err(self.deny(denied));
        }
        self.log("Made 1 eco-brick");
        self.publish_stats();
        self.check_unlocks();
        Ok(())
    }

    pub fn sell_bricks(&mut self) -> Result<(), ActionDenied> {
        let sale = match self.economy.sell_bricks(&mut self.state) {
            Ok(sale) => sale,
            Err(denied) => return Err(self.deny(denied)),
        };
        info!(
            bricks = sale.bricks,
            revenue = sale.revenue,
            bricks_sold_total = self.state.bricks_sold_total,
            "bricks_sold"
        );
        self.log(format!(
            "Sold {} eco-brick(s) for S/{}",
            sale.bricks, sale.revenue
        ));
        self.publish_stats();
        self.check_unlocks();
        self.check_level();
        Ok(())
    }

    pub fn hire_helper(&mut self) -> Result<(), ActionDenied> {
        if let Err(denied) = self.economy.hire_helper(&mut self.state) {
            return Err(self.deny(denied));
        }
        info!(helpers = self.state.helpers, "helper_hired");
        self.log("Hired 1 helper");
        self.publish_stats();
        Ok(())
    }

    pub fn upgrade_efficiency(&mut self) -> Result<u32, ActionDenied> {
        let rate = match self.economy.upgrade_efficiency(&mut self.state) {
            Ok(rate) => rate,
            Err(denied) => return Err(self.deny(denied)),
        };
        info!(trash_per_brick = rate, "efficiency_upgraded");
        self.log(format!("Upgrade applied: {rate} trash per brick"));
        self.publish_stats();
        Ok(rate)
    }

    fn deny(&mut self, denied: ActionDenied) -> ActionDenied {
        debug!(%denied, "action_denied");
        self.log(capitalize(&denied.to_string()));
        denied
    }

    // -- progression ------------------------------------------------------

    fn check_unlocks(&mut self) {
        let report = self
            .progression
            .check_unlocks(&mut self.state, &mut self.zones);
        for zone in report.unlocked {
            self.log(format!("Zone unlocked: {zone}"));
            self.emit(Notification::ZoneUnlocked { zone });
        }
        if let Some(percent) = report.progress {
            self.emit(Notification::ProgressChanged { percent });
        }
        if report.victory {
            let handle = self.clock.after(self.config.victory_delay_ms, Task::Victory);
            self.pending_victory = Some(handle);
        }
    }

    fn check_level(&mut self) {
        if let Some(level) = self.progression.check_level(&self.state) {
            self.emit(Notification::LevelChanged {
                level: level.number,
                title: level.title,
            });
        }
    }

    // -- persistence ------------------------------------------------------

    pub fn save_record(&self) -> SaveRecord {
        SaveRecord {
            state: self.state.clone(),
            player: self.player.clone(),
            zones_config: self.zones.snapshot(),
        }
    }

    pub fn save(&mut self) -> Result<(), PersistenceError> {
        match self.saves.save(&self.save_record()) {
            Ok(()) => {
                self.log("Progress saved");
                Ok(())
            }
            Err(err) => {
                warn!(%err, "save_failed");
                self.log("Could not save progress");
                Err(err)
            }
        }
    }

    fn autosave(&mut self) {
        match self.saves.save(&self.save_record()) {
            Ok(()) => {
                debug!(now_ms = self.clock.now_ms(), "autosaved");
                self.log("Progress saved");
            }
            Err(err) => warn!(%err, "autosave_failed"),
        }
    }

    /// Restores the saved session. On any failure the running session is
    /// left exactly as it was.
    pub fn load(&mut self) -> Result<(), PersistenceError> {
        match self.saves.load(&self.save_record()) {
            Ok(record) => {
                self.apply_record(record);
                info!(
                    bricks_sold_total = self.state.bricks_sold_total,
                    "save_loaded"
                );
                self.log("Progress loaded");
                Ok(())
            }
            Err(PersistenceError::Missing) => {
                self.log("No saved game");
                Err(PersistenceError::Missing)
            }
            Err(err) => {
                warn!(%err, "load_failed");
                self.log("Error loading saved game");
                Err(err)
            }
        }
    }

    fn apply_record(&mut self, record: SaveRecord) {
        self.state = record.state;
        self.state.trash_per_brick = self
            .state
            .trash_per_brick
            .max(self.economy.min_trash_per_brick());
        self.player = record.player;
        self.zones.replace(record.zones_config);
        // A pre-win save takes back a victory still waiting to be announced.
        if !self.state.game_won {
            if let Some(handle) = self.pending_victory.take() {
                self.clock.cancel(handle);
            }
        }
        self.player.refresh_zone(&self.zones);

        self.published = None;
        self.progression.forget_published();
        self.publish_stats();
        self.check_unlocks();
        self.check_level();
        self.emit(Notification::PlayerMoved {
            x: self.player.x,
            y: self.player.y,
        });
        self.emit(Notification::PlayerZoneChanged {
            zone: self.player.zone.clone(),
        });
    }

    /// Wipes the saved session and starts over from configuration. The
    /// winner list survives.
    pub fn reset(&mut self, confirmed: bool) -> Result<(), GameError> {
        if !confirmed {
            return Err(self.deny(ActionDenied::ResetNotConfirmed).into());
        }
        self.saves.clear()?;

        let ids: Vec<TrashId> = self.trash.iter().map(|item| item.id).collect();
        self.trash.clear(&mut self.clock);
        for id in ids {
            self.emit(Notification::TrashRemoved {
                id,
                cause: RemovalCause::Cleared,
            });
        }
        self.clock.clear();
        self.pending_victory = None;

        self.state = GameState::from_config(&self.config);
        self.zones = ZoneRegistry::new(self.config.zones.clone());
        self.player = Player::from_config(&self.config);
        self.progression = Progression::from_config(&self.config);
        self.held.release_all();
        self.rng.reseed();
        self.published = None;
        self.activity.clear();
        self.prize_claimed = false;
        info!("game_reset");
        self.start();
        Ok(())
    }

    // -- prize ------------------------------------------------------------

    pub fn claim_prize(&mut self, name: &str) -> Result<PrizeAward, GameError> {
        if !self.state.game_won {
            return Err(PrizeError::NotWon.into());
        }
        if self.prize_claimed {
            return Err(PrizeError::AlreadyClaimed.into());
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(PrizeError::EmptyName.into());
        }

        let earlier = self.saves.append_winner(WinnerRecord {
            name: name.to_string(),
            timestamp: Utc::now(),
            money: self.state.money,
            bricks_sold_total: self.state.bricks_sold_total,
        })?;
        let award = if earlier == 0 {
            PrizeAward::FreeShirtAndCoupon
        } else {
            PrizeAward::Coupon
        };
        self.prize_claimed = true;
        info!(winner = %name, ?award, "prize_claimed");
        self.log(award.message(name));
        self.log(format!("Prize claimed by: {name}"));
        Ok(award)
    }

    pub fn winners(&self) -> Result<Vec<WinnerRecord>, PersistenceError> {
        self.saves.winners()
    }

    // -- notifications ----------------------------------------------------

    fn publish_stats(&mut self) {
        let previous = self.published.take();
        for stat in Stat::ALL {
            let value = stat.read(&self.state);
            if previous.as_ref().map(|state| stat.read(state)) != Some(value) {
                self.sink.notify(Notification::StatChanged { stat, value });
            }
        }
        self.published = Some(self.state.clone());
    }

    fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "activity");
        self.activity.push_front(message.clone());
        self.activity.truncate(self.config.log_capacity);
        self.emit(Notification::Log { message });
    }

    fn emit(&mut self, notification: Notification) {
        self.sink.notify(notification);
    }

    // -- accessors --------------------------------------------------------

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn zones(&self) -> &ZoneRegistry {
        &self.zones
    }

    pub fn trash(&self) -> &TrashRegistry {
        &self.trash
    }

    pub fn held(&self) -> &HeldDirections {
        &self.held
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn level(&self) -> LevelInfo {
        self.progression.level_for(self.state.bricks_sold_total)
    }

    pub fn progress(&self) -> u8 {
        progress_percent(self.state.bricks_sold_total, self.zones.final_threshold())
    }

    /// Most recent message first.
    pub fn activity_log(&self) -> impl Iterator<Item = &str> {
        self.activity.iter().map(String::as_str)
    }

    pub fn view(&self) -> GameView {
        GameView {
            now_ms: self.now_ms(),
            state: self.state.clone(),
            player: self.player.clone(),
            zones: self.zones.snapshot(),
            trash: self.trash.iter().cloned().collect(),
            trash_size: self.trash.item_size(),
            map_w: self.config.map_w,
            map_h: self.config.map_h,
            level: self.level(),
            progress: self.progress(),
            log: self.activity.iter().cloned().collect(),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
