use qumara::{
    config::{ConfigLoader, GameConfig},
    game::{Game, GameBuilder, GameError, PrizeAward},
    persistence::{FileStore, MemoryStore, PersistenceError, Store, StoreError},
};
use tempfile::tempdir;

fn fixture_config() -> GameConfig {
    let mut config = ConfigLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("configs/default.yaml")
        .expect("fixture config parses");
    config.collision_sweep_ms = 10_000_000;
    config
}

fn build(store: impl Store + 'static) -> Game {
    GameBuilder::new(fixture_config())
        .with_store(store)
        .build()
        .expect("game builds")
}

fn collect(game: &mut Game, count: u64) {
    for _ in 0..count {
        let id = game.spawn_trash().expect("an unlocked zone exists");
        game.collect_trash(id).expect("fresh trash is collectable");
    }
}

#[test]
fn load_without_save_reports_missing() {
    let mut game = build(MemoryStore::new());
    collect(&mut game, 2);
    let before = game.save_record();
    assert!(matches!(game.load(), Err(PersistenceError::Missing)));
    assert_eq!(game.save_record(), before);
    assert_eq!(game.activity_log().next(), Some("No saved game"));
}

#[test]
fn save_then_load_restores_session() {
    let dir = tempdir().expect("tempdir");
    let mut game = build(FileStore::new(dir.path()));
    collect(&mut game, 12);
    game.create_brick().expect("trash on hand");
    game.save().expect("file store writes");
    let saved = game.save_record();
    assert!(dir.path().join("qumara_save.json").exists());

    collect(&mut game, 7);
    game.load().expect("save exists");
    assert_eq!(game.save_record(), saved);

    let mut fresh = build(FileStore::new(dir.path()));
    fresh.load().expect("save exists");
    assert_eq!(fresh.state(), &saved.state);
    assert_eq!(fresh.player(), &saved.player);
    assert_eq!(fresh.zones().snapshot(), saved.zones_config);
}

#[test]
fn corrupt_save_leaves_session_untouched() {
    let mut store = MemoryStore::new();
    store.write("qumara_save", "{oops").expect("memory store");
    let mut game = build(store);
    collect(&mut game, 3);
    let before = game.save_record();

    assert!(matches!(game.load(), Err(PersistenceError::Corrupt(_))));
    assert_eq!(game.save_record(), before);
    assert_eq!(game.activity_log().next(), Some("Error loading saved game"));
}

#[test]
fn loaded_rate_below_floor_is_clamped() {
    let mut store = MemoryStore::new();
    store
        .write("qumara_save", r#"{"state":{"trashPerBrick":1}}"#)
        .expect("memory store");
    let mut game = build(store);
    game.load().expect("save exists");
    assert_eq!(game.state().trash_per_brick, 2);
}

#[test]
fn full_store_does_not_stop_the_game() {
    let mut game = build(MemoryStore::with_limit(16));
    game.advance(61_000);
    assert!(game.now_ms() >= 61_000);
    assert!(matches!(
        game.save(),
        Err(PersistenceError::Store(StoreError::Full { .. }))
    ));
    assert_eq!(game.activity_log().next(), Some("Could not save progress"));
}

#[test]
fn autosave_writes_periodically() {
    let dir = tempdir().expect("tempdir");
    let mut game = build(FileStore::new(dir.path()));
    collect(&mut game, 4);
    game.advance(59_999);
    assert!(!dir.path().join("qumara_save.json").exists());
    game.advance(1);
    assert!(dir.path().join("qumara_save.json").exists());

    let mut fresh = build(FileStore::new(dir.path()));
    fresh.load().expect("autosave exists");
    assert_eq!(fresh.state().trash_count, 4);
}

#[test]
fn first_winner_gets_shirt_later_winners_coupon() {
    let dir = tempdir().expect("tempdir");
    let won = r#"{"state":{"gameWon":true,"bricksSoldTotal":50,"money":12}}"#;

    let mut first = build(FileStore::new(dir.path()));
    FileStore::new(dir.path())
        .write("qumara_save", won)
        .expect("file store writes");
    first.load().expect("save exists");
    assert_eq!(
        first.claim_prize("Ana").expect("first claim"),
        PrizeAward::FreeShirtAndCoupon
    );

    let mut second = build(FileStore::new(dir.path()));
    second.load().expect("save exists");
    assert_eq!(second.claim_prize("Luz").expect("second claim"), PrizeAward::Coupon);

    let winners = second.winners().expect("winner list");
    let names: Vec<&str> = winners.iter().map(|winner| winner.name.as_str()).collect();
    assert_eq!(names, vec!["Ana", "Luz"]);
    assert_eq!(winners[0].bricks_sold_total, 50);
    assert_eq!(winners[0].money, 12);
}

#[test]
fn reset_keeps_winner_list() {
    let dir = tempdir().expect("tempdir");
    FileStore::new(dir.path())
        .write("qumara_save", r#"{"state":{"gameWon":true}}"#)
        .expect("file store writes");
    let mut game = build(FileStore::new(dir.path()));
    game.load().expect("save exists");
    game.claim_prize("Ana").expect("first claim");

    game.reset(true).expect("confirmed");
    assert!(!dir.path().join("qumara_save.json").exists());
    assert_eq!(game.winners().expect("winner list").len(), 1);
    assert!(matches!(
        game.claim_prize("Ana"),
        Err(GameError::Prize(_))
    ));
}
