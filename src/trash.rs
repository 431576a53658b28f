//! Trash registry - active items, their expiry timers and removal

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    clock::{Clock, TimerHandle},
    geometry::Rect,
    zones::Zone,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrashId(u64);

impl fmt::Display for TrashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrashKind {
    Bottle,
    Bag,
    Wrapper,
}

impl TrashKind {
    const ALL: [TrashKind; 3] = [TrashKind::Bottle, TrashKind::Bag, TrashKind::Wrapper];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashItem {
    pub id: TrashId,
    pub x: i32,
    pub y: i32,
    pub zone: String,
    pub kind: TrashKind,
    pub spawned_at_ms: u64,
    pub ttl_ms: u64,
    #[serde(skip)]
    expiry: Option<TimerHandle>,
}

impl TrashItem {
    pub fn bounds(&self, size: i32) -> Rect {
        Rect::new(self.x, self.y, size, size)
    }

    pub fn expires_at_ms(&self) -> u64 {
        self.spawned_at_ms + self.ttl_ms
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrashError {
    #[error("trash item {0} is no longer on the map")]
    NotFound(TrashId),
    #[error("no trash on the map")]
    Empty,
}

/// Owns every live trash item. Items leave either through collection (which
/// cancels the pending expiry) or through their expiry task.
#[derive(Debug, Clone)]
pub struct TrashRegistry {
    next_id: u64,
    ttl_ms: u64,
    spawn_margin: i32,
    item_size: i32,
    items: Vec<TrashItem>,
}

impl TrashRegistry {
    pub fn new(ttl_ms: u64, spawn_margin: i32, item_size: i32) -> Self {
        Self {
            next_id: 0,
            ttl_ms,
            spawn_margin,
            item_size,
            items: Vec::new(),
        }
    }

    pub fn item_size(&self) -> i32 {
        self.item_size
    }

    /// Places a new item at a random spot inside `zone`, keeping the margin
    /// clear on the right and bottom edges, and arms its expiry on `clock`.
    /// `expire_task` builds the clock task for the new id.
    pub fn spawn<R, T>(
        &mut self,
        zone: &Zone,
        clock: &mut Clock<T>,
        rng: &mut R,
        expire_task: impl FnOnce(TrashId) -> T,
    ) -> &TrashItem
    where
        R: Rng + ?Sized,
        T: Clone,
    {
        let span_x = (zone.rect.w - self.spawn_margin).max(1);
        let span_y = (zone.rect.h - self.spawn_margin).max(1);
        let x = zone.rect.x + rng.gen_range(0..span_x);
        let y = zone.rect.y + rng.gen_range(0..span_y);
        let kind = TrashKind::ALL[rng.gen_range(0..TrashKind::ALL.len())];

        let id = self.allocate();
        let expiry = clock.after(self.ttl_ms, expire_task(id));
        self.items.push(TrashItem {
            id,
            x,
            y,
            zone: zone.id.clone(),
            kind,
            spawned_at_ms: clock.now_ms(),
            ttl_ms: self.ttl_ms,
            expiry: Some(expiry),
        });
        let last = self.items.len() - 1;
        &self.items[last]
    }

    /// Removes an item whose lifetime ran out. Returns `None` when it was
    /// already collected.
    pub fn expire(&mut self, id: TrashId) -> Option<TrashItem> {
        let index = self.position(id)?;
        let mut item = self.items.remove(index);
        item.expiry = None;
        Some(item)
    }

    pub fn collect<T: Clone>(
        &mut self,
        id: TrashId,
        clock: &mut Clock<T>,
    ) -> Result<TrashItem, TrashError> {
        let index = self.position(id).ok_or(TrashError::NotFound(id))?;
        Ok(self.take(index, clock))
    }

    pub fn collect_random<R, T>(
        &mut self,
        rng: &mut R,
        clock: &mut Clock<T>,
    ) -> Result<TrashItem, TrashError>
    where
        R: Rng + ?Sized,
        T: Clone,
    {
        if self.items.is_empty() {
            return Err(TrashError::Empty);
        }
        let index = rng.gen_range(0..self.items.len());
        Ok(self.take(index, clock))
    }

    /// Ids of every item whose box overlaps `area`, oldest first.
    pub fn overlapping(&self, area: &Rect) -> Vec<TrashId> {
        self.items
            .iter()
            .filter(|item| area.overlaps(&item.bounds(self.item_size)))
            .map(|item| item.id)
            .collect()
    }

    pub fn get(&self, id: TrashId) -> Option<&TrashItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrashItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops every item and its pending expiry.
    pub fn clear<T: Clone>(&mut self, clock: &mut Clock<T>) {
        for item in self.items.drain(..) {
            if let Some(handle) = item.expiry {
                clock.cancel(handle);
            }
        }
    }

    fn take<T: Clone>(&mut self, index: usize, clock: &mut Clock<T>) -> TrashItem {
        let mut item = self.items.remove(index);
        if let Some(handle) = item.expiry.take() {
            clock.cancel(handle);
        }
        item
    }

    fn position(&self, id: TrashId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn allocate(&mut self) -> TrashId {
        let id = TrashId(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Expire(TrashId);

    fn zone() -> Zone {
        Zone::new("Centro", Rect::new(20, 20, 340, 180), 0, true)
    }

    fn registry() -> TrashRegistry {
        TrashRegistry::new(20_000, 40, 28)
    }

    #[test]
    fn test_spawn_with_zero_rng_lands_on_zone_corner() {
        let mut trash = registry();
        let mut clock = Clock::new();
        let mut rng = StepRng::new(0, 0);
        let item = trash.spawn(&zone(), &mut clock, &mut rng, Expire).clone();
        assert_eq!((item.x, item.y), (20, 20));
        assert_eq!(item.zone, "Centro");
        assert_eq!(item.kind, TrashKind::Bottle);
        assert_eq!(item.expires_at_ms(), 20_000);
        assert_eq!(clock.pending(), 1);
    }

    #[test]
    fn test_spawn_stays_inside_margin() {
        let mut trash = registry();
        let mut clock = Clock::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let zone = zone();
        for _ in 0..200 {
            trash.spawn(&zone, &mut clock, &mut rng, Expire);
        }
        for item in trash.iter() {
            assert!(item.x >= 20 && item.x < 20 + 340 - 40);
            assert!(item.y >= 20 && item.y < 20 + 180 - 40);
        }
        let ids: HashSet<TrashId> = trash.iter().map(|item| item.id).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_collect_cancels_expiry() {
        let mut trash = registry();
        let mut clock = Clock::new();
        let mut rng = StepRng::new(0, 0);
        let id = trash.spawn(&zone(), &mut clock, &mut rng, Expire).id;

        let item = trash.collect(id, &mut clock).unwrap();
        assert_eq!(item.id, id);
        assert_eq!(clock.pending(), 0);
        assert_eq!(trash.collect(id, &mut clock), Err(TrashError::NotFound(id)));
    }

    #[test]
    fn test_expire_is_idempotent() {
        let mut trash = registry();
        let mut clock = Clock::new();
        let mut rng = StepRng::new(0, 0);
        let id = trash.spawn(&zone(), &mut clock, &mut rng, Expire).id;

        assert_eq!(clock.next_due(20_000), Some(Expire(id)));
        assert!(trash.expire(id).is_some());
        assert!(trash.expire(id).is_none());
        assert!(trash.is_empty());
    }

    #[test]
    fn test_collect_random_on_empty() {
        let mut trash = registry();
        let mut clock: Clock<Expire> = Clock::new();
        let mut rng = StepRng::new(0, 0);
        assert_eq!(
            trash.collect_random(&mut rng, &mut clock),
            Err(TrashError::Empty)
        );
    }

    #[test]
    fn test_overlapping_uses_item_box() {
        let mut trash = registry();
        let mut clock = Clock::new();
        let mut rng = StepRng::new(0, 0);
        let id = trash.spawn(&zone(), &mut clock, &mut rng, Expire).id;

        assert_eq!(trash.overlapping(&Rect::new(40, 40, 10, 10)), vec![id]);
        assert!(trash.overlapping(&Rect::new(49, 49, 10, 10)).is_empty());
    }
}
