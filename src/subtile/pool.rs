//! Bounded sub-tile pool with LRU eviction
//!
//! Arena-plus-index design: tiles live in a fixed-capacity slot array, the
//! recency order is an intrusive doubly-linked index list over the same
//! slots, and a hash map goes from cell id to slot. Slot numbers are stable
//! for the pool's lifetime; eviction frees a slot for immediate reuse and
//! never relocates anything.

use rustc_hash::FxHashMap;

use super::SubTile;

const NIL: usize = usize::MAX;

pub struct SubTilePool {
    slots: Vec<Option<SubTile>>,
    by_cell: FxHashMap<usize, usize>,
    free: Vec<usize>,
    lru_prev: Vec<usize>,
    lru_next: Vec<usize>,
    /// Least-recently-used slot, the eviction candidate.
    lru_head: usize,
    /// Most-recently-used slot.
    lru_tail: usize,
    capacity: usize,
    active: usize,
}

impl SubTilePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            by_cell: FxHashMap::default(),
            free: Vec::new(),
            lru_prev: Vec::with_capacity(capacity),
            lru_next: Vec::with_capacity(capacity),
            lru_head: NIL,
            lru_tail: NIL,
            capacity,
            active: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    pub fn is_full(&self) -> bool {
        self.active >= self.capacity
    }

    /// Slot of the Active tile covering the given cell, if any.
    pub fn get_slot(&self, map_index: usize) -> Option<usize> {
        self.by_cell.get(&map_index).copied()
    }

    /// Occupied-slot access. A vacant slot here means the pool bookkeeping
    /// is corrupt, which is unrecoverable.
    pub fn tile(&self, slot: usize) -> &SubTile {
        self.slots[slot].as_ref().expect("pool slot is vacant")
    }

    pub fn tile_mut(&mut self, slot: usize) -> &mut SubTile {
        self.slots[slot].as_mut().expect("pool slot is vacant")
    }

    /// Marks a slot most-recently-used.
    pub fn touch(&mut self, slot: usize) {
        self.unlink(slot);
        self.push_back(slot);
    }

    /// Inserts a tile into a free slot and marks it most-recently-used.
    /// The pool must not be full; `resolve` evicts first when it is.
    pub fn insert(&mut self, tile: SubTile) -> usize {
        debug_assert!(self.active < self.capacity, "insert into a full pool");
        let map_index = tile.map_index;
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(tile);
                slot
            }
            None => {
                self.slots.push(Some(tile));
                self.lru_prev.push(NIL);
                self.lru_next.push(NIL);
                self.slots.len() - 1
            }
        };
        self.by_cell.insert(map_index, slot);
        self.push_back(slot);
        self.active += 1;
        slot
    }

    /// Removes and returns the least-recently-used tile together with the
    /// slot it occupied. Ties (never-touched tiles) fall out in insertion
    /// order because new tiles always join the back of the list.
    pub fn evict_lru(&mut self) -> Option<(usize, SubTile)> {
        let slot = self.lru_head;
        if slot == NIL {
            return None;
        }
        self.unlink(slot);
        let tile = self.slots[slot].take()?;
        self.by_cell.remove(&tile.map_index);
        self.free.push(slot);
        self.active -= 1;
        Some((slot, tile))
    }

    /// Active tiles with their slots, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SubTile)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, tile)| tile.as_ref().map(|t| (slot, t)))
    }

    fn push_back(&mut self, slot: usize) {
        self.lru_prev[slot] = self.lru_tail;
        self.lru_next[slot] = NIL;
        if self.lru_tail != NIL {
            self.lru_next[self.lru_tail] = slot;
        } else {
            self.lru_head = slot;
        }
        self.lru_tail = slot;
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.lru_prev[slot], self.lru_next[slot]);
        if prev != NIL {
            self.lru_next[prev] = next;
        } else if self.lru_head == slot {
            self.lru_head = next;
        }
        if next != NIL {
            self.lru_prev[next] = prev;
        } else if self.lru_tail == slot {
            self.lru_tail = prev;
        }
        self.lru_prev[slot] = NIL;
        self.lru_next[slot] = NIL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GridLayout;
    use crate::TerrainConfig;

    fn layout() -> GridLayout {
        GridLayout::new(&TerrainConfig {
            grid_width: 5,
            grid_height: 5,
            target_width: 4.0,
            target_height: 4.0,
            nominal_radius: 2.0,
            max_sub_tiles: 3,
            ..TerrainConfig::default()
        })
        .unwrap()
    }

    fn tile(cell_x: usize, cell_y: usize) -> SubTile {
        SubTile::new(cell_x, cell_y, &layout())
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut pool = SubTilePool::new(3);
        let slot = pool.insert(tile(1, 2));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get_slot(layout().map_index(1, 2)), Some(slot));
        assert_eq!(pool.get_slot(layout().map_index(2, 1)), None);
        assert_eq!(pool.tile(slot).cell_x, 1);
    }

    #[test]
    fn test_eviction_follows_insertion_order_untouched() {
        let mut pool = SubTilePool::new(3);
        pool.insert(tile(0, 0));
        pool.insert(tile(1, 0));
        pool.insert(tile(2, 0));
        let (_, first) = pool.evict_lru().unwrap();
        assert_eq!((first.cell_x, first.cell_y), (0, 0));
        let (_, second) = pool.evict_lru().unwrap();
        assert_eq!((second.cell_x, second.cell_y), (1, 0));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_touch_moves_to_back() {
        let mut pool = SubTilePool::new(3);
        let a = pool.insert(tile(0, 0));
        pool.insert(tile(1, 0));
        pool.insert(tile(2, 0));
        pool.touch(a);
        let (_, evicted) = pool.evict_lru().unwrap();
        assert_eq!((evicted.cell_x, evicted.cell_y), (1, 0));
    }

    #[test]
    fn test_slot_reuse_after_eviction() {
        let mut pool = SubTilePool::new(2);
        pool.insert(tile(0, 0));
        pool.insert(tile(1, 0));
        let (freed, _) = pool.evict_lru().unwrap();
        let slot = pool.insert(tile(2, 0));
        assert_eq!(slot, freed);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_empty_pool_evicts_nothing() {
        let mut pool = SubTilePool::new(0);
        assert!(pool.is_full());
        assert!(pool.evict_lru().is_none());
    }
}
