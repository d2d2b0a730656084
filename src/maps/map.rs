// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use log::warn;
use rand::Rng;

use crate::error::GenerationError;
use crate::maps::generated_map::GeneratedMap;
use crate::maps::map_generator::{GenerationParams, MapGenerator};
use crate::maps::navigator;
use crate::mob::Mob;
use crate::position::Position;

/// A playable level: the committed grid plus the mobs standing on it.
#[derive(Clone, Debug)]
pub struct Map {
    pub generated_map: GeneratedMap,
    pub mobs: Vec<Mob>,
}

impl Map {
    pub fn new(generated_map: GeneratedMap) -> Self {
        Self {
            generated_map,
            mobs: Vec::new(),
        }
    }

    /// Generates a dungeon and stocks it with the configured number of mobs,
    /// each popped off the shuffled spawn cache so they land on distinct
    /// floor cells.
    pub fn generate(params: &GenerationParams, seed: u64) -> Result<Self, GenerationError> {
        let generated_map = MapGenerator::generate_map(params, seed)?;
        let mut map = Self::new(generated_map);
        map.spawn_mobs(params.mob_count);
        Ok(map)
    }

    pub fn width(&self) -> usize {
        self.generated_map.width()
    }

    pub fn height(&self) -> usize {
        self.generated_map.height()
    }

    pub fn spawn_mobs(&mut self, count: usize) {
        for _ in 0..count {
            let Some(pos) = self.generated_map.available_walkable_cache.pop() else {
                warn!("ran out of floor cells while spawning mobs");
                break;
            };
            self.mobs.push(Mob::new(pos));
        }
    }

    /// Full movement validity: inside the grid, walkable tile, and no
    /// active non-stacking mob already on the cell. Out-of-range queries
    /// are reported and answered with false.
    pub fn is_position_valid(&self, pos: Position) -> bool {
        if pos.x >= self.width() {
            warn!("position ({}, {}) is not valid: x is out of bounds", pos.x, pos.y);
            return false;
        }
        if pos.y >= self.height() {
            warn!("position ({}, {}) is not valid: y is out of bounds", pos.x, pos.y);
            return false;
        }
        if !self.generated_map.tiles[pos].is_walkable() {
            return false;
        }
        !self.mobs.iter().any(|mob| mob.blocks(pos))
    }

    /// First active non-stacking mob on the cell, if any.
    pub fn mob_at(&self, pos: Position) -> Option<&Mob> {
        self.mobs.iter().find(|mob| mob.blocks(pos))
    }

    /// Moves the mob when the destination passes the validity check and
    /// reports whether it did.
    pub fn move_mob_if_valid(&mut self, index: usize, to: Position) -> bool {
        if !self.is_position_valid(to) {
            return false;
        }
        self.mobs[index].position = to;
        true
    }

    /// One pursuit step for the mob toward `to`, vetoed by the validity
    /// check, which covers the mob's own cell too. Returns the new position
    /// when the mob moved.
    pub fn step_mob_towards(
        &mut self,
        index: usize,
        to: Position,
        rng: &mut impl Rng,
    ) -> Option<Position> {
        let from = self.mobs[index].position;
        if from == to {
            return None;
        }
        let next = navigator::step_towards(from, to, rng, |pos| self.is_position_valid(pos))?;
        self.mobs[index].position = next;
        Some(next)
    }

    /// Walks the sight line between two cells: true when the target comes up
    /// before anything opaque. The target itself may be opaque and still be
    /// seen, which is how closed doors show up at the end of a corridor.
    pub fn can_see(&self, from: Position, to: Position) -> bool {
        if !self.generated_map.tiles.in_bounds(from) || !self.generated_map.tiles.in_bounds(to) {
            warn!(
                "sight check outside the grid: ({}, {}) to ({}, {})",
                from.x, from.y, to.x, to.y
            );
            return false;
        }
        if from == to {
            return true;
        }
        for cell in navigator::line_cells(from, to) {
            if cell == to {
                return true;
            }
            if self.generated_map.tiles[cell].blocks_sight() {
                return false;
            }
        }
        false
    }

    /// Copies every cell's current kind into its remembered slot, revealing
    /// the whole layout at once.
    pub fn expose_map(&mut self) {
        for x in 0..self.width() {
            for y in 0..self.height() {
                let pos = Position::new(x, y);
                let kind = self.generated_map.tiles[pos].kind;
                self.generated_map.tiles[pos].remembered = Some(kind);
            }
        }
    }
}
