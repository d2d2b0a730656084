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

use crate::position::Position;
use crate::tile::Tile;
use crate::tile_map::TileMap;

/// Finished output of a generation run. The caches are derived from the grid
/// at commit time so callers never rescan it for spawn or walk queries.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedMap {
    pub tiles: TileMap,
    /// Every floor cell, in scan order.
    pub walkable_cache: Vec<Position>,
    /// Floor cells not yet handed out as spawn points, pre-shuffled by the
    /// generation rng so popping stays deterministic per seed.
    pub available_walkable_cache: Vec<Position>,
    pub room_count: u32,
    /// Floor cell the door spanning tree grew from. Doubles as the level
    /// entry point.
    pub root: Position,
}

impl GeneratedMap {
    pub fn new(
        tiles: Vec<Vec<Tile>>,
        walkable_cache: Vec<Position>,
        available_walkable_cache: Vec<Position>,
        room_count: u32,
        root: Position,
    ) -> Self {
        Self {
            tiles: TileMap::new(tiles),
            walkable_cache,
            available_walkable_cache,
            room_count,
            root,
        }
    }

    pub fn width(&self) -> usize {
        self.tiles.width()
    }

    pub fn height(&self) -> usize {
        self.tiles.height()
    }
}
