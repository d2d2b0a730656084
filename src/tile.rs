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

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    Floor,
    Wall,
    ClosedDoor,
    OpenDoor,
}

impl TileKind {
    /// Movement can enter this kind of cell.
    pub const fn is_walkable(self) -> bool {
        matches!(self, TileKind::Floor | TileKind::OpenDoor)
    }

    /// Sight stops at this kind of cell.
    pub const fn blocks_sight(self) -> bool {
        matches!(self, TileKind::Wall | TileKind::ClosedDoor)
    }

    /// Passable for the generation-time reachability sweep, which treats
    /// closed doors as openable rather than solid.
    pub const fn is_passable(self) -> bool {
        !matches!(self, TileKind::Wall)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    /// Kind last shown to the player at this cell, None while unexplored.
    pub remembered: Option<TileKind>,
}

impl Tile {
    pub fn new(kind: TileKind) -> Self {
        Self {
            kind,
            remembered: None,
        }
    }

    pub fn is_walkable(&self) -> bool {
        self.kind.is_walkable()
    }

    pub fn blocks_sight(&self) -> bool {
        self.kind.blocks_sight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walkability_and_opacity_split_the_kinds() {
        assert!(TileKind::Floor.is_walkable());
        assert!(TileKind::OpenDoor.is_walkable());
        assert!(!TileKind::Wall.is_walkable());
        assert!(!TileKind::ClosedDoor.is_walkable());

        assert!(TileKind::Wall.blocks_sight());
        assert!(TileKind::ClosedDoor.blocks_sight());
        assert!(!TileKind::Floor.blocks_sight());
        assert!(!TileKind::OpenDoor.blocks_sight());
    }

    #[test]
    fn only_walls_stop_the_reachability_sweep() {
        assert!(TileKind::Floor.is_passable());
        assert!(TileKind::ClosedDoor.is_passable());
        assert!(TileKind::OpenDoor.is_passable());
        assert!(!TileKind::Wall.is_passable());
    }

    #[test]
    fn fresh_tiles_start_unexplored() {
        let tile = Tile::new(TileKind::Floor);
        assert_eq!(tile.remembered, None);
    }
}
