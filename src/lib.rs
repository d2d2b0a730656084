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

//! Geometric kernel for a grid dungeon: seeded generation of connected
//! room-and-door layouts, plus the line walk and approach steppers the
//! simulation leans on for sight and pursuit.

pub mod error;
pub mod maps;
pub mod mob;
pub mod position;
pub mod tile;
pub mod tile_map;

pub use error::GenerationError;
pub use maps::generated_map::GeneratedMap;
pub use maps::map::Map;
pub use maps::map_generator::{GenerationParams, MapGenerator};
pub use maps::navigator::{
    LineCells, LineWalk, SightLine, line_cells, line_of_sight_cells, step_towards,
    step_towards_unchecked,
};
pub use maps::{MAX_GRID_HEIGHT, MAX_GRID_WIDTH};
pub use mob::Mob;
pub use position::Position;
pub use tile::{Tile, TileKind};
pub use tile_map::TileMap;

/// Generates a dungeon at the given dimensions with the default tuning.
/// The same seed and dimensions always come back as the same grid.
pub fn generate(width: usize, height: usize, seed: u64) -> Result<GeneratedMap, GenerationError> {
    let params = GenerationParams {
        width,
        height,
        ..GenerationParams::default()
    };
    MapGenerator::generate_map(&params, seed)
}
