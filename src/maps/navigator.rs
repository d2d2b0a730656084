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

use rand::Rng;

use crate::position::Position;

/// Incremental walk along the straight line between two cells. One axis is
/// the stepper and moves every call, the other is the bumper and moves when
/// the accumulated fractional error crosses half a cell. Which axis plays
/// which role, and in which direction, is re-derived from the slope on every
/// call, so the state is just the cursor, the slope and the running error.
#[derive(Debug, Clone)]
pub struct LineWalk {
    x: isize,
    y: isize,
    x_direction: isize,
    slope: f32,
    err: f32,
}

impl LineWalk {
    /// The endpoints must differ, otherwise the slope is not a number and
    /// the walk has nowhere to go.
    pub fn new(from: Position, to: Position) -> Self {
        debug_assert!(from != to, "a line needs two distinct endpoints");
        let dx = to.x as isize - from.x as isize;
        let dy = to.y as isize - from.y as isize;
        Self {
            x: from.x as isize,
            y: from.y as isize,
            // Vertical lines get direction +1 so their infinite slope still
            // advances toward the target.
            x_direction: if dx >= 0 { 1 } else { -1 },
            slope: dy as f32 / dx as f32,
            err: 0.0,
        }
    }

    pub fn cursor(&self) -> (isize, isize) {
        (self.x, self.y)
    }

    /// Moves the cursor one cell along the line and returns it. Callers
    /// decide when to stop; the walk itself continues past the target.
    pub fn advance(&mut self) -> (isize, isize) {
        // Axis-aligned lines skip the octant machinery outright.
        if self.slope == f32::INFINITY {
            self.y += self.x_direction;
            return (self.x, self.y);
        } else if self.slope == f32::NEG_INFINITY {
            self.y -= self.x_direction;
            return (self.x, self.y);
        } else if self.slope == 0.0 {
            self.x += self.x_direction;
            return (self.x, self.y);
        }

        let mut slope = self.slope;
        let mut step = 1isize;
        let mut bump = 1isize;
        // When set, y is the stepper and x is the bumper.
        let mut swap_axes = false;

        if self.x_direction >= 0 {
            if slope < 0.0 {
                if slope.abs() <= 1.0 {
                    // octant I
                    bump = -1;
                } else {
                    // octant II
                    swap_axes = true;
                    step = -1;
                    slope = 1.0 / -slope;
                }
            } else if slope.abs() > 1.0 {
                // octant VII
                swap_axes = true;
                slope = 1.0 / slope;
            }
            // octant VIII keeps the defaults
        } else if slope >= 0.0 {
            if slope.abs() > 1.0 {
                // octant III
                swap_axes = true;
                step = -1;
                bump = -1;
                slope = 1.0 / -slope;
            } else {
                // octant IV
                step = -1;
                bump = -1;
                slope = -slope;
            }
        } else if slope.abs() <= 1.0 {
            // octant V
            step = -1;
            slope = -slope;
        } else {
            // octant VI
            swap_axes = true;
            bump = -1;
            slope = 1.0 / slope;
        }

        if swap_axes {
            Self::update(&mut self.y, &mut self.x, slope, step, bump, &mut self.err);
        } else {
            Self::update(&mut self.x, &mut self.y, slope, step, bump, &mut self.err);
        }
        (self.x, self.y)
    }

    /// Core of the walk: the stepper always moves, the bumper moves when the
    /// ideal line has drifted half a cell away from it, and the leftover
    /// drift is carried in `err`.
    fn update(
        stepper: &mut isize,
        bumper: &mut isize,
        slope: f32,
        step: isize,
        bump: isize,
        err: &mut f32,
    ) {
        let ideal = *bumper as f32 + *err + slope;
        *stepper += step;
        if (ideal - *bumper as f32).abs() >= 0.5 {
            *bumper += bump;
            *err = ideal - *bumper as f32;
        } else {
            *err += slope;
        }
    }
}

/// Cells of the line from `from` to `to`, origin excluded, target included.
/// The walk is fuelled with the taxicab distance between the endpoints so it
/// terminates even if the cursor were to drift off the ideal line.
pub struct LineCells {
    walk: LineWalk,
    target: (isize, isize),
    fuel: usize,
    done: bool,
}

/// The endpoints must differ.
pub fn line_cells(from: Position, to: Position) -> LineCells {
    let dx = (to.x as isize - from.x as isize).abs();
    let dy = (to.y as isize - from.y as isize).abs();
    LineCells {
        walk: LineWalk::new(from, to),
        target: (to.x as isize, to.y as isize),
        fuel: (dx + dy) as usize,
        done: false,
    }
}

impl Iterator for LineCells {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        if self.done || self.fuel == 0 {
            return None;
        }
        self.fuel -= 1;

        let (x, y) = self.walk.advance();
        if (x, y) == self.target {
            self.done = true;
        }
        // The walk stays inside the endpoints' bounding box, which lies in
        // the first quadrant.
        debug_assert!(x >= 0 && y >= 0);
        Some(Position::new(x as usize, y as usize))
    }
}

/// Line cells truncated by opacity: stops after the target or after the
/// first cell `opaque` reports, whichever comes first. The blocking cell is
/// the last one yielded, so callers can tell what got in the way.
pub struct SightLine<F> {
    cells: LineCells,
    opaque: F,
    blocked: bool,
}

pub fn line_of_sight_cells<F>(from: Position, to: Position, opaque: F) -> SightLine<F>
where
    F: Fn(Position) -> bool,
{
    SightLine {
        cells: line_cells(from, to),
        opaque,
        blocked: false,
    }
}

impl<F: Fn(Position) -> bool> Iterator for SightLine<F> {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        if self.blocked {
            return None;
        }
        let pos = self.cells.next()?;
        if (self.opaque)(pos) {
            self.blocked = true;
        }
        Some(pos)
    }
}

/// Single pursuit step toward `to`: the axis that looks longer is tried
/// first and the other is the fallback, with `is_valid` vetoing either.
/// The comparison is on the signed deltas, so a mover south-east of its
/// target leads with the x axis even when the y gap is wider; the chase
/// behavior the simulation was tuned against depends on that lean. Exact
/// diagonals flip a coin so neither axis is favored. Returns None when both
/// cells are vetoed; the caller must not ask for a step once arrived.
pub fn step_towards<F>(
    from: Position,
    to: Position,
    rng: &mut impl Rng,
    is_valid: F,
) -> Option<Position>
where
    F: Fn(Position) -> bool,
{
    debug_assert!(from != to, "step requested at arrival");

    let mut dx = to.x as isize - from.x as isize;
    let mut dy = to.y as isize - from.y as isize;
    let x_step = dx.signum();
    let y_step = dy.signum();

    if dx == dy {
        // Exact diagonal: fake the comparison operands, keep the real steps.
        if rng.gen_bool(0.5) {
            dx = 1;
            dy = -1;
        } else {
            dx = -1;
            dy = 1;
        }
    }

    let (preferred, fallback) = if dx > dy {
        (from.offset(x_step, 0), from.offset(0, y_step))
    } else {
        (from.offset(0, y_step), from.offset(x_step, 0))
    };

    if let Some(pos) = preferred.filter(|&p| is_valid(p)) {
        return Some(pos);
    }
    fallback.filter(|&p| is_valid(p))
}

/// Unconditional approach step comparing absolute gaps, for trajectories
/// that plow on regardless of terrain. Ties pick an axis at random. The
/// caller must not ask for a step once arrived.
pub fn step_towards_unchecked(from: Position, to: Position, rng: &mut impl Rng) -> Position {
    debug_assert!(from != to, "step requested at arrival");

    let dx = to.x as isize - from.x as isize;
    let dy = to.y as isize - from.y as isize;

    let step_x = || Position::new((from.x as isize + dx.signum()) as usize, from.y);
    let step_y = || Position::new(from.x, (from.y as isize + dy.signum()) as usize);

    if dx.abs() > dy.abs() {
        step_x()
    } else if dx.abs() < dy.abs() {
        step_y()
    } else if rng.gen_bool(0.5) {
        step_x()
    } else {
        step_y()
    }
}
