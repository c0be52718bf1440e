// Copyright (C) 2025 the Fractum authors. This program is free software: you
// can redistribute it and/or modify it under the terms of the GNU General
// Public License as published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use fractum_math::Complex;

/// The rectangular region of the complex plane an orbit program declares as
/// its natural viewport, as two corner points.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Region {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Region {
    pub fn from_corners(corners: [f64; 4]) -> Self {
        Self {
            x0: corners[0],
            y0: corners[1],
            x1: corners[2],
            y1: corners[3],
        }
    }

    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).abs()
    }
}

/// Per-iteration state snapshots recorded when the caller asks for an orbit
/// trace (orbit visualization in the editor).
pub type OrbitTrace = Vec<Vec<Complex>>;

/// An executable orbit program instance.
///
/// The render coordinator calls `init` once, then `render` per pixel. One
/// instance belongs to one worker; instances produced by the same factory
/// never share mutable state.
pub trait Orbit: Send {
    /// Reset variables and rebuild traps. Must be called before `render`.
    fn init(&mut self);

    /// Iterate the orbit from `point`, returning the final iteration count.
    /// When `trace` is given, the full state section is snapshotted after
    /// every iteration.
    fn render(&mut self, point: (f64, f64), trace: Option<&mut OrbitTrace>) -> u32;

    /// The variable table after the last `render`; the leading entries form
    /// the state section the color program consumes.
    fn state(&self) -> &[Complex];

    fn region(&self) -> Region;

    /// Bind the animation clock read by the DSL `time()` builtin.
    fn set_time(&mut self, time: f64);
    fn time(&self) -> f64;

    /// Install an external abort flag, checked between loop iterations.
    fn set_abort(&mut self, abort: Arc<AtomicBool>);

    /// Size of the pre-allocated numeric scratch pool.
    fn number_slots(&self) -> usize;
}
