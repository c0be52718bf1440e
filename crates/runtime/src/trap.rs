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

//! Orbit traps: named geometric paths tested for containment from coloring
//! conditions.
//!
//! A trap's path operators are evaluated once at orbit `init`, curves are
//! flattened to polylines here, and the per-iteration `contains` test is a
//! plain even-odd crossing count over the flattened subpaths.

use itertools::Itertools;

/// Curve flattening resolution. Containment tests only need the polyline to
/// be visually faithful, not exact.
const FLATTEN_SEGMENTS: usize = 16;

type Point = (f64, f64);

/// A flattened trap path, ready for containment tests.
#[derive(Debug, Clone, Default)]
pub struct Trap {
    subpaths: Vec<Vec<Point>>,
}

impl Trap {
    /// Even-odd containment over all subpaths. Subpaths are implicitly
    /// closed whether or not the DSL path said `close()`.
    pub fn contains(&self, point: Point) -> bool {
        let (px, py) = point;
        let mut inside = false;
        for path in &self.subpaths {
            if path.len() < 3 {
                continue;
            }
            for (&(xi, yi), &(xj, yj)) in path.iter().circular_tuple_windows() {
                if (yi > py) != (yj > py) {
                    let x_cross = xi + (py - yi) / (yj - yi) * (xj - xi);
                    if px < x_cross {
                        inside = !inside;
                    }
                }
            }
        }
        inside
    }
}

/// Incremental path construction from the DSL's move/line/quad/curve/arc
/// operators. Absolute coordinates are offsets from the trap's declared
/// center; relative coordinates are offsets from the current cursor.
pub struct PathBuilder {
    center: Point,
    subpaths: Vec<Vec<Point>>,
    current: Vec<Point>,
    cursor: Point,
}

impl PathBuilder {
    pub fn new(center: Point) -> Self {
        Self {
            center,
            subpaths: vec![],
            current: vec![],
            cursor: center,
        }
    }

    fn resolve(&self, p: Point, relative: bool) -> Point {
        if relative {
            (self.cursor.0 + p.0, self.cursor.1 + p.1)
        } else {
            (self.center.0 + p.0, self.center.1 + p.1)
        }
    }

    fn flush(&mut self) {
        if self.current.len() >= 2 {
            self.subpaths.push(std::mem::take(&mut self.current));
        } else {
            self.current.clear();
        }
    }

    pub fn move_to(&mut self, p: Point, relative: bool) {
        let p = self.resolve(p, relative);
        self.flush();
        self.current.push(p);
        self.cursor = p;
    }

    pub fn line_to(&mut self, p: Point, relative: bool) {
        let p = self.resolve(p, relative);
        self.current.push(p);
        self.cursor = p;
    }

    pub fn quad_to(&mut self, control: Point, end: Point, relative: bool) {
        let control = self.resolve(control, relative);
        let end = self.resolve(end, relative);
        let start = self.cursor;
        for step in 1..=FLATTEN_SEGMENTS {
            let t = step as f64 / FLATTEN_SEGMENTS as f64;
            self.current.push(quad_point(start, control, end, t));
        }
        self.cursor = end;
    }

    pub fn curve_to(&mut self, c1: Point, c2: Point, end: Point, relative: bool) {
        let c1 = self.resolve(c1, relative);
        let c2 = self.resolve(c2, relative);
        let end = self.resolve(end, relative);
        let start = self.cursor;
        for step in 1..=FLATTEN_SEGMENTS {
            let t = step as f64 / FLATTEN_SEGMENTS as f64;
            self.current.push(cubic_point(start, c1, c2, end, t));
        }
        self.cursor = end;
    }

    /// Arc segments are approximated by the quadratic through the control
    /// point, which matches the shapes the editor produces closely enough
    /// for containment tests.
    pub fn arc_to(&mut self, control: Point, end: Point, relative: bool) {
        self.quad_to(control, end, relative);
    }

    pub fn close(&mut self) {
        self.flush();
    }

    pub fn finish(mut self) -> Trap {
        self.flush();
        Trap {
            subpaths: self.subpaths,
        }
    }
}

fn quad_point(p0: Point, p1: Point, p2: Point, t: f64) -> Point {
    let u = 1.0 - t;
    (
        u * u * p0.0 + 2.0 * u * t * p1.0 + t * t * p2.0,
        u * u * p0.1 + 2.0 * u * t * p1.1 + t * t * p2.1,
    )
}

fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let u = 1.0 - t;
    (
        u * u * u * p0.0 + 3.0 * u * u * t * p1.0 + 3.0 * u * t * t * p2.0 + t * t * t * p3.0,
        u * u * u * p0.1 + 3.0 * u * u * t * p1.1 + 3.0 * u * t * t * p2.1 + t * t * t * p3.1,
    )
}

#[cfg(test)]
mod tests {
    use super::PathBuilder;

    fn unit_square() -> super::Trap {
        let mut b = PathBuilder::new((0.0, 0.0));
        b.move_to((-1.0, -1.0), false);
        b.line_to((1.0, -1.0), false);
        b.line_to((1.0, 1.0), false);
        b.line_to((-1.0, 1.0), false);
        b.close();
        b.finish()
    }

    #[test]
    fn test_square_containment() {
        let square = unit_square();
        assert!(square.contains((0.0, 0.0)));
        assert!(square.contains((0.9, -0.9)));
        assert!(!square.contains((1.5, 0.0)));
        assert!(!square.contains((0.0, -2.0)));
    }

    #[test]
    fn test_center_offsets_path() {
        let mut b = PathBuilder::new((10.0, 10.0));
        b.move_to((-1.0, -1.0), false);
        b.line_to((1.0, -1.0), false);
        b.line_to((1.0, 1.0), false);
        b.line_to((-1.0, 1.0), false);
        let trap = b.finish();
        assert!(trap.contains((10.0, 10.0)));
        assert!(!trap.contains((0.0, 0.0)));
    }

    #[test]
    fn test_relative_ops_chain_from_cursor() {
        let mut b = PathBuilder::new((0.0, 0.0));
        b.move_to((0.0, 0.0), false);
        b.line_to((2.0, 0.0), true);
        b.line_to((0.0, 2.0), true);
        b.line_to((-2.0, 0.0), true);
        let trap = b.finish();
        assert!(trap.contains((1.0, 1.0)));
        assert!(!trap.contains((-1.0, 1.0)));
    }

    #[test]
    fn test_flattened_circle_approximation() {
        // Four quadratics tracing a rough circle of radius 1.
        let mut b = PathBuilder::new((0.0, 0.0));
        b.move_to((1.0, 0.0), false);
        b.quad_to((1.0, 1.0), (0.0, 1.0), false);
        b.quad_to((-1.0, 1.0), (-1.0, 0.0), false);
        b.quad_to((-1.0, -1.0), (0.0, -1.0), false);
        b.quad_to((1.0, -1.0), (1.0, 0.0), false);
        let trap = b.finish();
        assert!(trap.contains((0.0, 0.0)));
        assert!(trap.contains((0.3, 0.3)));
        assert!(!trap.contains((0.9, 0.9)));
    }

    #[test]
    fn test_multiple_subpaths_even_odd() {
        // An outer square with an inner square hole.
        let mut b = PathBuilder::new((0.0, 0.0));
        b.move_to((-2.0, -2.0), false);
        b.line_to((2.0, -2.0), false);
        b.line_to((2.0, 2.0), false);
        b.line_to((-2.0, 2.0), false);
        b.close();
        b.move_to((-1.0, -1.0), false);
        b.line_to((1.0, -1.0), false);
        b.line_to((1.0, 1.0), false);
        b.line_to((-1.0, 1.0), false);
        b.close();
        let trap = b.finish();
        assert!(trap.contains((1.5, 0.0)));
        assert!(!trap.contains((0.0, 0.0)));
        assert!(!trap.contains((3.0, 0.0)));
    }
}
