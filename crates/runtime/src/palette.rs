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

//! Palettes: gradient ramps baked into lookup tables at `init`.
//!
//! Each element contributes `steps` entries interpolated from its begin to
//! its end color. An element's easing expression reshapes the interpolation:
//! it is evaluated over the predeclared real `s` swept through [0,1), and
//! its clamped result picks the blend position for that entry.

use fractum_compiler::program::{PaletteProgram, TypedExpr};

use crate::color::Argb;

#[derive(Debug, Clone, Default)]
pub struct Palette {
    table: Vec<Argb>,
}

impl Palette {
    /// Bake a palette program into its lookup table. `easing_eval` runs an
    /// easing expression with `s` bound to the given position; it is the
    /// caller's evaluator so easing shares the program's variable table and
    /// scratch pool.
    pub fn bake<F>(program: &PaletteProgram, mut easing_eval: F) -> Palette
    where
        F: FnMut(&TypedExpr, f64) -> f64,
    {
        let mut table = vec![];
        for element in &program.elements {
            let begin = Argb(element.begin);
            let end = Argb(element.end);
            let steps = element.steps.max(1);
            for step in 0..steps {
                // Sweep [0,1) so chained elements meet without a doubled
                // boundary entry.
                let s = step as f64 / steps as f64;
                let t = match &element.easing {
                    Some(expr) => easing_eval(expr, s).clamp(0.0, 1.0),
                    None => s,
                };
                table.push(begin.mix(end, t));
            }
        }
        Palette { table }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Look up by table position. Fractional positions truncate; positions
    /// outside the table wrap, so an unbounded iteration count cycles
    /// through the gradient.
    pub fn get(&self, t: f64) -> Argb {
        if self.table.is_empty() {
            return Argb::default();
        }
        let len = self.table.len() as f64;
        let mut t = t % len;
        if t < 0.0 {
            t += len;
        }
        self.table[t.floor() as usize % self.table.len()]
    }
}

#[cfg(test)]
mod tests {
    use fractum_compiler::program::{PaletteElement, PaletteProgram};

    use super::Palette;
    use crate::color::Argb;

    fn ramp(steps: u32) -> PaletteProgram {
        PaletteProgram {
            name: "ramp".to_string(),
            elements: vec![PaletteElement {
                begin: 0xFF000000,
                end: 0xFFFFFFFF,
                steps,
                easing: None,
            }],
        }
    }

    #[test]
    fn test_bake_sizes_table() {
        let palette = Palette::bake(&ramp(64), |_, s| s);
        assert_eq!(palette.len(), 64);
    }

    #[test]
    fn test_linear_ramp_endpoints() {
        let palette = Palette::bake(&ramp(256), |_, s| s);
        assert_eq!(palette.get(0.0), Argb(0xFF000000));
        // The last entry sits one step shy of the end color.
        assert!(palette.get(255.0).red() > 0xF0);
    }

    #[test]
    fn test_get_wraps_out_of_range() {
        let palette = Palette::bake(&ramp(16), |_, s| s);
        assert_eq!(palette.get(16.0), palette.get(0.0));
        assert_eq!(palette.get(-1.0), palette.get(15.0));
    }

    #[test]
    fn test_easing_reshapes_ramp() {
        let mut program = ramp(100);
        // Mark the element as eased; the evaluator below squares `s`.
        program.elements[0].easing =
            Some(fractum_compiler::program::TypedExpr::Const(0.0));
        let eased = Palette::bake(&program, |_, s| s * s);
        let linear = Palette::bake(&ramp(100), |_, s| s);
        // Squaring darkens the first half of the ramp.
        assert!(eased.get(50.0).red() < linear.get(50.0).red());
    }
}
