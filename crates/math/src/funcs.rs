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

//! Real-valued transcendental intrinsics in two flavors: the standard
//! libm-backed versions and approximate versions that trade the last few
//! digits for throughput in the per-pixel loop.
//!
//! The fast variants are only reached when the caller compiled with the
//! fast-math option; the two modules expose the same function set so the
//! evaluators dispatch on a `MathMode` value and nothing else changes.

/// Which arithmetic intrinsics module evaluators use.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum MathMode {
    #[default]
    Standard,
    /// Polynomial approximations for sin/cos/exp, exact for everything else.
    Fast,
}

/// Dispatch table for the real-valued transcendentals the DSL exposes.
#[derive(Debug, Copy, Clone)]
pub struct RealFuncs {
    mode: MathMode,
}

impl RealFuncs {
    pub fn new(mode: MathMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MathMode {
        self.mode
    }

    #[inline]
    pub fn sin(&self, x: f64) -> f64 {
        match self.mode {
            MathMode::Standard => x.sin(),
            MathMode::Fast => fast::sin(x),
        }
    }

    #[inline]
    pub fn cos(&self, x: f64) -> f64 {
        match self.mode {
            MathMode::Standard => x.cos(),
            MathMode::Fast => fast::cos(x),
        }
    }

    #[inline]
    pub fn tan(&self, x: f64) -> f64 {
        match self.mode {
            MathMode::Standard => x.tan(),
            MathMode::Fast => fast::sin(x) / fast::cos(x),
        }
    }

    #[inline]
    pub fn exp(&self, x: f64) -> f64 {
        match self.mode {
            MathMode::Standard => x.exp(),
            MathMode::Fast => fast::exp(x),
        }
    }

    // The remaining intrinsics have no profitable approximation; both modes
    // share the libm versions.

    #[inline]
    pub fn ln(&self, x: f64) -> f64 {
        x.ln()
    }

    #[inline]
    pub fn sqrt(&self, x: f64) -> f64 {
        x.sqrt()
    }

    #[inline]
    pub fn atan2(&self, y: f64, x: f64) -> f64 {
        y.atan2(x)
    }

    #[inline]
    pub fn hypot(&self, x: f64, y: f64) -> f64 {
        x.hypot(y)
    }
}

/// Approximate transcendentals.
///
/// sin/cos use a parabolic approximation with one refinement step, good to
/// roughly 1e-3 absolute error over the full range; exp uses the limit form
/// with 8 squarings. Accuracy bounds are pinned by the tests below.
mod fast {
    use std::f64::consts::PI;

    const TWO_PI: f64 = 2.0 * PI;

    pub fn sin(x: f64) -> f64 {
        // Range-reduce into [-pi, pi).
        let mut x = x % TWO_PI;
        if x >= PI {
            x -= TWO_PI;
        } else if x < -PI {
            x += TWO_PI;
        }
        let b = 4.0 / PI;
        let c = -4.0 / (PI * PI);
        let y = b * x + c * x * x.abs();
        // One step of refinement pulls the error in by an order of magnitude.
        0.775 * y + 0.225 * y * y.abs()
    }

    pub fn cos(x: f64) -> f64 {
        sin(x + PI / 2.0)
    }

    pub fn exp(x: f64) -> f64 {
        // (1 + x/256)^256, clamped to avoid blowup far outside the working
        // range of shading expressions.
        if !(-16.0..=16.0).contains(&x) {
            return x.exp();
        }
        let mut y = 1.0 + x / 256.0;
        for _ in 0..8 {
            y *= y;
        }
        y
    }
}

#[cfg(test)]
mod tests {
    use super::{MathMode, RealFuncs};

    #[test]
    fn test_fast_sin_cos_tolerance() {
        let fast = RealFuncs::new(MathMode::Fast);
        let std_ = RealFuncs::new(MathMode::Standard);
        let mut x = -10.0;
        while x < 10.0 {
            assert!((fast.sin(x) - std_.sin(x)).abs() < 2e-3, "sin({x})");
            assert!((fast.cos(x) - std_.cos(x)).abs() < 2e-3, "cos({x})");
            x += 0.037;
        }
    }

    #[test]
    fn test_fast_exp_tolerance() {
        let fast = RealFuncs::new(MathMode::Fast);
        let mut x = -8.0;
        while x < 8.0 {
            let rel = (fast.exp(x) - x.exp()).abs() / x.exp();
            assert!(rel < 2e-2, "exp({x}) rel err {rel}");
            x += 0.11;
        }
    }

    #[test]
    fn test_shared_intrinsics_identical() {
        let fast = RealFuncs::new(MathMode::Fast);
        assert_eq!(fast.sqrt(2.0), 2.0_f64.sqrt());
        assert_eq!(fast.atan2(1.0, 2.0), 1.0_f64.atan2(2.0));
    }
}
