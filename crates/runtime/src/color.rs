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

use fractum_math::Complex;

/// A packed ARGB color, one byte per channel, alpha in the top byte. The
/// same layout as the `#AARRGGBB` literals in DSL source.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Argb(pub u32);

impl Argb {
    pub const fn from_channels(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Per-channel linear blend toward `other`: `t = 0` keeps `self`,
    /// `t = 1` yields `other`. Used for both palette interpolation and the
    /// ordered opacity-weighted rule fold.
    pub fn mix(self, other: Argb, t: f64) -> Argb {
        let t = t.clamp(0.0, 1.0);
        let lerp = |a: u8, b: u8| -> u8 { (a as f64 + (b as f64 - a as f64) * t).round() as u8 };
        Argb::from_channels(
            lerp(self.alpha(), other.alpha()),
            lerp(self.red(), other.red()),
            lerp(self.green(), other.green()),
            lerp(self.blue(), other.blue()),
        )
    }
}

/// An executable color program instance.
///
/// Per pixel, the coordinator copies the orbit's final state in with
/// `set_state` and calls `render` for the accumulated color.
pub trait Color: Send {
    /// Evaluate palette easing tables and reset variables. Must be called
    /// before `render`.
    fn init(&mut self);

    /// Copy an orbit's final state section into this program's leading
    /// variables.
    fn set_state(&mut self, state: &[Complex]);

    /// Run the init statements and the ordered rule fold over the current
    /// state, yielding one accumulated color.
    fn render(&mut self) -> Argb;

    /// Bind the animation clock read by the DSL `time()` builtin.
    fn set_time(&mut self, time: f64);
    fn time(&self) -> f64;

    /// Size of the pre-allocated numeric scratch pool.
    fn number_slots(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::Argb;

    #[test]
    fn test_channel_packing() {
        let c = Argb(0x80FF40C0);
        assert_eq!(c.alpha(), 0x80);
        assert_eq!(c.red(), 0xFF);
        assert_eq!(c.green(), 0x40);
        assert_eq!(c.blue(), 0xC0);
        assert_eq!(
            Argb::from_channels(0x80, 0xFF, 0x40, 0xC0),
            c
        );
    }

    #[test]
    fn test_mix_endpoints_and_midpoint() {
        let black = Argb(0xFF000000);
        let white = Argb(0xFFFFFFFF);
        assert_eq!(black.mix(white, 0.0), black);
        assert_eq!(black.mix(white, 1.0), white);
        let mid = black.mix(white, 0.5);
        assert_eq!(mid.red(), 128);
        assert_eq!(mid.alpha(), 0xFF);
    }
}
