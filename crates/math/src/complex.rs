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

use std::fmt::Display;
use std::ops::{Add, Mul, Neg, Sub};

/// A complex value as a (re, im) pair of doubles.
///
/// Real values flow through the evaluators as a `Complex` with a zero
/// imaginary part; the compiler's static typing guarantees the imaginary
/// part is never read along real-typed paths.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const ZERO: Complex = Complex { re: 0.0, im: 0.0 };

    #[inline]
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    #[inline]
    pub const fn real(re: f64) -> Self {
        Self { re, im: 0.0 }
    }

    /// The modulus |z|.
    #[inline]
    pub fn modulus(&self) -> f64 {
        self.re.hypot(self.im)
    }

    /// The squared modulus, avoiding the square root in bailout tests.
    #[inline]
    pub fn modulus_sq(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    /// The argument (phase angle) of z.
    #[inline]
    pub fn phase(&self) -> f64 {
        self.im.atan2(self.re)
    }

    #[inline]
    pub fn div(self, rhs: Complex) -> Complex {
        let d = rhs.re * rhs.re + rhs.im * rhs.im;
        Complex {
            re: (self.re * rhs.re + self.im * rhs.im) / d,
            im: (self.im * rhs.re - self.re * rhs.im) / d,
        }
    }

    /// z^x for a real exponent, via polar form.
    pub fn pow_real(self, exp: f64) -> Complex {
        let m = self.modulus().powf(exp);
        let p = self.phase() * exp;
        Complex {
            re: m * p.cos(),
            im: m * p.sin(),
        }
    }

    /// z^w for a complex exponent: exp(w * ln z).
    pub fn pow(self, exp: Complex) -> Complex {
        if exp.im == 0.0 {
            return self.pow_real(exp.re);
        }
        (exp * self.ln()).exp()
    }

    pub fn sqrt(self) -> Complex {
        let m = self.modulus().sqrt();
        let p = self.phase() / 2.0;
        Complex {
            re: m * p.cos(),
            im: m * p.sin(),
        }
    }

    pub fn exp(self) -> Complex {
        let m = self.re.exp();
        Complex {
            re: m * self.im.cos(),
            im: m * self.im.sin(),
        }
    }

    pub fn ln(self) -> Complex {
        Complex {
            re: self.modulus().ln(),
            im: self.phase(),
        }
    }

    pub fn sin(self) -> Complex {
        Complex {
            re: self.re.sin() * self.im.cosh(),
            im: self.re.cos() * self.im.sinh(),
        }
    }

    pub fn cos(self) -> Complex {
        Complex {
            re: self.re.cos() * self.im.cosh(),
            im: -self.re.sin() * self.im.sinh(),
        }
    }

    pub fn tan(self) -> Complex {
        self.sin().div(self.cos())
    }
}

impl Add for Complex {
    type Output = Complex;

    #[inline]
    fn add(self, rhs: Complex) -> Complex {
        Complex {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl Sub for Complex {
    type Output = Complex;

    #[inline]
    fn sub(self, rhs: Complex) -> Complex {
        Complex {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl Mul for Complex {
    type Output = Complex;

    #[inline]
    fn mul(self, rhs: Complex) -> Complex {
        Complex {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl Neg for Complex {
    type Output = Complex;

    #[inline]
    fn neg(self) -> Complex {
        Complex {
            re: -self.re,
            im: -self.im,
        }
    }
}

impl Display for Complex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.im == 0.0 {
            write!(f, "{}", self.re)
        } else {
            write!(f, "({},{})", self.re, self.im)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Complex;
    use crate::EQUIV_EPSILON;
    use std::ops::{Div, Mul};

    fn close(a: Complex, b: Complex) {
        assert!(
            (a.re - b.re).abs() < EQUIV_EPSILON && (a.im - b.im).abs() < EQUIV_EPSILON,
            "{a} != {b}"
        );
    }

    #[test]
    fn test_mul_div_inverse() {
        let z = Complex::new(1.5, -2.25);
        let w = Complex::new(-0.5, 3.0);
        close(z.mul(w).div(w), z);
    }

    #[test]
    fn test_sqrt_squares_back() {
        let z = Complex::new(-3.0, 4.0);
        let r = z.sqrt();
        close(r * r, z);
    }

    #[test]
    fn test_pow_real_matches_repeated_mul() {
        let z = Complex::new(0.3, 0.7);
        close(z.pow_real(3.0), z * z * z);
    }

    #[test]
    fn test_exp_ln_roundtrip() {
        let z = Complex::new(0.8, -1.1);
        close(z.exp().ln(), z);
    }

    #[test]
    fn test_real_embedding() {
        let a = Complex::real(2.0);
        let b = Complex::real(-3.5);
        assert_eq!((a * b).re, -7.0);
        assert_eq!((a * b).im, 0.0);
    }
}
