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

/// Registry of built-in function descriptors: fixed arity and per-function
/// type constraints, checked by the expression compiler.
use lazy_static::lazy_static;
use std::collections::HashMap;

/// The closed set of built-in functions the DSL exposes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Func {
    // Component / projection functions, always real-valued.
    Re,
    Im,
    Mod,
    Pha,
    // Real-only functions.
    Abs,
    Floor,
    Ceil,
    Atan2,
    Hypot,
    Min,
    Max,
    // Animation parameter.
    Time,
    // Argument-typed: real in, real out; complex in, complex out.
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Sqrt,
    // Complex or real base, real exponent.
    Pow,
}

/// What an argument slot accepts.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ArgKind {
    /// Real-valued expression required.
    Real,
    /// Real or complex accepted.
    Any,
}

pub struct Builtin {
    pub name: &'static str,
    pub func: Func,
    pub args: &'static [ArgKind],
}

impl Func {
    /// Whether the result is real, given the realness of each argument.
    pub fn result_is_real(&self, args_real: &[bool]) -> bool {
        match self {
            Func::Re
            | Func::Im
            | Func::Mod
            | Func::Pha
            | Func::Abs
            | Func::Floor
            | Func::Ceil
            | Func::Atan2
            | Func::Hypot
            | Func::Min
            | Func::Max
            | Func::Time => true,
            Func::Sin | Func::Cos | Func::Tan | Func::Exp | Func::Log | Func::Sqrt => args_real[0],
            Func::Pow => args_real[0],
        }
    }
}

const BUILTIN_DESCRIPTORS: &[Builtin] = &[
    Builtin { name: "re", func: Func::Re, args: &[ArgKind::Any] },
    Builtin { name: "im", func: Func::Im, args: &[ArgKind::Any] },
    Builtin { name: "mod", func: Func::Mod, args: &[ArgKind::Any] },
    Builtin { name: "pha", func: Func::Pha, args: &[ArgKind::Any] },
    Builtin { name: "abs", func: Func::Abs, args: &[ArgKind::Real] },
    Builtin { name: "floor", func: Func::Floor, args: &[ArgKind::Real] },
    Builtin { name: "ceil", func: Func::Ceil, args: &[ArgKind::Real] },
    Builtin { name: "atan2", func: Func::Atan2, args: &[ArgKind::Real, ArgKind::Real] },
    Builtin { name: "hypot", func: Func::Hypot, args: &[ArgKind::Real, ArgKind::Real] },
    Builtin { name: "min", func: Func::Min, args: &[ArgKind::Real, ArgKind::Real] },
    Builtin { name: "max", func: Func::Max, args: &[ArgKind::Real, ArgKind::Real] },
    Builtin { name: "time", func: Func::Time, args: &[] },
    Builtin { name: "sin", func: Func::Sin, args: &[ArgKind::Any] },
    Builtin { name: "cos", func: Func::Cos, args: &[ArgKind::Any] },
    Builtin { name: "tan", func: Func::Tan, args: &[ArgKind::Any] },
    Builtin { name: "exp", func: Func::Exp, args: &[ArgKind::Any] },
    Builtin { name: "log", func: Func::Log, args: &[ArgKind::Any] },
    Builtin { name: "sqrt", func: Func::Sqrt, args: &[ArgKind::Any] },
    Builtin { name: "pow", func: Func::Pow, args: &[ArgKind::Any, ArgKind::Real] },
];

lazy_static! {
    static ref BUILTINS_BY_NAME: HashMap<&'static str, &'static Builtin> = {
        let mut m = HashMap::new();
        for b in BUILTIN_DESCRIPTORS {
            m.insert(b.name, b);
        }
        m
    };
}

pub fn builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS_BY_NAME.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::{builtin, Func};

    #[test]
    fn test_lookup_and_arity() {
        assert_eq!(builtin("sin").unwrap().func, Func::Sin);
        assert_eq!(builtin("atan2").unwrap().args.len(), 2);
        assert_eq!(builtin("time").unwrap().args.len(), 0);
        assert!(builtin("frobnicate").is_none());
    }

    #[test]
    fn test_result_typing() {
        assert!(Func::Mod.result_is_real(&[false]));
        assert!(Func::Sin.result_is_real(&[true]));
        assert!(!Func::Sin.result_is_real(&[false]));
        assert!(!Func::Pow.result_is_real(&[false, true]));
        assert!(Func::Pow.result_is_real(&[true, true]));
    }
}
