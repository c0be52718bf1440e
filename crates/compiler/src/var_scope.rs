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

use strum::{Display, EnumIter, IntoEnumIterator};

/// Names predeclared in every program scope.
///
/// All of these are real-valued state variables: `xstart`/`ystart` carry the
/// per-pixel start point, `n` the loop's iteration counter, `s` the palette
/// position during easing evaluation. `pi` and `e` are constants.
#[derive(Debug, Copy, Clone, Eq, PartialEq, EnumIter, Display)]
#[strum(serialize_all = "lowercase")]
pub enum GlobalName {
    Xstart,
    Ystart,
    N,
    Pi,
    E,
    S,
}

impl GlobalName {
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Xstart | Self::Ystart | Self::Pi | Self::E | Self::S)
    }
}

/// A variable declaration in the registry.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Decl {
    pub name: String,
    /// Scope depth the variable was declared at.
    pub depth: usize,
    /// `None` until the first assignment or use fixes the type.
    pub is_real: Option<bool>,
    /// State variables persist across loop iterations and are shared with
    /// the color program.
    pub is_state: bool,
    /// Reject assignments (predeclared inputs and constants).
    pub constant: bool,
}

/// Scope-aware variable registry with single-pass declare-before-use
/// semantics: a stack of lexical scopes over a flat declaration table.
/// Every declaration keeps its table slot after its scope is popped, so the
/// table length is the instance variable-pool size and each variable has a
/// stable index into it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VarScope {
    variables: Vec<Decl>,
    scopes: Vec<Vec<u16>>,
}

impl Default for VarScope {
    fn default() -> Self {
        Self {
            variables: vec![],
            scopes: vec![Vec::new()],
        }
    }
}

impl VarScope {
    /// A fresh registry with the predeclared globals in scope 0.
    pub fn new() -> Self {
        let mut scope = Self::default();
        for global in GlobalName::iter() {
            scope.declare_in_current(
                &global.to_string(),
                Some(true),
                true,
                global.is_constant(),
            );
        }
        scope
    }

    /// Find a variable by name, innermost scope first.
    pub fn find(&self, name: &str) -> Option<u16> {
        for scope in self.scopes.iter().rev() {
            for &idx in scope.iter().rev() {
                if self.variables[idx as usize].name == name {
                    return Some(idx);
                }
            }
        }
        None
    }

    /// Declare a new variable in the current scope. Shadows any declaration
    /// of the same name in an enclosing scope.
    pub fn declare_in_current(
        &mut self,
        name: &str,
        is_real: Option<bool>,
        is_state: bool,
        constant: bool,
    ) -> u16 {
        let idx = self.variables.len() as u16;
        self.variables.push(Decl {
            name: name.to_string(),
            depth: self.scopes.len() - 1,
            is_real,
            is_state,
            constant,
        });
        self.scopes.last_mut().expect("scope stack empty").push(idx);
        idx
    }

    /// Fix an untyped variable's type at its first assignment or use.
    pub fn fix_type(&mut self, idx: u16, is_real: bool) {
        let decl = &mut self.variables[idx as usize];
        if decl.is_real.is_none() {
            decl.is_real = Some(is_real);
        }
    }

    pub fn decl(&self, idx: u16) -> &Decl {
        &self.variables[idx as usize]
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop().expect("scope stack underflow");
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn decls(&self) -> &[Decl] {
        &self.variables
    }

    /// Number of leading declarations that are state variables. The state
    /// section is contiguous because globals are predeclared first and user
    /// state variables are registered before any other declaration.
    pub fn state_len(&self) -> usize {
        self.variables
            .iter()
            .take_while(|d| d.is_state)
            .count()
    }
}
