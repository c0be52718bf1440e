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

//! The factory contract consumed by the render coordinator.
//!
//! A factory is the immutable product of one successful compile. `create`
//! is called once per render worker and every instance owns its variable
//! table and scratch pool, so concurrent workers never contend.

use std::sync::Arc;

use fractum_compiler::program::FractalProgram;

use crate::color::Color;
use crate::interp::{InterpretedColor, InterpretedOrbit};
use crate::orbit::Orbit;

pub trait OrbitFactory: Send + Sync {
    fn create(&self) -> Box<dyn Orbit>;
}

pub trait ColorFactory: Send + Sync {
    fn create(&self) -> Box<dyn Color>;
}

/// The paired output of one pipeline run.
#[derive(Clone)]
pub struct Factories {
    pub orbit: Arc<dyn OrbitFactory>,
    pub color: Arc<dyn ColorFactory>,
}

pub struct InterpOrbitFactory {
    program: Arc<FractalProgram>,
}

impl InterpOrbitFactory {
    pub fn new(program: Arc<FractalProgram>) -> Self {
        Self { program }
    }
}

impl OrbitFactory for InterpOrbitFactory {
    fn create(&self) -> Box<dyn Orbit> {
        Box::new(InterpretedOrbit::new(self.program.clone()))
    }
}

pub struct InterpColorFactory {
    program: Arc<FractalProgram>,
}

impl InterpColorFactory {
    pub fn new(program: Arc<FractalProgram>) -> Self {
        Self { program }
    }
}

impl ColorFactory for InterpColorFactory {
    fn create(&self) -> Box<dyn Color> {
        Box::new(InterpretedColor::new(self.program.clone()))
    }
}
