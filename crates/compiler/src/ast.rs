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

/// The abstract syntax tree produced by the parser and consumed by the
/// expression compiler. Untyped: real-vs-complex typing is resolved during
/// codegen, when variable types are known.
use std::fmt::Display;

/// A source location attached to every node that can produce a diagnostic.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub char_index: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FractalDecl {
    pub orbit: OrbitDecl,
    pub color: ColorDecl,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitDecl {
    /// Two corners of the initial region, as (x0, y0, x1, y1).
    pub region: [f64; 4],
    /// Explicitly declared state variables, shared with the color program.
    pub state: Vec<(String, Position)>,
    pub traps: Vec<TrapDecl>,
    pub begin: Vec<Stmt>,
    pub loop_decl: LoopDecl,
    pub end: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopDecl {
    pub start: u32,
    pub end: u32,
    pub condition: Cond,
    pub body: Vec<Stmt>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrapDecl {
    pub name: String,
    pub center: Expr,
    pub ops: Vec<PathOpDecl>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathOpDecl {
    pub kind: PathOpKind,
    pub args: Vec<Expr>,
    pub position: Position,
}

/// Path building primitives for traps, in absolute or relative coordinates.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PathOpKind {
    MoveTo,
    MoveRel,
    LineTo,
    LineRel,
    ArcTo,
    ArcRel,
    QuadTo,
    QuadRel,
    CurveTo,
    CurveRel,
    Close,
}

impl PathOpKind {
    pub fn from_keyword(kw: &str) -> Option<Self> {
        Some(match kw {
            "moveto" => Self::MoveTo,
            "moverel" => Self::MoveRel,
            "lineto" => Self::LineTo,
            "linerel" => Self::LineRel,
            "arcto" => Self::ArcTo,
            "arcrel" => Self::ArcRel,
            "quadto" => Self::QuadTo,
            "quadrel" => Self::QuadRel,
            "curveto" => Self::CurveTo,
            "curverel" => Self::CurveRel,
            "close" => Self::Close,
            _ => return None,
        })
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::MoveTo => "moveto",
            Self::MoveRel => "moverel",
            Self::LineTo => "lineto",
            Self::LineRel => "linerel",
            Self::ArcTo => "arcto",
            Self::ArcRel => "arcrel",
            Self::QuadTo => "quadto",
            Self::QuadRel => "quadrel",
            Self::CurveTo => "curveto",
            Self::CurveRel => "curverel",
            Self::Close => "close",
        }
    }

    /// Number of control points the operator takes.
    pub fn arity(&self) -> usize {
        match self {
            Self::MoveTo | Self::MoveRel | Self::LineTo | Self::LineRel => 1,
            Self::ArcTo | Self::ArcRel | Self::QuadTo | Self::QuadRel => 2,
            Self::CurveTo | Self::CurveRel => 3,
            Self::Close => 0,
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(
            self,
            Self::MoveRel | Self::LineRel | Self::ArcRel | Self::QuadRel | Self::CurveRel
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorDecl {
    /// Background color from the `color(#AARRGGBB)` header.
    pub background: u32,
    pub palettes: Vec<PaletteDecl>,
    pub init: Vec<Stmt>,
    pub rules: Vec<RuleDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteDecl {
    pub name: String,
    pub elements: Vec<PaletteElementDecl>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteElementDecl {
    pub begin: u32,
    pub end: u32,
    pub steps: u32,
    pub easing: Option<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleDecl {
    pub condition: Cond,
    pub opacity: Expr,
    pub body: ColorExpr,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColorExpr {
    Literal(u32, Position),
    Palette {
        name: String,
        index: Expr,
        position: Position,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub node: StmtNode,
    pub position: Position,
}

impl Stmt {
    pub fn new(node: StmtNode, position: Position) -> Self {
        Stmt { node, position }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtNode {
    Assign {
        name: String,
        expr: Expr,
    },
    If {
        condition: Cond,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub node: ExprNode,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    Real(f64),
    /// Imaginary-literal shorthand, e.g. `1.5i`.
    Imaginary(f64),
    Id(String),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    /// `(re, im)` — combine two real expressions into a complex value.
    Combine(Box<Expr>, Box<Expr>),
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Sub => write!(f, "-"),
            Self::Mul => write!(f, "*"),
            Self::Div => write!(f, "/"),
            Self::Pow => write!(f, "^"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cond {
    pub node: CondNode,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CondNode {
    And(Box<Cond>, Box<Cond>),
    Or(Box<Cond>, Box<Cond>),
    Xor(Box<Cond>, Box<Cond>),
    Compare(CompOp, Expr, Expr),
    Trap {
        name: String,
        arg: Expr,
        negated: bool,
    },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompOp {
    Lt,
    Gt,
    LtE,
    GtE,
    Eq,
    NEq,
}

impl CompOp {
    pub fn from_token(tok: &str) -> Option<Self> {
        Some(match tok {
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::LtE,
            ">=" => Self::GtE,
            "=" => Self::Eq,
            "<>" => Self::NEq,
            _ => return None,
        })
    }

    /// Ordered comparisons are only defined on real operands.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, Self::Eq | Self::NEq)
    }
}

impl Display for CompOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lt => write!(f, "<"),
            Self::Gt => write!(f, ">"),
            Self::LtE => write!(f, "<="),
            Self::GtE => write!(f, ">="),
            Self::Eq => write!(f, "="),
            Self::NEq => write!(f, "<>"),
        }
    }
}
