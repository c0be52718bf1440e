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

/// Kicks off the pest parser and converts the pair tree into our AST.
/// This is the main entry point for parsing.
use std::cell::RefCell;
use std::rc::Rc;

use lazy_static::lazy_static;
pub use pest::Parser as PestParser;
use pest::error::{InputLocation, LineColLocation};
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};

use crate::ast::{
    BinaryOp, ColorDecl, ColorExpr, CompOp, Cond, CondNode, Expr, ExprNode, FractalDecl, LoopDecl,
    OrbitDecl, PaletteDecl, PaletteElementDecl, PathOpDecl, PathOpKind, Position, RuleDecl, Stmt,
    StmtNode, TrapDecl,
};
use crate::errors::{CompileContext, CompileError, Diagnostic, DiagnosticKind};

pub mod fractum {
    #[derive(Parser)]
    #[grammar = "src/fractum.pest"]
    pub struct FractumParser;
}

use fractum::{FractumParser, Rule};

/// Configuration flags read by the compiler core, owned by the caller.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CompileOptions {
    /// Select the approximate arithmetic intrinsics module instead of the
    /// standard one.
    pub fast_math: bool,
    /// Force orbit and color into a single generated unit, disabling the
    /// render coordinator's differential-recompilation optimization. A
    /// debugging aid.
    pub combined_unit: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            fast_math: false,
            combined_unit: false,
        }
    }
}

lazy_static! {
    static ref EXPR_PARSER: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left) | Op::infix(Rule::div, Assoc::Left))
        .op(Op::prefix(Rule::neg))
        .op(Op::infix(Rule::pow, Assoc::Right));
}

pub struct TreeTransformer {
    // RefCell because the PrattParser closures borrow the transformer
    // immutably while recovery diagnostics are appended.
    diagnostics: RefCell<Vec<Diagnostic>>,
}

fn position(pair: &Pair<Rule>) -> Position {
    let span = pair.as_span();
    let (line, column) = span.start_pos().line_col();
    Position {
        line,
        column,
        char_index: span.start(),
        length: span.end() - span.start(),
    }
}

fn context(pair: &Pair<Rule>) -> CompileContext {
    CompileContext::new(position(pair))
}

impl TreeTransformer {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            diagnostics: RefCell::new(vec![]),
        })
    }

    fn transform_program(self: Rc<Self>, pairs: Pairs<Rule>) -> Result<FractalDecl, CompileError> {
        // The top level yields a single `program` pair wrapping the fractal
        // node, so descend through the whole tree rather than one layer.
        for pair in pairs.flatten() {
            if pair.as_rule() == Rule::fractal {
                return self.transform_fractal(pair);
            }
        }
        Err(CompileError::Internal(
            "parse produced no fractal node".to_string(),
        ))
    }

    fn transform_fractal(self: Rc<Self>, pair: Pair<Rule>) -> Result<FractalDecl, CompileError> {
        let mut orbit = None;
        let mut color = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::orbit => orbit = Some(self.clone().transform_orbit(inner)?),
                Rule::color => color = Some(self.clone().transform_color(inner)?),
                _ => {}
            }
        }
        Ok(FractalDecl {
            orbit: orbit.expect("grammar guarantees an orbit section"),
            color: color.expect("grammar guarantees a color section"),
        })
    }

    fn transform_orbit(self: Rc<Self>, pair: Pair<Rule>) -> Result<OrbitDecl, CompileError> {
        let mut region = [0.0; 4];
        let mut state = vec![];
        let mut traps = vec![];
        let mut begin = vec![];
        let mut loop_decl = None;
        let mut end = vec![];
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::region => {
                    for (i, num) in inner.into_inner().enumerate() {
                        region[i] = parse_f64(&num)?;
                    }
                }
                Rule::state_list => {
                    for id in inner.into_inner() {
                        state.push((id.as_str().to_string(), position(&id)));
                    }
                }
                Rule::trap_decl => traps.push(self.clone().transform_trap(inner)?),
                Rule::begin_section => {
                    begin = self.clone().transform_section(inner)?;
                }
                Rule::loop_block => {
                    loop_decl = Some(self.clone().transform_loop(inner)?);
                }
                Rule::end_section => {
                    end = self.clone().transform_section(inner)?;
                }
                _ => {}
            }
        }
        Ok(OrbitDecl {
            region,
            state,
            traps,
            begin,
            loop_decl: loop_decl.expect("grammar guarantees a loop block"),
            end,
        })
    }

    /// A begin/end section: either an explicit `begin { .. }` / `end { .. }`
    /// block or a bare statement list; both produce the same statement vec.
    fn transform_section(self: Rc<Self>, pair: Pair<Rule>) -> Result<Vec<Stmt>, CompileError> {
        let mut stmts = vec![];
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::begin_block | Rule::end_block => {
                    for block in inner.into_inner() {
                        if block.as_rule() == Rule::block {
                            stmts.extend(self.clone().transform_block(block)?);
                        }
                    }
                }
                Rule::statement => {
                    stmts.extend(self.clone().transform_statement(inner)?);
                }
                _ => {}
            }
        }
        Ok(stmts)
    }

    fn transform_loop(self: Rc<Self>, pair: Pair<Rule>) -> Result<LoopDecl, CompileError> {
        let pos = position(&pair);
        let mut bounds = vec![];
        let mut condition = None;
        let mut body = vec![];
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::integer => bounds.push(parse_u32(&inner)?),
                Rule::cond => condition = Some(self.clone().transform_cond(inner)?),
                Rule::block => body = self.clone().transform_block(inner)?,
                _ => {}
            }
        }
        Ok(LoopDecl {
            start: bounds[0],
            end: bounds[1],
            condition: condition.expect("grammar guarantees a stop condition"),
            body,
            position: pos,
        })
    }

    fn transform_trap(self: Rc<Self>, pair: Pair<Rule>) -> Result<TrapDecl, CompileError> {
        let pos = position(&pair);
        let mut name = String::new();
        let mut center = None;
        let mut ops = vec![];
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::ident => name = inner.as_str().to_string(),
                Rule::expr => center = Some(self.clone().parse_expr(inner)?),
                Rule::path_op => ops.push(self.clone().transform_path_op(inner)?),
                _ => {}
            }
        }
        Ok(TrapDecl {
            name,
            center: center.expect("grammar guarantees a trap center"),
            ops,
            position: pos,
        })
    }

    fn transform_path_op(self: Rc<Self>, pair: Pair<Rule>) -> Result<PathOpDecl, CompileError> {
        let pos = position(&pair);
        let mut kind = PathOpKind::Close;
        let mut args = vec![];
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::path_kind => {
                    kind = PathOpKind::from_keyword(inner.as_str())
                        .expect("grammar guarantees a known path keyword");
                }
                Rule::path_args => {
                    for arg in inner.into_inner() {
                        args.push(self.clone().parse_expr(arg)?);
                    }
                }
                _ => {}
            }
        }
        Ok(PathOpDecl {
            kind,
            args,
            position: pos,
        })
    }

    fn transform_color(self: Rc<Self>, pair: Pair<Rule>) -> Result<ColorDecl, CompileError> {
        let mut background = 0;
        let mut palettes = vec![];
        let mut init = vec![];
        let mut rules = vec![];
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::color_lit => background = parse_color(&inner)?,
                Rule::palette_decl => palettes.push(self.clone().transform_palette(inner)?),
                Rule::init_block => {
                    for block in inner.into_inner() {
                        if block.as_rule() == Rule::block {
                            init = self.clone().transform_block(block)?;
                        }
                    }
                }
                Rule::rule_decl => rules.push(self.clone().transform_rule(inner)?),
                _ => {}
            }
        }
        Ok(ColorDecl {
            background,
            palettes,
            init,
            rules,
        })
    }

    fn transform_palette(self: Rc<Self>, pair: Pair<Rule>) -> Result<PaletteDecl, CompileError> {
        let pos = position(&pair);
        let mut name = String::new();
        let mut elements = vec![];
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::ident => name = inner.as_str().to_string(),
                Rule::palette_element => {
                    let elem_pos = position(&inner);
                    let mut colors = vec![];
                    let mut steps = 0;
                    let mut easing = None;
                    for part in inner.into_inner() {
                        match part.as_rule() {
                            Rule::color_lit => colors.push(parse_color(&part)?),
                            Rule::integer => steps = parse_u32(&part)?,
                            Rule::expr => easing = Some(self.clone().parse_expr(part)?),
                            _ => {}
                        }
                    }
                    elements.push(PaletteElementDecl {
                        begin: colors[0],
                        end: colors[1],
                        steps,
                        easing,
                        position: elem_pos,
                    });
                }
                _ => {}
            }
        }
        Ok(PaletteDecl {
            name,
            elements,
            position: pos,
        })
    }

    fn transform_rule(self: Rc<Self>, pair: Pair<Rule>) -> Result<RuleDecl, CompileError> {
        let pos = position(&pair);
        let mut condition = None;
        let mut opacity = None;
        let mut body = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::cond => condition = Some(self.clone().transform_cond(inner)?),
                Rule::expr => opacity = Some(self.clone().parse_expr(inner)?),
                Rule::color_expr => body = Some(self.clone().transform_color_expr(inner)?),
                _ => {}
            }
        }
        Ok(RuleDecl {
            condition: condition.expect("grammar guarantees a rule condition"),
            opacity: opacity.expect("grammar guarantees a rule opacity"),
            body: body.expect("grammar guarantees a rule body"),
            position: pos,
        })
    }

    fn transform_color_expr(self: Rc<Self>, pair: Pair<Rule>) -> Result<ColorExpr, CompileError> {
        let inner = pair
            .into_inner()
            .next()
            .expect("grammar guarantees a color expression");
        match inner.as_rule() {
            Rule::color_lit => {
                let pos = position(&inner);
                Ok(ColorExpr::Literal(parse_color(&inner)?, pos))
            }
            Rule::palette_ref => {
                let pos = position(&inner);
                let mut name = String::new();
                let mut index = None;
                for part in inner.into_inner() {
                    match part.as_rule() {
                        Rule::ident => name = part.as_str().to_string(),
                        Rule::expr => index = Some(self.clone().parse_expr(part)?),
                        _ => {}
                    }
                }
                Ok(ColorExpr::Palette {
                    name,
                    index: index.expect("grammar guarantees a palette index"),
                    position: pos,
                })
            }
            _ => Err(CompileError::Internal(format!(
                "unexpected color expression node: {:?}",
                inner.as_rule()
            ))),
        }
    }

    fn transform_block(self: Rc<Self>, pair: Pair<Rule>) -> Result<Vec<Stmt>, CompileError> {
        let mut stmts = vec![];
        for inner in pair.into_inner() {
            if inner.as_rule() == Rule::statement {
                stmts.extend(self.clone().transform_statement(inner)?);
            }
        }
        Ok(stmts)
    }

    /// One `statement` node can produce several AST statements (the
    /// comma-separated assignment form) or none at all: a `bad_stmt` is the
    /// recovery rule, which records a syntax diagnostic and moves on so the
    /// whole parse reports every problem in one pass.
    fn transform_statement(self: Rc<Self>, pair: Pair<Rule>) -> Result<Vec<Stmt>, CompileError> {
        let inner = pair
            .into_inner()
            .next()
            .expect("grammar guarantees statement content");
        match inner.as_rule() {
            Rule::assign_stmt => {
                let mut stmts = vec![];
                for assign in inner.into_inner() {
                    if assign.as_rule() != Rule::assign {
                        continue;
                    }
                    let pos = position(&assign);
                    let mut parts = assign.into_inner();
                    let name = parts.next().expect("assign target").as_str().to_string();
                    let expr = self
                        .clone()
                        .parse_expr(parts.next().expect("assign value"))?;
                    stmts.push(Stmt::new(StmtNode::Assign { name, expr }, pos));
                }
                Ok(stmts)
            }
            Rule::if_stmt => Ok(vec![self.transform_if(inner)?]),
            Rule::bad_stmt => {
                let pos = position(&inner);
                self.diagnostics.borrow_mut().push(Diagnostic {
                    kind: DiagnosticKind::Syntax,
                    line: pos.line,
                    column: pos.column,
                    char_index: pos.char_index,
                    length: pos.length,
                    message: format!("unrecognized statement `{}`", inner.as_str().trim()),
                });
                Ok(vec![])
            }
            _ => Err(CompileError::Internal(format!(
                "unexpected statement node: {:?}",
                inner.as_rule()
            ))),
        }
    }

    fn transform_if(self: Rc<Self>, pair: Pair<Rule>) -> Result<Stmt, CompileError> {
        let pos = position(&pair);
        let mut condition = None;
        let mut blocks: Vec<Vec<Stmt>> = vec![];
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::cond => condition = Some(self.clone().transform_cond(inner)?),
                Rule::block => blocks.push(self.clone().transform_block(inner)?),
                Rule::if_stmt => {
                    // else-if chains nest as a single-statement else body.
                    blocks.push(vec![self.clone().transform_if(inner)?]);
                }
                _ => {}
            }
        }
        let mut blocks = blocks.into_iter();
        let then_body = blocks.next().unwrap_or_default();
        let else_body = blocks.next().unwrap_or_default();
        Ok(Stmt::new(
            StmtNode::If {
                condition: condition.expect("grammar guarantees an if condition"),
                then_body,
                else_body,
            },
            pos,
        ))
    }

    fn transform_cond(self: Rc<Self>, pair: Pair<Rule>) -> Result<Cond, CompileError> {
        let pos = position(&pair);
        match pair.as_rule() {
            Rule::cond | Rule::cond_xor | Rule::cond_and => {
                let op = pair.as_rule();
                let mut result: Option<Cond> = None;
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::or_op | Rule::xor_op | Rule::and_op => {}
                        _ => {
                            let rhs = self.clone().transform_cond(inner)?;
                            result = Some(match result {
                                None => rhs,
                                Some(lhs) => {
                                    let node = match op {
                                        Rule::cond => CondNode::Or(Box::new(lhs), Box::new(rhs)),
                                        Rule::cond_xor => {
                                            CondNode::Xor(Box::new(lhs), Box::new(rhs))
                                        }
                                        _ => CondNode::And(Box::new(lhs), Box::new(rhs)),
                                    };
                                    Cond {
                                        node,
                                        position: pos,
                                    }
                                }
                            });
                        }
                    }
                }
                result.ok_or_else(|| {
                    CompileError::Internal("empty condition node".to_string())
                })
            }
            Rule::paren_cond => {
                let inner = pair
                    .into_inner()
                    .next()
                    .expect("grammar guarantees parenthesized condition content");
                self.transform_cond(inner)
            }
            Rule::comparison => {
                let mut parts = pair.into_inner();
                let lhs = self.clone().parse_expr(parts.next().expect("lhs"))?;
                let op_pair = parts.next().expect("comparison operator");
                let op = CompOp::from_token(op_pair.as_str())
                    .expect("grammar guarantees a known comparison operator");
                let rhs = self.parse_expr(parts.next().expect("rhs"))?;
                Ok(Cond {
                    node: CondNode::Compare(op, lhs, rhs),
                    position: pos,
                })
            }
            Rule::trap_cond => {
                let mut negated = false;
                let mut name = String::new();
                let mut arg = None;
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::bang => negated = true,
                        Rule::ident => name = inner.as_str().to_string(),
                        Rule::expr => arg = Some(self.clone().parse_expr(inner)?),
                        _ => {}
                    }
                }
                Ok(Cond {
                    node: CondNode::Trap {
                        name,
                        arg: arg.expect("grammar guarantees a trap argument"),
                        negated,
                    },
                    position: pos,
                })
            }
            _ => Err(CompileError::Internal(format!(
                "unexpected condition node: {:?}",
                pair.as_rule()
            ))),
        }
    }

    fn parse_expr(self: Rc<Self>, pair: Pair<Rule>) -> Result<Expr, CompileError> {
        debug_assert_eq!(pair.as_rule(), Rule::expr);
        self.parse_expr_pairs(pair.into_inner())
    }

    fn parse_expr_pairs(self: Rc<Self>, pairs: Pairs<Rule>) -> Result<Expr, CompileError> {
        let this = self.clone();
        EXPR_PARSER
            .map_primary(|primary| this.clone().parse_primary(primary))
            .map_infix(|lhs, op, rhs| {
                let op_pos = position(&op);
                let bin_op = match op.as_rule() {
                    Rule::add => BinaryOp::Add,
                    Rule::sub => BinaryOp::Sub,
                    Rule::mul => BinaryOp::Mul,
                    Rule::div => BinaryOp::Div,
                    Rule::pow => BinaryOp::Pow,
                    r => {
                        return Err(CompileError::Internal(format!(
                            "unexpected infix operator: {r:?}"
                        )));
                    }
                };
                Ok(Expr {
                    node: ExprNode::Binary(bin_op, Box::new(lhs?), Box::new(rhs?)),
                    position: op_pos,
                })
            })
            .map_prefix(|op, rhs| {
                let op_pos = position(&op);
                match op.as_rule() {
                    Rule::neg => Ok(Expr {
                        node: ExprNode::Neg(Box::new(rhs?)),
                        position: op_pos,
                    }),
                    r => Err(CompileError::Internal(format!(
                        "unexpected prefix operator: {r:?}"
                    ))),
                }
            })
            .parse(pairs)
    }

    fn parse_primary(self: Rc<Self>, pair: Pair<Rule>) -> Result<Expr, CompileError> {
        let pos = position(&pair);
        match pair.as_rule() {
            Rule::num => Ok(Expr {
                node: ExprNode::Real(parse_f64(&pair)?),
                position: pos,
            }),
            Rule::imaginary => {
                let text = pair.as_str();
                let value = text[..text.len() - 1].parse::<f64>().map_err(|e| {
                    CompileError::Parse {
                        context: context(&pair),
                        message: format!("invalid imaginary literal '{text}': {e}"),
                    }
                })?;
                Ok(Expr {
                    node: ExprNode::Imaginary(value),
                    position: pos,
                })
            }
            Rule::ident => Ok(Expr {
                node: ExprNode::Id(pair.as_str().to_string()),
                position: pos,
            }),
            Rule::func_call => {
                let mut name = String::new();
                let mut args = vec![];
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::ident => name = inner.as_str().to_string(),
                        Rule::expr => args.push(self.clone().parse_expr(inner)?),
                        _ => {}
                    }
                }
                Ok(Expr {
                    node: ExprNode::Call { name, args },
                    position: pos,
                })
            }
            Rule::paren => {
                let mut exprs = vec![];
                for inner in pair.into_inner() {
                    if inner.as_rule() == Rule::expr {
                        exprs.push(self.clone().parse_expr(inner)?);
                    }
                }
                let mut exprs = exprs.into_iter();
                let first = exprs.next().expect("grammar guarantees paren content");
                match exprs.next() {
                    // `(re, im)` combines two reals into a complex value.
                    Some(second) => Ok(Expr {
                        node: ExprNode::Combine(Box::new(first), Box::new(second)),
                        position: pos,
                    }),
                    None => Ok(first),
                }
            }
            r => Err(CompileError::Internal(format!(
                "unexpected primary node: {r:?}"
            ))),
        }
    }
}

fn parse_f64(pair: &Pair<Rule>) -> Result<f64, CompileError> {
    pair.as_str()
        .parse::<f64>()
        .map_err(|e| CompileError::Parse {
            context: context(pair),
            message: format!("invalid numeric literal '{}': {e}", pair.as_str()),
        })
}

fn parse_u32(pair: &Pair<Rule>) -> Result<u32, CompileError> {
    pair.as_str()
        .parse::<u32>()
        .map_err(|e| CompileError::Parse {
            context: context(pair),
            message: format!("invalid integer literal '{}': {e}", pair.as_str()),
        })
}

fn parse_color(pair: &Pair<Rule>) -> Result<u32, CompileError> {
    let text = &pair.as_str()[1..];
    u32::from_str_radix(text, 16).map_err(|e| CompileError::Parse {
        context: context(pair),
        message: format!("invalid color literal '#{text}': {e}"),
    })
}

fn pest_error_to_diagnostic(err: pest::error::Error<Rule>) -> Diagnostic {
    let (line, column) = match err.line_col {
        LineColLocation::Pos((l, c)) => (l, c),
        LineColLocation::Span((l, c), _) => (l, c),
    };
    let (char_index, length) = match err.location {
        InputLocation::Pos(p) => (p, 1),
        InputLocation::Span((s, e)) => (s, e.saturating_sub(s).max(1)),
    };
    Diagnostic {
        kind: DiagnosticKind::Syntax,
        line,
        column,
        char_index,
        length,
        message: err.variant.message().to_string(),
    }
}

/// Parse DSL source into an AST, reporting all syntax diagnostics found in
/// one pass. A parse that produced any diagnostics yields `Err` even when
/// statement-boundary recovery allowed the tree walk to finish.
pub fn parse_program(source: &str) -> Result<FractalDecl, Vec<Diagnostic>> {
    let pairs = match FractumParser::parse(Rule::program, source) {
        Ok(pairs) => pairs,
        Err(e) => return Err(vec![pest_error_to_diagnostic(e)]),
    };
    let transformer = TreeTransformer::new();
    let decl = transformer.clone().transform_program(pairs);
    let diagnostics = transformer.diagnostics.borrow();
    match decl {
        Ok(decl) if diagnostics.is_empty() => Ok(decl),
        Ok(_) => Err(diagnostics.clone()),
        Err(e) => {
            let mut all = diagnostics.clone();
            all.push(e.to_diagnostic());
            Err(all)
        }
    }
}

#[cfg(test)]
pub(crate) fn parse_expression(source: &str) -> Expr {
    let mut pairs = FractumParser::parse(Rule::expr, source).expect("expression should parse");
    TreeTransformer::new()
        .parse_expr(pairs.next().unwrap())
        .expect("expression should transform")
}

#[cfg(test)]
mod tests {
    use super::{parse_expression, parse_program};
    use crate::ast::{BinaryOp, CondNode, ExprNode, StmtNode};
    use crate::errors::DiagnosticKind;
    use pretty_assertions::assert_eq;
    use unindent::unindent;

    const MANDELBROT: &str = r#"
        fractal {
            orbit(-2,-2,2,2) {
                x=0,y=0;
                loop 0,100 (x*x+y*y>4) {
                    x=x*x-y*y+xstart;
                    y=2*x*y+ystart;
                }
            }
            color(#FF000000) { }
        }
    "#;

    #[test]
    fn test_parse_minimal_orbit() {
        let decl = parse_program(MANDELBROT).expect("should parse");
        assert_eq!(decl.orbit.region, [-2.0, -2.0, 2.0, 2.0]);
        assert_eq!(decl.orbit.begin.len(), 2);
        assert_eq!(decl.orbit.loop_decl.start, 0);
        assert_eq!(decl.orbit.loop_decl.end, 100);
        assert_eq!(decl.orbit.loop_decl.body.len(), 2);
        assert_eq!(decl.color.background, 0xFF000000);
        assert!(decl.color.rules.is_empty());
    }

    #[test]
    fn test_pow_binds_tighter_than_mul() {
        let expr = parse_expression("2*3^4");
        let ExprNode::Binary(BinaryOp::Mul, _, rhs) = expr.node else {
            panic!("expected * at the top: {:?}", expr.node);
        };
        assert!(matches!(rhs.node, ExprNode::Binary(BinaryOp::Pow, _, _)));
    }

    #[test]
    fn test_pow_right_associative() {
        let expr = parse_expression("2^3^4");
        let ExprNode::Binary(BinaryOp::Pow, lhs, rhs) = expr.node else {
            panic!("expected ^ at the top: {:?}", expr.node);
        };
        assert!(matches!(lhs.node, ExprNode::Real(_)));
        assert!(matches!(rhs.node, ExprNode::Binary(BinaryOp::Pow, _, _)));
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_add() {
        let expr = parse_expression("-2+3");
        assert!(matches!(
            expr.node,
            ExprNode::Binary(BinaryOp::Add, _, _)
        ));
    }

    #[test]
    fn test_pow_binds_tighter_than_unary_minus() {
        // -2^2 negates the power, as in written math.
        let expr = parse_expression("-2^2");
        let ExprNode::Neg(inner) = expr.node else {
            panic!("expected leading negation: {:?}", expr.node);
        };
        assert!(matches!(inner.node, ExprNode::Binary(BinaryOp::Pow, _, _)));
    }

    #[test]
    fn test_imaginary_literal_and_combine() {
        let expr = parse_expression("1.5i");
        assert_eq!(expr.node, ExprNode::Imaginary(1.5));

        let expr = parse_expression("(1,2)");
        assert!(matches!(expr.node, ExprNode::Combine(_, _)));

        // A single parenthesized expression is just grouping.
        let expr = parse_expression("(1+2)");
        assert!(matches!(expr.node, ExprNode::Binary(BinaryOp::Add, _, _)));
    }

    #[test]
    fn test_multi_error_recovery_reports_all() {
        let source = unindent(
            r#"
            fractal {
                orbit(-2,-2,2,2) {
                    x=0,y=0;
                    loop 0,100 (x*x+y*y>4) {
                        x=x*x @@ nonsense;
                        y = = 2;
                        x=x+1;
                    }
                }
                color(#FF000000) { }
            }
        "#,
        );
        let errs = parse_program(&source).expect_err("should report syntax errors");
        assert_eq!(errs.len(), 2, "expected two diagnostics: {errs:?}");
        assert!(errs.iter().all(|d| d.kind == DiagnosticKind::Syntax));
        assert!(errs[0].line < errs[1].line);
    }

    #[test]
    fn test_if_else_and_conditions() {
        let source = unindent(
            r#"
            fractal {
                orbit(-1,-1,1,1) {
                    loop 0,10 (x > 2 & y < 3 | x = y) {
                        if (x >= 1) { x = x + 1; } else { x = 0; }
                    }
                }
                color(#FF000000) { }
            }
        "#,
        );
        let decl = parse_program(&source).expect("should parse");
        // | is the loosest combinator.
        assert!(matches!(
            decl.orbit.loop_decl.condition.node,
            CondNode::Or(_, _)
        ));
        let StmtNode::If {
            then_body,
            else_body,
            ..
        } = &decl.orbit.loop_decl.body[0].node
        else {
            panic!("expected an if statement");
        };
        assert_eq!(then_body.len(), 1);
        assert_eq!(else_body.len(), 1);
    }

    #[test]
    fn test_traps_palettes_rules() {
        let source = unindent(
            r#"
            fractal {
                orbit(-2,-2,2,2) [x] {
                    trap ring ((0,0)) {
                        moveto((1,0));
                        arcto((1,1), (0,1));
                        close();
                    }
                    x = (0,0);
                    loop 0,50 (mod(x) > 2 & !trap ring (x)) {
                        x = x*x + (xstart, ystart);
                    }
                }
                color(#FF000000) {
                    palette grad {
                        [#FF000000, #FFFFFFFF, 100];
                        [#FFFFFFFF, #FF0000FF, 100, s^2];
                    }
                    init {
                        t = n / 100;
                    }
                    rule (n > 0) [1] { grad[t] }
                }
            }
        "#,
        );
        let decl = parse_program(&source).expect("should parse");
        assert_eq!(decl.orbit.traps.len(), 1);
        assert_eq!(decl.orbit.traps[0].ops.len(), 3);
        assert_eq!(decl.orbit.state.len(), 1);
        assert_eq!(decl.color.palettes.len(), 1);
        assert_eq!(decl.color.palettes[0].elements.len(), 2);
        assert!(decl.color.palettes[0].elements[1].easing.is_some());
        assert_eq!(decl.color.init.len(), 1);
        assert_eq!(decl.color.rules.len(), 1);
    }

    #[test]
    fn test_whole_unit_parse_failure_is_single_diagnostic() {
        let errs = parse_program("fractal { garbage }").expect_err("should fail");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, DiagnosticKind::Syntax);
        assert!(errs[0].line >= 1);
    }
}
