//! Compiled form of an assertion expression.

use serde_json::Value;

/// One node of a compiled assertion. Built once at load time, evaluated on
/// every run.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value. String literals may still carry `$`/`?` tokens,
    /// substituted at evaluation time.
    Literal(Value),
    /// `$NAME` / `?NAME`, resolved through the expander at evaluation time.
    VarRef(String),
    /// Dotted/indexed access rooted at a scope name, e.g. `result.items[0]`.
    Path { root: String, segments: Vec<Segment> },
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `all(pred for binding in iterable)` / `any(...)`.
    Quantifier {
        kind: Quant,
        predicate: Box<Expr>,
        binding: String,
        iterable: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name`
    Field(String),
    /// `[0]`, `[-1]`
    Index(i64),
    /// `["key"]`
    Key(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    And,
    Or,
}

impl BinaryOp {
    /// Spelling used in evaluation error messages.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quant {
    All,
    Any,
}
