//! Serialized program model
//!
//! A JSON document whose nodes map one-to-one onto generator node
//! constructors. This is what a front end hands to the engine.

use crate::interpreter::types::Value;
use serde::{Deserialize, Serialize};

/// Literal constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Integer(i64),
    Real(f64),
    Str(String),
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Real(r) => Value::Real(*r),
            Literal::Str(s) => Value::str(s.as_str()),
        }
    }
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expr {
    Null,
    Fail,
    Next,
    /// `&current`
    Current,
    /// `&source`
    Source,
    /// `&main`
    Main,
    /// `&subject`
    Subject,
    /// `&pos`
    Pos,
    Lit {
        v: Literal,
    },
    Var {
        name: String,
    },
    Range {
        from: Box<Expr>,
        to: Box<Expr>,
        by: Option<Box<Expr>>,
    },
    /// Conjunction: every child must succeed
    Seq {
        body: Vec<Expr>,
    },
    /// Statement list: failures of non-final statements are ignored
    Block {
        body: Vec<Expr>,
    },
    Every {
        expr: Box<Expr>,
        body: Option<Box<Expr>>,
    },
    Product {
        outer: Box<Expr>,
        inner: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_e: Box<Expr>,
        else_e: Option<Box<Expr>>,
    },
    While {
        cond: Box<Expr>,
        body: Option<Box<Expr>>,
    },
    Until {
        cond: Box<Expr>,
        body: Option<Box<Expr>>,
    },
    Repeat {
        body: Box<Expr>,
    },
    Alt {
        alts: Vec<Expr>,
    },
    Not {
        expr: Box<Expr>,
    },
    Limit {
        expr: Box<Expr>,
        count: Box<Expr>,
    },
    Break {
        value: Option<Box<Expr>>,
    },
    Return {
        value: Option<Box<Expr>>,
    },
    Suspend {
        value: Box<Expr>,
    },
    Index {
        object: Box<Expr>,
        key: Box<Expr>,
    },
    Field {
        object: Box<Expr>,
        name: String,
    },
    Promote {
        expr: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    AugAssign {
        op: String,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Swap {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    RevAssign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    List {
        items: Vec<Expr>,
    },
    /// `[: expr :]`
    ListComp {
        expr: Box<Expr>,
    },
    /// `name in expr`
    In {
        name: String,
        expr: Box<Expr>,
    },
    /// `subject ? body`
    Scan {
        subject: Box<Expr>,
        body: Box<Expr>,
    },
    Create {
        name: String,
        args: Vec<Expr>,
    },
    Activate {
        target: Box<Expr>,
        value: Option<Box<Expr>>,
    },
}

impl Expr {
    /// Direct sub-expressions, in evaluation order
    pub fn children(&self) -> Vec<&Expr> {
        fn opt(e: &Option<Box<Expr>>) -> Option<&Expr> {
            e.as_deref()
        }
        match self {
            Expr::Null
            | Expr::Fail
            | Expr::Next
            | Expr::Current
            | Expr::Source
            | Expr::Main
            | Expr::Subject
            | Expr::Pos
            | Expr::Lit { .. }
            | Expr::Var { .. } => Vec::new(),
            Expr::Range { from, to, by } => {
                let mut out = vec![from.as_ref(), to.as_ref()];
                out.extend(opt(by));
                out
            }
            Expr::Seq { body } | Expr::Block { body } => body.iter().collect(),
            Expr::Alt { alts } => alts.iter().collect(),
            Expr::List { items } => items.iter().collect(),
            Expr::Call { args, .. } | Expr::Create { args, .. } => args.iter().collect(),
            Expr::Every { expr, body } => std::iter::once(expr.as_ref()).chain(opt(body)).collect(),
            Expr::While { cond, body } | Expr::Until { cond, body } => {
                std::iter::once(cond.as_ref()).chain(opt(body)).collect()
            }
            Expr::If {
                cond,
                then_e,
                else_e,
            } => vec![cond.as_ref(), then_e.as_ref()]
                .into_iter()
                .chain(opt(else_e))
                .collect(),
            Expr::Product { outer, inner } => vec![outer.as_ref(), inner.as_ref()],
            Expr::Repeat { body } => vec![body.as_ref()],
            Expr::Not { expr }
            | Expr::Promote { expr }
            | Expr::ListComp { expr }
            | Expr::In { expr, .. } => vec![expr.as_ref()],
            Expr::Scan { subject, body } => vec![subject.as_ref(), body.as_ref()],
            Expr::Limit { expr, count } => vec![expr.as_ref(), count.as_ref()],
            Expr::Break { value } | Expr::Return { value } => opt(value).into_iter().collect(),
            Expr::Suspend { value } => vec![value.as_ref()],
            Expr::Index { object, key } => vec![object.as_ref(), key.as_ref()],
            Expr::Field { object, .. } => vec![object.as_ref()],
            Expr::Assign { target, value }
            | Expr::AugAssign { target, value, .. }
            | Expr::RevAssign { target, value } => vec![target.as_ref(), value.as_ref()],
            Expr::Swap { left, right } => vec![left.as_ref(), right.as_ref()],
            Expr::Activate { target, value } => opt(value)
                .into_iter()
                .chain(std::iter::once(target.as_ref()))
                .collect(),
        }
    }
}

/* ===================== Declarations ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    /// The last parameter collects surplus arguments as a list
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub locals: Vec<String>,
    pub body: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDecl {
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDecl {
    #[serde(default)]
    pub globals: Vec<String>,
    #[serde(default)]
    pub records: Vec<RecordDecl>,
    pub methods: Vec<MethodDecl>,
}
