//! Expression tree produced by the parser.

/// Byte offsets into the source text.
pub type Span = std::ops::Range<usize>;

/// A node with its source location and a per-parse unique id.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// 1-based, assigned in parse order.
    pub id: i64,
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(id: i64, node: T, span: Span) -> Self {
        Self { id, node, span }
    }
}

pub type SpannedExpr = Spanned<Expr>;

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: SpannedExpr,
    pub value: SpannedExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),

    Ident(String),

    List(Vec<SpannedExpr>),
    Map(Vec<MapEntry>),

    Unary {
        op: UnaryOp,
        expr: Box<SpannedExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<SpannedExpr>,
        right: Box<SpannedExpr>,
    },
    Ternary {
        cond: Box<SpannedExpr>,
        then_expr: Box<SpannedExpr>,
        else_expr: Box<SpannedExpr>,
    },

    /// `expr.field`, or `expr.?field` when `optional` is set.
    Member {
        expr: Box<SpannedExpr>,
        field: String,
        optional: bool,
    },
    Index {
        expr: Box<SpannedExpr>,
        index: Box<SpannedExpr>,
    },
    /// A call; `target` is the receiver of a method call.
    Call {
        function: String,
        target: Option<Box<SpannedExpr>>,
        args: Vec<SpannedExpr>,
    },

    /// Expansion of the list macros (`all`, `exists`, `exists_one`, `map`, `filter`).
    ///
    /// `iter_var` is bound to each element (or key, for maps) of `iter_range`
    /// in a scope local to `filter` and `body`.
    Comprehension {
        kind: ComprehensionKind,
        iter_var: String,
        iter_range: Box<SpannedExpr>,
        /// Element filter of the three-argument `map`.
        filter: Option<Box<SpannedExpr>>,
        /// Predicate for quantifiers and `filter`, transform for `map`.
        body: Box<SpannedExpr>,
    },

    /// Expansion of `has(expr.field)`.
    MemberTestOnly {
        expr: Box<SpannedExpr>,
        field: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionKind {
    All,
    Exists,
    ExistsOne,
    Map,
    Filter,
}

impl ComprehensionKind {
    pub fn macro_name(self) -> &'static str {
        match self {
            ComprehensionKind::All => "all",
            ComprehensionKind::Exists => "exists",
            ComprehensionKind::ExistsOne => "exists_one",
            ComprehensionKind::Map => "map",
            ComprehensionKind::Filter => "filter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    In,

    And,
    Or,
    /// `??`: the left value, or the right one when the left is absent.
    Coalesce,
}

impl UnaryOp {
    /// Name of the function declaring this operator's overloads.
    pub fn function_name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-_",
            UnaryOp::Not => "!_",
        }
    }
}

impl BinaryOp {
    /// Name of the function declaring this operator's overloads.
    pub fn function_name(self) -> &'static str {
        match self {
            BinaryOp::Add => "_+_",
            BinaryOp::Sub => "_-_",
            BinaryOp::Mul => "_*_",
            BinaryOp::Div => "_/_",
            BinaryOp::Mod => "_%_",
            BinaryOp::Eq => "_==_",
            BinaryOp::Ne => "_!=_",
            BinaryOp::Lt => "_<_",
            BinaryOp::Le => "_<=_",
            BinaryOp::Gt => "_>_",
            BinaryOp::Ge => "_>=_",
            BinaryOp::In => "@in",
            BinaryOp::And => "_&&_",
            BinaryOp::Or => "_||_",
            BinaryOp::Coalesce => "_??_",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Coalesce => "??",
        }
    }
}
