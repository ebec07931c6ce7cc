//! Parse-time macros.
//!
//! Macros rewrite specific call shapes, such as `items.all(i, i.qty > 0)`,
//! into dedicated nodes before checking. They are keyed by
//! `name:arg_count:is_receiver`, so `map/2` and `map/3` are distinct macros.

use std::collections::HashMap;

use crate::types::{ComprehensionKind, Expr, Span, Spanned, SpannedExpr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroStyle {
    /// `name(args...)`
    Global,
    /// `receiver.name(args...)`
    Receiver,
}

#[derive(Debug)]
pub enum MacroExpansion {
    Expanded(SpannedExpr),
    /// The call matched a macro signature but its arguments are unusable.
    Error(String, Span),
}

/// State handed to expanders for allocating node ids.
pub struct MacroContext<'a> {
    next_id: &'a mut i64,
}

impl<'a> MacroContext<'a> {
    pub fn new(next_id: &'a mut i64) -> Self {
        Self { next_id }
    }

    pub fn next_id(&mut self) -> i64 {
        let id = *self.next_id;
        *self.next_id += 1;
        id
    }
}

pub type MacroExpander = fn(
    ctx: &mut MacroContext,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> MacroExpansion;

#[derive(Clone)]
pub struct Macro {
    pub name: &'static str,
    pub style: MacroStyle,
    pub arg_count: usize,
    pub expander: MacroExpander,
}

impl Macro {
    pub const fn new(
        name: &'static str,
        style: MacroStyle,
        arg_count: usize,
        expander: MacroExpander,
    ) -> Self {
        Self {
            name,
            style,
            arg_count,
            expander,
        }
    }

    fn key(&self) -> String {
        make_key(self.name, self.arg_count, self.style == MacroStyle::Receiver)
    }
}

impl std::fmt::Debug for Macro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Macro")
            .field("name", &self.name)
            .field("style", &self.style)
            .field("arg_count", &self.arg_count)
            .finish_non_exhaustive()
    }
}

fn make_key(name: &str, arg_count: usize, is_receiver: bool) -> String {
    format!("{}:{}:{}", name, arg_count, is_receiver)
}

#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    macros: HashMap<String, Macro>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut registry = Self::new();
        for macro_def in STANDARD_MACROS {
            registry.register(macro_def.clone());
        }
        registry
    }

    pub fn register(&mut self, macro_def: Macro) {
        self.macros.insert(macro_def.key(), macro_def);
    }

    pub fn lookup(&self, name: &str, arg_count: usize, is_receiver: bool) -> Option<&Macro> {
        self.macros.get(&make_key(name, arg_count, is_receiver))
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

pub static STANDARD_MACROS: &[Macro] = &[
    Macro::new("has", MacroStyle::Global, 1, expand_has),
    Macro::new("all", MacroStyle::Receiver, 2, expand_all),
    Macro::new("exists", MacroStyle::Receiver, 2, expand_exists),
    Macro::new("exists_one", MacroStyle::Receiver, 2, expand_exists_one),
    Macro::new("map", MacroStyle::Receiver, 2, expand_map),
    Macro::new("map", MacroStyle::Receiver, 3, expand_map),
    Macro::new("filter", MacroStyle::Receiver, 2, expand_filter),
];

/// `has(m.f)` becomes a presence test on `m`.
fn expand_has(
    ctx: &mut MacroContext,
    span: Span,
    _receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> MacroExpansion {
    let Some(arg) = args.into_iter().next() else {
        return MacroExpansion::Error("has() requires 1 argument".to_string(), span);
    };

    match arg.node {
        Expr::Member {
            expr,
            field,
            optional: false,
        } => MacroExpansion::Expanded(Spanned::new(
            ctx.next_id(),
            Expr::MemberTestOnly { expr, field },
            span,
        )),
        _ => MacroExpansion::Error(
            "has() argument must be a field selection, e.g. has(m.f)".to_string(),
            arg.span,
        ),
    }
}

fn expand_all(
    ctx: &mut MacroContext,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> MacroExpansion {
    expand_comprehension(ctx, ComprehensionKind::All, span, receiver, args)
}

fn expand_exists(
    ctx: &mut MacroContext,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> MacroExpansion {
    expand_comprehension(ctx, ComprehensionKind::Exists, span, receiver, args)
}

fn expand_exists_one(
    ctx: &mut MacroContext,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> MacroExpansion {
    expand_comprehension(ctx, ComprehensionKind::ExistsOne, span, receiver, args)
}

fn expand_map(
    ctx: &mut MacroContext,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> MacroExpansion {
    expand_comprehension(ctx, ComprehensionKind::Map, span, receiver, args)
}

fn expand_filter(
    ctx: &mut MacroContext,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> MacroExpansion {
    expand_comprehension(ctx, ComprehensionKind::Filter, span, receiver, args)
}

/// Shared expansion for the receiver macros.
///
/// `args` is `[var, body]`, or `[var, filter, body]` for the filtering `map`.
fn expand_comprehension(
    ctx: &mut MacroContext,
    kind: ComprehensionKind,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> MacroExpansion {
    let Some(iter_range) = receiver else {
        return MacroExpansion::Error(format!("{}() requires a receiver", kind.macro_name()), span);
    };

    let mut args = args.into_iter();
    let (Some(var), Some(second)) = (args.next(), args.next()) else {
        return MacroExpansion::Error(
            format!("{}() requires a variable and an expression", kind.macro_name()),
            span,
        );
    };
    let iter_var = match var.node {
        Expr::Ident(name) => name,
        _ => {
            return MacroExpansion::Error(
                format!("{}() variable must be a simple name", kind.macro_name()),
                var.span,
            )
        }
    };

    let (filter, body) = match args.next() {
        Some(body) => (Some(Box::new(second)), body),
        None => (None, second),
    };

    MacroExpansion::Expanded(Spanned::new(
        ctx.next_id(),
        Expr::Comprehension {
            kind,
            iter_var,
            iter_range: Box::new(iter_range),
            filter,
            body: Box::new(body),
        },
        span,
    ))
}
