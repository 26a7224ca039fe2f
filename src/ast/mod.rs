//! The AST produced by the parser (`spec.md` §3 "Data Model"). Mutated
//! only by the transform-rule engine, which appends transforms to matching
//! nodes; read-only thereafter.

use std::fmt::Write as _;

use crate::common::Position;
use crate::registries;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    W32,
    W64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformPhase {
    Text,
    Semantic,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TransformArg {
    Identifier(String),
    Literal(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub name: String,
    pub template_args: Vec<String>,
    pub value_args: Vec<TransformArg>,
    pub phase: TransformPhase,
    pub position: Position,
}

impl Transform {
    pub fn new(name: impl Into<String>, phase: TransformPhase, position: Position) -> Self {
        Self {
            name: name.into(),
            template_args: Vec::new(),
            value_args: Vec::new(),
            phase,
            position,
        }
    }

    /// A `return<T>` transform's single template type, if this is one.
    pub fn return_type(&self) -> Option<&str> {
        if self.name == "return" {
            self.template_args.first().map(String::as_str)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// `value` is the two's-complement bit pattern; for `unsigned` (`u64`)
    /// literals above `i64::MAX` this is negative when read as `i64` and
    /// must be reinterpreted via `value as u64` at the use site.
    Literal {
        value: i64,
        width: Width,
        unsigned: bool,
    },
    FloatLiteral {
        text: String,
        width: Width,
    },
    BoolLiteral(bool),
    /// Raw text including the surrounding quotes and trailing suffix, e.g.
    /// `"hi"utf8`. Decoded lazily via `crate::strings` when content is
    /// actually needed.
    StringLiteral(String),
    Name(String),
    Call(Call),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub name: String,
    pub namespace_prefix: Option<String>,
    pub template_args: Vec<String>,
    pub args: Vec<Expr>,
    /// Parallel to `args`; `Some(name)` for a named argument.
    pub arg_names: Vec<Option<String>>,
    pub is_method_call: bool,
    pub is_binding: bool,
    pub transforms: Vec<Transform>,
    pub has_body_arguments: bool,
    pub body_arguments: Vec<Expr>,
    pub position: Position,
}

impl Call {
    /// A binding's initializer, i.e. `args[0]` if present.
    pub fn initializer(&self) -> Option<&Expr> {
        if self.is_binding {
            self.args.first()
        } else {
            None
        }
    }

    /// The full path a callee name resolves to, mirroring the parser's own
    /// `full_path_for`: an already-absolute name is used as-is, otherwise it
    /// is resolved against the namespace the call itself appears in.
    pub fn callee_full_path(&self) -> String {
        if self.name.starts_with('/') {
            self.name.clone()
        } else {
            match &self.namespace_prefix {
                Some(ns) => format!("{}/{}", ns, self.name),
                None => format!("/{}", self.name),
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    pub full_path: String,
    pub name: String,
    pub namespace_prefix: String,
    pub transforms: Vec<Transform>,
    pub parameters: Vec<Call>,
    pub statements: Vec<Expr>,
    pub position: Position,
}

impl Definition {
    pub fn declared_explicit_return_statement(&self) -> bool {
        self.statements.iter().any(is_return_statement)
    }

    pub fn contains_value_expression(&self) -> bool {
        self.statements.iter().any(|e| !matches!(e, Expr::Call(c) if is_statement_only_call(&c.name)))
    }

    pub fn explicit_storage_class_transform(&self) -> Option<&Transform> {
        self.transforms
            .iter()
            .find(|t| registries::is_storage_class_transform(&t.name))
    }

    /// Struct-like per `spec.md` §3 Invariants: explicit `struct`-family
    /// transform, or implicitly no return transform, no parameters, no
    /// return statement, and every statement a binding.
    pub fn is_struct_like(&self) -> bool {
        if self.explicit_storage_class_transform().is_some() {
            return true;
        }
        let has_return_transform = self.transforms.iter().any(|t| t.name == "return");
        let implicit = !has_return_transform
            && self.parameters.is_empty()
            && !self.declared_explicit_return_statement()
            && self
                .statements
                .iter()
                .all(|e| matches!(e, Expr::Call(c) if c.is_binding));
        implicit
    }
}

fn is_return_statement(e: &Expr) -> bool {
    matches!(e, Expr::Call(c) if c.name == "return" && !c.is_binding)
}

fn is_statement_only_call(name: &str) -> bool {
    matches!(name, "return" | "if")
}

#[derive(Clone, Debug, PartialEq)]
pub struct Execution {
    pub full_path: String,
    pub args: Vec<Expr>,
    pub arg_names: Vec<Option<String>>,
    pub transforms: Vec<Transform>,
    pub body: Option<Vec<Expr>>,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub path: String,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TopLevelItem {
    Import(Import),
    Definition(Definition),
    Execution(Execution),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub items: Vec<TopLevelItem>,
}

impl Program {
    pub fn imports(&self) -> impl Iterator<Item = &Import> {
        self.items.iter().filter_map(|i| match i {
            TopLevelItem::Import(imp) => Some(imp),
            _ => None,
        })
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.items.iter().filter_map(|i| match i {
            TopLevelItem::Definition(d) => Some(d),
            _ => None,
        })
    }

    pub fn executions(&self) -> impl Iterator<Item = &Execution> {
        self.items.iter().filter_map(|i| match i {
            TopLevelItem::Execution(e) => Some(e),
            _ => None,
        })
    }

    pub fn find_definition(&self, full_path: &str) -> Option<&Definition> {
        self.definitions().find(|d| d.full_path == full_path)
    }

    /// A deterministic, depth-first, source-order dump: one line per
    /// definition or execution with its full path, then indented
    /// transforms and statements (`spec.md` §6 "AST dump").
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                TopLevelItem::Import(imp) => {
                    let _ = writeln!(out, "import {}", imp.path);
                }
                TopLevelItem::Definition(def) => {
                    let _ = writeln!(out, "def {}", def.full_path);
                    for t in &def.transforms {
                        let _ = writeln!(out, "  transform {}", dump_transform(t));
                    }
                    for p in &def.parameters {
                        let _ = writeln!(out, "  param {}", p.name);
                    }
                    for s in &def.statements {
                        let _ = writeln!(out, "  stmt {}", dump_expr(s));
                    }
                }
                TopLevelItem::Execution(exec) => {
                    let _ = writeln!(out, "exec {}", exec.full_path);
                    for t in &exec.transforms {
                        let _ = writeln!(out, "  transform {}", dump_transform(t));
                    }
                    for (arg, name) in exec.args.iter().zip(exec.arg_names.iter()) {
                        match name {
                            Some(n) => {
                                let _ = writeln!(out, "  arg [{}] {}", n, dump_expr(arg));
                            }
                            None => {
                                let _ = writeln!(out, "  arg {}", dump_expr(arg));
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

fn dump_transform(t: &Transform) -> String {
    let mut s = t.name.clone();
    if !t.template_args.is_empty() {
        s.push('<');
        s.push_str(&t.template_args.join(", "));
        s.push('>');
    }
    s
}

fn dump_expr(e: &Expr) -> String {
    match e {
        Expr::Literal { value, .. } => value.to_string(),
        Expr::FloatLiteral { text, .. } => text.clone(),
        Expr::BoolLiteral(b) => b.to_string(),
        Expr::StringLiteral(s) => s.clone(),
        Expr::Name(n) => n.clone(),
        Expr::Call(c) => format!("{}(...)", c.name),
    }
}
