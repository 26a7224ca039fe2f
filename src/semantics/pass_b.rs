//! Pass B — parameter and return-type resolution (`spec.md` §4.5). Explicit
//! `return<T>` transforms are taken at face value; definitions without one
//! have their return kind inferred by walking the body for `return`
//! statement argument kinds, propagated through arithmetic/comparison
//! builtins and `if`/`then`/`else` block envelopes. Resolution is memoized
//! per `fullPath` and detects self-dependent cycles.

use std::collections::{HashMap, HashSet};

use crate::ast::{Call, Definition, Expr, Program};
use crate::registries;

use super::types::{self, NumKind, Ty};
use super::Error;

#[derive(Default)]
pub struct ReturnTypes(HashMap<String, Ty>);

impl ReturnTypes {
    pub fn get(&self, full_path: &str) -> Ty {
        self.0.get(full_path).cloned().unwrap_or(Ty::Unknown)
    }
}

pub fn resolve(program: &Program) -> Result<ReturnTypes, Error> {
    let mut resolved: HashMap<String, Ty> = HashMap::new();
    let mut in_progress: HashSet<String> = HashSet::new();
    for def in program.definitions() {
        resolve_one(def, program, &mut resolved, &mut in_progress)?;
    }
    Ok(ReturnTypes(resolved))
}

fn resolve_one(
    def: &Definition,
    program: &Program,
    resolved: &mut HashMap<String, Ty>,
    in_progress: &mut HashSet<String>,
) -> Result<Ty, Error> {
    if let Some(ty) = resolved.get(&def.full_path) {
        return Ok(ty.clone());
    }

    if let Some(t) = def.transforms.iter().find(|t| t.name == "return") {
        let text = t.template_args.first().cloned().unwrap_or_default();
        let ty = types::parse_type_text(&text);
        resolved.insert(def.full_path.clone(), ty.clone());
        return Ok(ty);
    }

    if def.is_struct_like() || !def.declared_explicit_return_statement() {
        resolved.insert(def.full_path.clone(), Ty::Void);
        return Ok(Ty::Void);
    }

    if !in_progress.insert(def.full_path.clone()) {
        return Err(Error::ReturnTypeCycle(def.full_path.clone(), def.position));
    }

    let scope = param_scope(def);
    let mut candidate: Option<Ty> = None;
    for stmt in &def.statements {
        collect_return_candidates(stmt, program, resolved, in_progress, &scope, &mut candidate)?;
    }

    in_progress.remove(&def.full_path);
    let ty = candidate.unwrap_or(Ty::Void);
    resolved.insert(def.full_path.clone(), ty.clone());
    Ok(ty)
}

fn param_scope(def: &Definition) -> HashMap<String, Ty> {
    def.parameters
        .iter()
        .map(|p| (p.name.clone(), types::declared_type(&p.transforms)))
        .collect()
}

fn collect_return_candidates(
    expr: &Expr,
    program: &Program,
    resolved: &mut HashMap<String, Ty>,
    in_progress: &mut HashSet<String>,
    scope: &HashMap<String, Ty>,
    candidate: &mut Option<Ty>,
) -> Result<(), Error> {
    let Expr::Call(c) = expr else { return Ok(()) };

    if c.name == "return" && !c.is_binding {
        if let Some(arg) = c.args.first() {
            let ty = infer_ty(arg, program, resolved, in_progress, scope)?;
            merge_candidate(candidate, ty);
        }
        return Ok(());
    }

    if c.name == "if" && !c.is_binding {
        for branch in c.args.iter().skip(1) {
            if let Expr::Call(b) = branch {
                for stmt in &b.body_arguments {
                    collect_return_candidates(stmt, program, resolved, in_progress, scope, candidate)?;
                }
            }
        }
        return Ok(());
    }

    for stmt in &c.body_arguments {
        collect_return_candidates(stmt, program, resolved, in_progress, scope, candidate)?;
    }
    Ok(())
}

fn merge_candidate(candidate: &mut Option<Ty>, ty: Ty) {
    if ty == Ty::Unknown {
        return;
    }
    match candidate {
        None => *candidate = Some(ty),
        Some(_) => {}
    }
}

/// A deliberately light-weight inferer used only during Pass B's own
/// cycle-aware walk; Pass C performs the fuller operand-kind checking with
/// the already-resolved `ReturnTypes` map, so duplicating a small amount of
/// propagation logic here avoids threading the in-progress cycle set
/// through the body checker as well.
fn infer_ty(
    expr: &Expr,
    program: &Program,
    resolved: &mut HashMap<String, Ty>,
    in_progress: &mut HashSet<String>,
    scope: &HashMap<String, Ty>,
) -> Result<Ty, Error> {
    Ok(match expr {
        Expr::Literal { width, unsigned, .. } => Ty::Primitive(
            match (width, unsigned) {
                (crate::ast::Width::W32, _) => "i32",
                (crate::ast::Width::W64, true) => "u64",
                (crate::ast::Width::W64, false) => "i64",
            }
            .to_string(),
        ),
        Expr::FloatLiteral { width, .. } => Ty::Primitive(
            match width {
                crate::ast::Width::W32 => "f32",
                crate::ast::Width::W64 => "f64",
            }
            .to_string(),
        ),
        Expr::BoolLiteral(_) => Ty::Primitive("bool".to_string()),
        Expr::StringLiteral(_) => Ty::Primitive("string".to_string()),
        Expr::Name(n) => scope.get(n).cloned().unwrap_or(Ty::Unknown),
        Expr::Call(c) => infer_call_ty(c, program, resolved, in_progress, scope)?,
    })
}

fn infer_call_ty(
    c: &Call,
    program: &Program,
    resolved: &mut HashMap<String, Ty>,
    in_progress: &mut HashSet<String>,
    scope: &HashMap<String, Ty>,
) -> Result<Ty, Error> {
    if c.is_binding {
        return Ok(Ty::Void);
    }

    if registries::ARITHMETIC_BUILTINS.contains(&c.name.as_str())
        || registries::COMPARISON_BUILTINS.contains(&c.name.as_str())
        || registries::NUMERIC_SELECT_BUILTINS.contains(&c.name.as_str())
        || c.name == "assign"
    {
        let mut operands = Vec::new();
        for a in &c.args {
            operands.push(infer_ty(a, program, resolved, in_progress, scope)?);
        }
        let is_comparison = registries::COMPARISON_BUILTINS.contains(&c.name.as_str());
        let kinds: Vec<NumKind> = operands.iter().filter_map(types::num_kind_of).collect();
        return Ok(match kinds.as_slice() {
            [] => Ty::Unknown,
            [only] => ty_of_num_kind(*only),
            rest => {
                let mut acc = rest[0];
                for k in &rest[1..] {
                    let promoted = if is_comparison {
                        types::comparison_num_kind(acc, *k)
                    } else {
                        types::promote(acc, *k)
                    };
                    match promoted {
                        Some(p) => acc = p,
                        None => return Ok(Ty::Unknown),
                    }
                }
                if is_comparison {
                    Ty::Primitive("bool".to_string())
                } else {
                    ty_of_num_kind(acc)
                }
            }
        });
    }

    if c.name == "convert" {
        return Ok(c.template_args.first().map(|t| types::parse_type_text(t)).unwrap_or(Ty::Unknown));
    }

    if c.name == "if" {
        // `if` is value-producing only through block envelopes; Pass C
        // validates the branches agree, Pass B just treats it opaquely.
        return Ok(Ty::Unknown);
    }

    if let Some(def) = program.find_definition(&c.callee_full_path()) {
        return resolve_one(def, program, resolved, in_progress);
    }

    Ok(Ty::Unknown)
}

fn ty_of_num_kind(k: NumKind) -> Ty {
    Ty::Primitive(
        match k {
            NumKind::I32 => "i32",
            NumKind::I64 => "i64",
            NumKind::U64 => "u64",
            NumKind::F32 => "f32",
            NumKind::F64 => "f64",
            NumKind::Bool => "bool",
        }
        .to_string(),
    )
}
