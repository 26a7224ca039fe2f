//! Pass C — body, statement, and call checking (`spec.md` §4.5), the
//! richest single pass: capability/effect checking, binding/initializer
//! kind matching, return-kind and control-flow-reachability checking,
//! operand-kind validation for builtins, and named-argument resolution.

use std::collections::{HashMap, HashSet};

use crate::ast::{Call, Definition, Expr, Program, TransformArg};
use crate::common::Position;
use crate::registries;

use super::pass_b::ReturnTypes;
use super::types::{self, NumKind, Ty};
use super::{Error, ValidationOptions};

#[derive(Clone, Debug)]
struct Binding {
    ty: Ty,
    mutable: bool,
}

type Scope = Vec<HashMap<String, Binding>>;

pub fn run(program: &Program, return_types: &ReturnTypes, options: &ValidationOptions) -> Result<(), Error> {
    for def in program.definitions() {
        check_definition(def, program, return_types, options)?;
    }
    Ok(())
}

fn check_definition(
    def: &Definition,
    program: &Program,
    return_types: &ReturnTypes,
    options: &ValidationOptions,
) -> Result<(), Error> {
    check_parameters(def)?;
    check_entry_constraints(def, options)?;

    let active_effects = active_effect_set(def);
    check_capabilities(def, &active_effects)?;

    let return_ty = return_types.get(&def.full_path);
    let checker = Checker {
        program,
        return_types,
        active_effects,
        return_ty: return_ty.clone(),
    };

    let mut scope: Scope = vec![parameter_scope(def)];
    checker.check_block(&def.statements, &mut scope)?;

    if return_ty != Ty::Void && !returns_on_all_paths(&def.statements) {
        return Err(Error::MissingReturnOnAllPaths(def.full_path.clone(), def.position));
    }
    Ok(())
}

fn parameter_scope(def: &Definition) -> HashMap<String, Binding> {
    def.parameters
        .iter()
        .map(|p| {
            let mutable = p.transforms.iter().any(|t| t.name == "mut");
            (p.name.clone(), Binding { ty: types::declared_type(&p.transforms), mutable })
        })
        .collect()
}

fn check_parameters(def: &Definition) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for p in &def.parameters {
        if types::declared_type(&p.transforms) == Ty::Unknown {
            return Err(Error::ParameterMissingType(p.name.clone(), p.position));
        }
        if !seen.insert(p.name.clone()) {
            return Err(Error::DuplicateParameterName(p.name.clone(), p.position));
        }
        if let Some(default) = p.initializer() {
            if !is_pure(default) {
                return Err(Error::ParameterDefaultNotPure(p.position));
            }
        }
    }
    Ok(())
}

fn is_pure(expr: &Expr) -> bool {
    match expr {
        Expr::Call(c) => !c.is_binding && !c.has_body_arguments && c.args.iter().all(is_pure),
        _ => true,
    }
}

fn check_entry_constraints(def: &Definition, options: &ValidationOptions) -> Result<(), Error> {
    if def.full_path != options.entry_path || def.parameters.is_empty() {
        return Ok(());
    }
    if def.parameters.len() != 1 {
        return Err(Error::EntryParameterInvalid(def.position));
    }
    let p = &def.parameters[0];
    let ty = types::declared_type(&p.transforms);
    let is_array_of_string = matches!(&ty, Ty::Array(inner) if matches!(inner.as_ref(), Ty::Primitive(s) if s == "string"));
    if !is_array_of_string || p.initializer().is_some() {
        return Err(Error::EntryParameterInvalid(def.position));
    }
    Ok(())
}

/// The active effect set is the definition's own `effects(...)` transform;
/// absent that, the program default is treated as empty (`spec.md` §4.5's
/// "defaulting to the program default" is otherwise unspecified — recorded
/// as an Open Question resolution).
fn active_effect_set(def: &Definition) -> HashSet<String> {
    def.transforms
        .iter()
        .find(|t| t.name == "effects")
        .map(|t| {
            t.value_args
                .iter()
                .filter_map(|a| match a {
                    TransformArg::Identifier(s) => Some(s.clone()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn check_capabilities(def: &Definition, active_effects: &HashSet<String>) -> Result<(), Error> {
    if let Some(t) = def.transforms.iter().find(|t| t.name == "capabilities") {
        for arg in &t.value_args {
            if let TransformArg::Identifier(name) = arg {
                if !active_effects.contains(name) {
                    return Err(Error::CapabilityNotInEffects(name.clone(), t.position));
                }
            }
        }
    }
    Ok(())
}

/// `true` when every statement-list path through `stmts` ends in a direct
/// `return` or an `if` whose both branches recursively return.
fn returns_on_all_paths(stmts: &[Expr]) -> bool {
    match stmts.last() {
        Some(Expr::Call(c)) if c.name == "return" && !c.is_binding => true,
        Some(Expr::Call(c)) if c.name == "if" && !c.is_binding && c.args.len() == 3 => {
            let branch_returns = |branch: &Expr, expected: &str| {
                matches!(branch, Expr::Call(b) if b.name == expected && returns_on_all_paths(&b.body_arguments))
            };
            branch_returns(&c.args[1], "then") && branch_returns(&c.args[2], "else")
        }
        _ => false,
    }
}

struct Checker<'a> {
    program: &'a Program,
    return_types: &'a ReturnTypes,
    active_effects: HashSet<String>,
    return_ty: Ty,
}

impl<'a> Checker<'a> {
    fn lookup(&self, scope: &Scope, name: &str) -> Option<Ty> {
        scope.iter().rev().find_map(|s| s.get(name)).map(|b| b.ty.clone())
    }

    fn lookup_mutable(&self, scope: &Scope, name: &str) -> bool {
        scope.iter().rev().find_map(|s| s.get(name)).map(|b| b.mutable).unwrap_or(false)
    }

    fn declare(&self, scope: &mut Scope, name: &str, ty: Ty, mutable: bool, pos: Position) -> Result<(), Error> {
        if scope[0].contains_key(name) {
            return Err(Error::BindingShadowsParameter(name.to_string(), pos));
        }
        if let Some(top) = scope.last_mut() {
            if top.contains_key(name) {
                return Err(Error::DuplicateBindingName(name.to_string(), pos));
            }
            top.insert(name.to_string(), Binding { ty, mutable });
        }
        Ok(())
    }

    fn check_block(&self, stmts: &[Expr], scope: &mut Scope) -> Result<(), Error> {
        for stmt in stmts {
            self.check_expr(stmt, scope, true, Position::start())?;
        }
        Ok(())
    }

    fn check_expr(&self, expr: &Expr, scope: &mut Scope, in_stmt: bool, ctx_pos: Position) -> Result<Ty, Error> {
        match expr {
            Expr::Literal { width, unsigned, .. } => Ok(Ty::Primitive(literal_primitive(*width, *unsigned))),
            Expr::FloatLiteral { width, .. } => Ok(Ty::Primitive(float_primitive(*width))),
            Expr::BoolLiteral(_) => Ok(Ty::Primitive("bool".to_string())),
            Expr::StringLiteral(_) => Ok(Ty::Primitive("string".to_string())),
            Expr::Name(n) => self
                .lookup(scope, n)
                .ok_or_else(|| Error::UnboundName(n.clone(), ctx_pos)),
            Expr::Call(c) => self.check_call(c, scope, in_stmt),
        }
    }

    fn check_call(&self, c: &Call, scope: &mut Scope, in_stmt: bool) -> Result<Ty, Error> {
        if c.is_binding {
            return self.check_binding(c, scope);
        }

        if matches!(c.name.as_str(), "if" | "then" | "else" | "return") {
            if !in_stmt {
                return Err(Error::ControlCallInExpressionContext(c.name.clone(), c.position));
            }
            return self.check_control_call(c, scope);
        }

        if matches!(c.name.as_str(), "array" | "vector" | "map") {
            return self.check_collection_literal(c, scope);
        }

        if registries::is_builtin(&c.name) {
            if c.arg_names.iter().any(Option::is_some) {
                return Err(Error::BuiltinRejectsNamedArguments(c.name.clone(), c.position));
            }
            return self.check_builtin(c, scope);
        }

        self.check_user_call(c, scope)
    }

    fn check_binding(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        let declared = types::declared_type(&c.transforms);
        let init = c.initializer();
        let init_ty = match init {
            Some(e) => Some(self.check_expr(e, scope, false, c.position)?),
            None => None,
        };

        match &declared {
            Ty::Reference(_) => {
                let is_location_call =
                    matches!(init, Some(Expr::Call(ic)) if ic.name == "location" && !ic.is_binding);
                if !is_location_call {
                    return Err(Error::ReferenceInitializerMustBeLocation(c.position));
                }
            }
            Ty::Pointer(inner) => {
                if !inner.is_primitive() {
                    return Err(Error::PointerTargetNotPrimitive(format!("{:?}", inner), c.position));
                }
            }
            _ => {}
        }

        let final_ty = if declared != Ty::Unknown { declared } else { init_ty.unwrap_or(Ty::Unknown) };
        let mutable = c.transforms.iter().any(|t| t.name == "mut");
        self.declare(scope, &c.name, final_ty, mutable, c.position)?;
        Ok(Ty::Void)
    }

    fn check_control_call(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        match c.name.as_str() {
            "return" => {
                match (&self.return_ty, c.args.first()) {
                    (Ty::Void, None) => {}
                    (Ty::Void, Some(_)) => return Err(Error::ReturnValueInVoidDefinition(c.position)),
                    (_, Some(arg)) => {
                        self.check_expr(arg, scope, false, c.position)?;
                    }
                    (_, None) => return Err(Error::ReturnArityMismatch(c.position)),
                }
                Ok(Ty::Void)
            }
            "if" => {
                if c.args.len() != 3 {
                    return Err(Error::InvalidOperandKinds("if".to_string(), c.position));
                }
                let cond_ty = self.check_expr(&c.args[0], scope, false, c.position)?;
                if cond_ty != Ty::Unknown && cond_ty != Ty::Primitive("bool".to_string()) {
                    return Err(Error::InvalidOperandKinds("if".to_string(), c.position));
                }
                for (branch, expected) in [(&c.args[1], "then"), (&c.args[2], "else")] {
                    match branch {
                        Expr::Call(b) if b.name == expected => {
                            scope.push(HashMap::new());
                            let result = self.check_block(&b.body_arguments, scope);
                            scope.pop();
                            result?;
                        }
                        _ => return Err(Error::InvalidOperandKinds("if".to_string(), c.position)),
                    }
                }
                Ok(Ty::Void)
            }
            "then" | "else" => {
                scope.push(HashMap::new());
                let result = self.check_block(&c.body_arguments, scope);
                scope.pop();
                result?;
                Ok(Ty::Void)
            }
            _ => unreachable!("matched only if/then/else/return"),
        }
    }

    fn check_collection_literal(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        if c.arg_names.iter().any(Option::is_some) {
            return Err(Error::BuiltinRejectsNamedArguments(c.name.clone(), c.position));
        }
        match c.name.as_str() {
            "array" | "vector" => {
                if c.template_args.len() != 1 {
                    return Err(Error::CollectionArityMismatch(c.name.clone(), c.position));
                }
                for a in &c.args {
                    self.check_expr(a, scope, false, c.position)?;
                }
                let inner = Box::new(types::parse_type_text(&c.template_args[0]));
                Ok(if c.name == "array" { Ty::Array(inner) } else { Ty::Vector(inner) })
            }
            "map" => {
                if c.template_args.len() != 2 || c.args.len() % 2 != 0 {
                    return Err(Error::CollectionArityMismatch(c.name.clone(), c.position));
                }
                for a in &c.args {
                    self.check_expr(a, scope, false, c.position)?;
                }
                Ok(Ty::Map(
                    Box::new(types::parse_type_text(&c.template_args[0])),
                    Box::new(types::parse_type_text(&c.template_args[1])),
                ))
            }
            _ => unreachable!("matched only array/vector/map"),
        }
    }

    fn check_builtin(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        let name = c.name.as_str();

        if registries::ARITHMETIC_BUILTINS.contains(&name) {
            return self.check_arithmetic(c, scope);
        }
        if registries::COMPARISON_BUILTINS.contains(&name) {
            return self.check_comparison(c, scope);
        }
        if registries::LOGICAL_BUILTINS.contains(&name) {
            return self.check_logical(c, scope);
        }
        if registries::NUMERIC_SELECT_BUILTINS.contains(&name) {
            return self.check_numeric_select_builtin(c, scope);
        }
        if registries::POINTER_BUILTINS.contains(&name) {
            return self.check_pointer_builtin(c, scope);
        }
        if registries::INCREMENT_BUILTINS.contains(&name) {
            let arg = c.args.first().ok_or_else(|| Error::InvalidOperandKinds(name.to_string(), c.position))?;
            let ty = self.check_expr(arg, scope, false, c.position)?;
            if types::num_kind_of(&ty).is_none() {
                return Err(Error::InvalidOperandKinds(name.to_string(), c.position));
            }
            return Ok(ty);
        }
        if registries::CONTAINER_BUILTINS.contains(&name) {
            return self.check_container_builtin(c, scope);
        }
        if registries::is_print_builtin(name) {
            return self.check_print_builtin(c, scope);
        }
        match name {
            "assign" => self.check_assign(c, scope),
            "convert" => self.check_convert(c, scope),
            other => Err(Error::InvalidOperandKinds(other.to_string(), c.position)),
        }
    }

    fn check_arithmetic(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        if c.name == "negate" {
            let arg = c.args.first().ok_or_else(|| Error::InvalidOperandKinds(c.name.clone(), c.position))?;
            let ty = self.check_expr(arg, scope, false, c.position)?;
            let kind = types::num_kind_of(&ty).ok_or_else(|| Error::InvalidOperandKinds(c.name.clone(), c.position))?;
            if kind == NumKind::U64 {
                return Err(Error::NegateUnsigned(c.position));
            }
            return Ok(ty);
        }

        let (lhs, rhs) = self.binary_operands(c, scope)?;

        if matches!(lhs, Ty::Pointer(_)) || matches!(rhs, Ty::Pointer(_)) {
            if c.name != "plus" && c.name != "minus" {
                return Err(Error::InvalidOperandKinds(c.name.clone(), c.position));
            }
            let left_is_pointer = matches!(lhs, Ty::Pointer(_));
            let right_is_integer = types::num_kind_of(&rhs)
                .map(|k| matches!(k, NumKind::I32 | NumKind::I64 | NumKind::U64))
                .unwrap_or(false);
            if !(left_is_pointer && right_is_integer) {
                return Err(Error::PointerArithmeticShape(c.position));
            }
            return Ok(lhs);
        }

        let a = types::num_kind_of(&lhs).ok_or_else(|| Error::InvalidOperandKinds(c.name.clone(), c.position))?;
        let b = types::num_kind_of(&rhs).ok_or_else(|| Error::InvalidOperandKinds(c.name.clone(), c.position))?;
        let result = types::promote(a, b).ok_or_else(|| Error::InvalidOperandKinds(c.name.clone(), c.position))?;
        Ok(ty_of_num_kind(result))
    }

    fn check_comparison(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        let (lhs, rhs) = self.binary_operands(c, scope)?;
        if lhs.is_string() && rhs.is_string() {
            return Ok(Ty::Primitive("bool".to_string()));
        }
        if lhs.is_string() || rhs.is_string() {
            return Err(Error::InvalidOperandKinds(c.name.clone(), c.position));
        }
        let a = types::num_kind_of(&lhs).ok_or_else(|| Error::InvalidOperandKinds(c.name.clone(), c.position))?;
        let b = types::num_kind_of(&rhs).ok_or_else(|| Error::InvalidOperandKinds(c.name.clone(), c.position))?;
        types::comparison_num_kind(a, b).ok_or_else(|| Error::InvalidOperandKinds(c.name.clone(), c.position))?;
        Ok(Ty::Primitive("bool".to_string()))
    }

    fn check_logical(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        let bool_ty = Ty::Primitive("bool".to_string());
        for a in &c.args {
            let ty = self.check_expr(a, scope, false, c.position)?;
            if ty != bool_ty && ty != Ty::Unknown {
                return Err(Error::InvalidOperandKinds(c.name.clone(), c.position));
            }
        }
        Ok(bool_ty)
    }

    /// `clamp(value, lo, hi)` and `lerp(a, b, t)` take exactly three numeric
    /// operands; `min`/`max` take two or more. All promote through the same
    /// numeric table as arithmetic, so mixed signed/unsigned operands are
    /// rejected the same way `promote` already rejects them for `plus`/`minus`.
    fn check_numeric_select_builtin(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        let arity_ok = match c.name.as_str() {
            "clamp" | "lerp" => c.args.len() == 3,
            _ => c.args.len() >= 2,
        };
        if !arity_ok {
            return Err(Error::InvalidOperandKinds(c.name.clone(), c.position));
        }

        let mut kinds = Vec::with_capacity(c.args.len());
        for a in &c.args {
            let ty = self.check_expr(a, scope, false, c.position)?;
            let kind = types::num_kind_of(&ty).ok_or_else(|| Error::InvalidOperandKinds(c.name.clone(), c.position))?;
            kinds.push(kind);
        }

        let mut acc = kinds[0];
        for k in &kinds[1..] {
            acc = types::promote(acc, *k).ok_or_else(|| Error::InvalidOperandKinds(c.name.clone(), c.position))?;
        }
        Ok(ty_of_num_kind(acc))
    }

    fn check_pointer_builtin(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        let arg = c.args.first().ok_or_else(|| Error::InvalidOperandKinds(c.name.clone(), c.position))?;
        let ty = self.check_expr(arg, scope, false, c.position)?;
        match c.name.as_str() {
            "location" => Ok(Ty::Reference(Box::new(ty))),
            "dereference" => match ty {
                Ty::Pointer(inner) | Ty::Reference(inner) => Ok(*inner),
                Ty::Unknown => Ok(Ty::Unknown),
                _ => Err(Error::InvalidOperandKinds(c.name.clone(), c.position)),
            },
            _ => unreachable!("matched only location/dereference"),
        }
    }

    fn check_container_builtin(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        let target = c.args.first().ok_or_else(|| Error::DispatchTargetInvalid(c.name.clone(), c.position))?;
        let target_ty = self.check_expr(target, scope, false, c.position)?;
        let element_ty = match &target_ty {
            Ty::Array(inner) | Ty::Vector(inner) => inner.as_ref().clone(),
            Ty::Map(_, value) => value.as_ref().clone(),
            Ty::Primitive(p) if p == "string" => Ty::Primitive("i32".to_string()),
            Ty::Unknown => Ty::Unknown,
            _ => return Err(Error::DispatchTargetInvalid(c.name.clone(), c.position)),
        };
        if c.name != "count" {
            let index = c.args.get(1).ok_or_else(|| Error::DispatchTargetInvalid(c.name.clone(), c.position))?;
            let index_ty = self.check_expr(index, scope, false, c.position)?;
            let is_integer = types::num_kind_of(&index_ty)
                .map(|k| matches!(k, NumKind::I32 | NumKind::I64 | NumKind::U64))
                .unwrap_or(index_ty == Ty::Unknown);
            if !is_integer {
                return Err(Error::DispatchTargetInvalid(c.name.clone(), c.position));
            }
            return Ok(element_ty);
        }
        Ok(Ty::Primitive("i32".to_string()))
    }

    fn check_print_builtin(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        let Some(effect) = registries::print_builtin_effect(&c.name) else {
            return Ok(Ty::Void);
        };
        if !self.active_effects.contains(effect) {
            return Err(Error::PrintMissingEffect(c.name.clone(), c.position));
        }
        for a in &c.args {
            let ty = self.check_expr(a, scope, false, c.position)?;
            let printable = matches!(ty, Ty::Primitive(_)) || ty == Ty::Unknown;
            if !printable {
                return Err(Error::PrintTargetNotPrintable(c.position));
            }
        }
        Ok(Ty::Void)
    }

    fn check_assign(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        let target = c.args.first().ok_or(Error::AssignTargetInvalid(c.position))?;
        let target_is_mutable = match target {
            Expr::Name(n) => self.lookup_mutable(scope, n),
            Expr::Call(ic) if ic.name == "dereference" && !ic.is_binding => match ic.args.first() {
                Some(Expr::Name(n)) => self.lookup_mutable(scope, n),
                _ => false,
            },
            _ => false,
        };
        if !target_is_mutable {
            return Err(Error::AssignTargetInvalid(c.position));
        }
        self.check_expr(target, scope, false, c.position)?;
        if let Some(src) = c.args.get(1) {
            self.check_expr(src, scope, false, c.position)?;
        }
        Ok(Ty::Void)
    }

    fn check_convert(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        let target = c.template_args.first().cloned().unwrap_or_default();
        if !registries::is_primitive_type(&target) {
            return Err(Error::ConvertUnknownTarget(target, c.position));
        }
        for a in &c.args {
            self.check_expr(a, scope, false, c.position)?;
        }
        Ok(types::parse_type_text(&target))
    }

    fn binary_operands(&self, c: &Call, scope: &mut Scope) -> Result<(Ty, Ty), Error> {
        if c.args.len() != 2 {
            return Err(Error::InvalidOperandKinds(c.name.clone(), c.position));
        }
        let lhs = self.check_expr(&c.args[0], scope, false, c.position)?;
        let rhs = self.check_expr(&c.args[1], scope, false, c.position)?;
        Ok((lhs, rhs))
    }

    fn check_user_call(&self, c: &Call, scope: &mut Scope) -> Result<Ty, Error> {
        let callee = self
            .program
            .find_definition(&c.callee_full_path())
            .ok_or_else(|| Error::UnknownCallTarget(c.name.clone(), c.position))?;

        let param_names: Vec<&str> = callee.parameters.iter().map(|p| p.name.as_str()).collect();
        let mut seen_names = HashSet::new();
        let mut seen_named = false;
        for name in &c.arg_names {
            match name {
                Some(n) => {
                    seen_named = true;
                    if !param_names.contains(&n.as_str()) {
                        return Err(Error::UnknownNamedArgument(n.clone(), c.position));
                    }
                    if !seen_names.insert(n.clone()) {
                        return Err(Error::DuplicateNamedArgument(n.clone(), c.position));
                    }
                }
                None if seen_named => return Err(Error::PositionalAfterNamed(c.position)),
                None => {}
            }
        }

        for a in &c.args {
            self.check_expr(a, scope, false, c.position)?;
        }

        if c.has_body_arguments {
            scope.push(HashMap::new());
            let result = self.check_block(&c.body_arguments, scope);
            scope.pop();
            result?;
        }

        Ok(self.return_types.get(&callee.full_path))
    }
}

fn literal_primitive(width: crate::ast::Width, unsigned: bool) -> String {
    match (width, unsigned) {
        (crate::ast::Width::W32, _) => "i32".to_string(),
        (crate::ast::Width::W64, true) => "u64".to_string(),
        (crate::ast::Width::W64, false) => "i64".to_string(),
    }
}

fn float_primitive(width: crate::ast::Width) -> String {
    match width {
        crate::ast::Width::W32 => "f32".to_string(),
        crate::ast::Width::W64 => "f64".to_string(),
    }
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
