//! Pass A — structural indexing (`spec.md` §4.5): full-path uniqueness,
//! struct-like pre-classification, and transform pre-validation for
//! `return`, `effects`, `capabilities`, and `align_bytes`/`align_kbytes`.

use std::collections::HashMap;

use crate::ast::{Definition, Program, TopLevelItem, TransformArg};
use crate::registries;

use super::Error;

pub fn run(program: &Program) -> Result<(), Error> {
    let mut seen: HashMap<&str, ()> = HashMap::new();
    for item in &program.items {
        if let TopLevelItem::Definition(def) = item {
            if seen.insert(&def.full_path, ()).is_some() {
                return Err(Error::DuplicateFullPath(def.full_path.clone(), def.position));
            }
        }
    }

    for def in program.definitions() {
        check_struct_like_shape(def)?;
        check_transforms(def)?;
    }
    Ok(())
}

fn check_struct_like_shape(def: &Definition) -> Result<(), Error> {
    if !def.is_struct_like() {
        return Ok(());
    }
    if def.transforms.iter().any(|t| t.name == "return") {
        return Err(Error::StructLikeCannotHaveReturn(def.full_path.clone(), def.position));
    }
    if !def.parameters.is_empty() {
        return Err(Error::StructLikeCannotHaveParameters(def.full_path.clone(), def.position));
    }
    if def.declared_explicit_return_statement() {
        return Err(Error::StructLikeCannotHaveReturnStatement(def.full_path.clone(), def.position));
    }
    Ok(())
}

fn check_transforms(def: &Definition) -> Result<(), Error> {
    for t in &def.transforms {
        match t.name.as_str() {
            "effects" | "capabilities" => {
                for arg in &t.value_args {
                    if let TransformArg::Identifier(name) = arg {
                        if !registries::is_lower_snake_case(name) {
                            return Err(Error::InvalidEffectName(name.clone(), t.position));
                        }
                    } else {
                        return Err(Error::InvalidEffectName("<non-identifier>".to_string(), t.position));
                    }
                }
            }
            "align_bytes" | "align_kbytes" => {
                let ok = t.value_args.len() == 1
                    && matches!(
                        t.value_args[0],
                        TransformArg::Literal(crate::ast::Expr::Literal { .. })
                    );
                if !ok {
                    return Err(Error::InvalidAlignArgument(t.name.clone(), t.position));
                }
            }
            _ => {}
        }
    }
    Ok(())
}
