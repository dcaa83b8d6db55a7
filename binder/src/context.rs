// Copyright (c) 2016-2021 Fabian Schuiki

//! The read-only context threaded through all bind calls: the enclosing
//! scope for name resolution, the allocator, the diagnostic sink, and flags
//! describing the syntactic surroundings.

use crate::expr::Ty;
use crate::SemanticArena;
use sylva_syntax::ast;
use sylva_common::errors::DiagEmitter;
use sylva_common::name::Name;
use sylva_common::source::Span;
use std::collections::HashMap;

bitflags::bitflags! {
    /// Flags describing the syntactic context a bind happens in.
    pub struct BindFlags: u8 {
        /// Binding inside a procedural block rather than a continuous
        /// assignment.
        const PROCEDURAL    = 0b0001;
        /// The result must be a constant expression.
        const CONSTANT      = 0b0010;
        /// Assignment patterns are allowed here.
        const ALLOW_PATTERN = 0b0100;
    }
}

/// What a name refers to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DefKind {
    Var,
    Net,
    Param,
    Port,
    Genvar,
    Subroutine,
}

/// A resolved definition, as handed out by a scope.
#[derive(Clone, Copy, Debug)]
pub struct Def {
    pub name: Name,
    pub span: Span,
    pub kind: DefKind,
    pub ty: Ty,
}

/// Resolves names to definitions. The binder only performs local lookups;
/// hierarchical resolution across modules is the elaborator's business.
pub trait Scope {
    fn resolve(&self, name: Name) -> Option<Def>;
}

/// A scope with no names in it.
pub struct EmptyScope;

impl Scope for EmptyScope {
    fn resolve(&self, _: Name) -> Option<Def> {
        None
    }
}

/// A flat map of definitions, with an optional parent to fall back to.
/// Sufficient to bind the local constructs this crate covers.
pub struct ScopeMap<'p> {
    defs: HashMap<Name, Def>,
    parent: Option<&'p dyn Scope>,
}

impl<'p> ScopeMap<'p> {
    pub fn new() -> ScopeMap<'p> {
        ScopeMap {
            defs: HashMap::new(),
            parent: None,
        }
    }

    pub fn with_parent(parent: &'p dyn Scope) -> ScopeMap<'p> {
        ScopeMap {
            defs: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Add a definition. The first definition of a name wins, matching the
    /// declaration order semantics of a file.
    pub fn insert(&mut self, def: Def) {
        self.defs.entry(def.name).or_insert(def);
    }

    /// Collect the declared names of a module body.
    pub fn from_module(module: &ast::ModDecl) -> ScopeMap<'p> {
        let mut scope = ScopeMap::new();
        for port in &module.ports {
            if let ast::Port::Named {
                ref ty, ref name, ..
            } = *port
            {
                scope.insert(Def {
                    name: name.name,
                    span: name.span,
                    kind: DefKind::Port,
                    ty: ty_of_ast_type(ty),
                });
            }
        }
        for param in &module.params {
            for name in &param.names {
                scope.insert(Def {
                    name: name.name.name,
                    span: name.name.span,
                    kind: DefKind::Param,
                    ty: Ty::Logic {
                        width: 32,
                        signed: true,
                    },
                });
            }
        }
        scope.collect_items(&module.items);
        scope
    }

    /// Collect the properties of a class body, e.g. to bind its constraint
    /// blocks.
    pub fn from_class(class: &ast::ClassDecl) -> ScopeMap<'p> {
        let mut scope = ScopeMap::new();
        for item in &class.items {
            if let ast::ClassItemData::Property(ref decl) = item.data {
                let ty = ty_of_ast_type(&decl.ty);
                for name in &decl.names {
                    scope.insert(Def {
                        name: name.name,
                        span: name.name_span,
                        kind: DefKind::Var,
                        ty: ty,
                    });
                }
            }
        }
        scope
    }

    fn collect_items(&mut self, items: &[ast::Item]) {
        for item in items {
            match *item {
                ast::Item::NetDecl(ref decl) => {
                    let ty = ty_of_ast_type(&decl.ty);
                    for name in &decl.names {
                        self.insert(Def {
                            name: name.name,
                            span: name.name_span,
                            kind: DefKind::Net,
                            ty: ty,
                        });
                    }
                }
                ast::Item::VarDecl(ref decl) => {
                    let ty = ty_of_ast_type(&decl.ty);
                    for name in &decl.names {
                        self.insert(Def {
                            name: name.name,
                            span: name.name_span,
                            kind: DefKind::Var,
                            ty: ty,
                        });
                    }
                }
                ast::Item::PortDecl(ref decl) => {
                    let ty = ty_of_ast_type(&decl.ty);
                    for name in &decl.names {
                        self.insert(Def {
                            name: name.name,
                            span: name.name_span,
                            kind: DefKind::Port,
                            ty: ty,
                        });
                    }
                }
                ast::Item::GenvarDecl(ref decls) => {
                    for decl in decls {
                        self.insert(Def {
                            name: decl.name,
                            span: decl.name_span,
                            kind: DefKind::Genvar,
                            ty: Ty::Logic {
                                width: 32,
                                signed: true,
                            },
                        });
                    }
                }
                ast::Item::ParamDecl(ref decl) => {
                    for name in &decl.names {
                        self.insert(Def {
                            name: name.name.name,
                            span: name.name.span,
                            kind: DefKind::Param,
                            ty: Ty::Logic {
                                width: 32,
                                signed: true,
                            },
                        });
                    }
                }
                ast::Item::SubroutineDecl(ref decl) => {
                    self.insert(Def {
                        name: decl.prototype.name.name,
                        span: decl.prototype.name.span,
                        kind: DefKind::Subroutine,
                        ty: decl
                            .prototype
                            .retty
                            .as_ref()
                            .map(ty_of_ast_type)
                            .unwrap_or(Ty::Void),
                    });
                }
                _ => (),
            }
        }
    }
}

impl<'p> Scope for ScopeMap<'p> {
    fn resolve(&self, name: Name) -> Option<Def> {
        match self.defs.get(&name) {
            Some(def) => Some(*def),
            None => self.parent.and_then(|p| p.resolve(name)),
        }
    }
}

/// Derive a simple type from an AST data type. Packed dimensions with
/// literal decimal bounds contribute their width; anything the binder
/// cannot see through defaults to a single bit.
pub fn ty_of_ast_type(ty: &ast::Type) -> Ty {
    use sylva_syntax::ast::TypeData::*;
    let signed = ty.sign == ast::TypeSign::Signed;
    let base = match ty.data {
        VoidType => return Ty::Void,
        StringType => return Ty::String,
        TimeType => return Ty::Time,
        EventType => return Ty::Event,
        ByteType => {
            return Ty::Logic {
                width: 8,
                signed: ty.sign != ast::TypeSign::Unsigned,
            }
        }
        ShortIntType => {
            return Ty::Logic {
                width: 16,
                signed: ty.sign != ast::TypeSign::Unsigned,
            }
        }
        IntType | IntegerType => {
            return Ty::Logic {
                width: 32,
                signed: ty.sign != ast::TypeSign::Unsigned,
            }
        }
        LongIntType => {
            return Ty::Logic {
                width: 64,
                signed: ty.sign != ast::TypeSign::Unsigned,
            }
        }
        BitType | LogicType | RegType | ImplicitType => 1usize,
        _ => 1usize,
    };
    let mut width = base;
    for dim in &ty.dims {
        if let ast::TypeDim::Range(ref lo, ref hi) = *dim {
            match (literal_usize(lo), literal_usize(hi)) {
                (Some(a), Some(b)) => {
                    width *= if a > b { a - b + 1 } else { b - a + 1 };
                }
                _ => (),
            }
        }
    }
    Ty::Logic {
        width: width,
        signed: signed,
    }
}

/// Extract a plain decimal literal as a usize, if the expression is one.
fn literal_usize(expr: &ast::Expr) -> Option<usize> {
    use sylva_syntax::token::Lit;
    match expr.data {
        ast::ExprData::LiteralExpr(Lit::Number(int, None)) => int.as_str().parse().ok(),
        _ => None,
    }
}

/// The read-only value threaded through all bind calls.
pub struct BindContext<'sb> {
    /// The enclosing scope used to resolve names.
    pub scope: &'sb dyn Scope,
    /// The arena semantic nodes are allocated into.
    pub arena: &'sb SemanticArena<'sb>,
    /// The sink diagnostics are reported to.
    pub emitter: &'sb dyn DiagEmitter,
    /// Flags describing the syntactic context.
    pub flags: BindFlags,
}

impl<'sb> BindContext<'sb> {
    pub fn new(
        scope: &'sb dyn Scope,
        arena: &'sb SemanticArena<'sb>,
        emitter: &'sb dyn DiagEmitter,
    ) -> BindContext<'sb> {
        BindContext {
            scope: scope,
            arena: arena,
            emitter: emitter,
            flags: BindFlags::empty(),
        }
    }

    /// Derive a context with different flags.
    pub fn with_flags(&self, flags: BindFlags) -> BindContext<'sb> {
        BindContext {
            scope: self.scope,
            arena: self.arena,
            emitter: self.emitter,
            flags: flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sylva_common::name::get_name_table;
    use sylva_common::source::INVALID_SPAN;

    #[test]
    fn scope_map_resolution() {
        let nt = get_name_table();
        let x = nt.intern("x", true);
        let y = nt.intern("y", true);
        let mut outer = ScopeMap::new();
        outer.insert(Def {
            name: x,
            span: INVALID_SPAN,
            kind: DefKind::Var,
            ty: Ty::Logic {
                width: 1,
                signed: false,
            },
        });
        let inner = ScopeMap::with_parent(&outer);
        assert!(inner.resolve(x).is_some());
        assert!(inner.resolve(y).is_none());
        // Lookup is case sensitive.
        assert!(inner.resolve(nt.intern("X", true)).is_none());
    }
}
