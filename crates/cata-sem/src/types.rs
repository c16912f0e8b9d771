//! The type universe.
//!
//! Types live in a `TypeArena` and are referenced by `TypeId`. Declarations
//! may reference each other in any order, so the prototype pass refines
//! types *in place*: `replace` writes new contents into an existing id and
//! every earlier reference observes the refinement. The `method_of` and
//! super references are ids too, which breaks the member/owner cycle.
//!
//! Equality is canonical-FQN equality. Assignability follows the class
//! hierarchy for object handles and is unconditional between primitives.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::member::Member;

/// Index of a type in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// A primitive type: token, width, signedness, floatness, and the
/// specialization score used for most-specialized-wins result typing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Primitive {
    pub token: &'static str,
    pub bits: u32,
    pub is_signed: bool,
    pub is_float: bool,
    pub score: i32,
}

/// A function type. `parameters` holds the declared parameters; methods are
/// marked by `method_of` and receive their `this` pointer at the IR level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionType {
    pub return_type: TypeId,
    pub parameters: Vec<TypeId>,
    pub method_of: Option<TypeId>,
}

/// Data shared by structs, classes, and interfaces.
#[derive(Clone, Debug)]
pub struct CustomType {
    pub name: String,
    pub members: Vec<Member>,
    /// Supers, in declaration order. Empty for structs.
    pub supers: SmallVec<[TypeId; 2]>,
    /// The synthetic init function, once created by the prototype pass.
    pub init_function: Option<cata_llir::FuncId>,
    /// Memoised LLIR struct shape.
    pub llir_struct: Option<cata_llir::TyId>,
    /// Memoised vtable struct shape (virtual types only).
    pub metadata_struct: Option<cata_llir::TyId>,
    /// Emitted vtable objects, keyed by the presenting ancestor.
    pub metadata_objects: FxHashMap<TypeId, cata_llir::GlobalId>,
}

impl CustomType {
    pub fn new(name: impl Into<String>, members: Vec<Member>, supers: SmallVec<[TypeId; 2]>) -> Self {
        CustomType {
            name: name.into(),
            members,
            supers,
            init_function: None,
            llir_struct: None,
            metadata_struct: None,
            metadata_objects: FxHashMap::default(),
        }
    }
}

/// The closed set of type variants.
#[derive(Clone, Debug)]
pub enum Type {
    /// Invalid sentinel; never a valid resolved type.
    Undefined,
    Void,
    Primitive(Primitive),
    Function(FunctionType),
    Namespace(String),
    Struct(CustomType),
    Class(CustomType),
    Iface(CustomType),
    /// A handle to a custom type: the type of a program variable holding an
    /// instance.
    Object(TypeId),
}

/// Which custom variant a `TypeId` is, when it is one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomKind {
    Struct,
    Class,
    Iface,
}

const PRIMITIVE_TABLE: &[Primitive] = &[
    Primitive { token: "bool", bits: 1, is_signed: false, is_float: false, score: 1 },
    Primitive { token: "i8", bits: 8, is_signed: true, is_float: false, score: 8 },
    Primitive { token: "i16", bits: 16, is_signed: true, is_float: false, score: 9 },
    Primitive { token: "i32", bits: 32, is_signed: true, is_float: false, score: 10 },
    Primitive { token: "i64", bits: 64, is_signed: true, is_float: false, score: 11 },
    Primitive { token: "i128", bits: 128, is_signed: true, is_float: false, score: 12 },
    Primitive { token: "isize", bits: 64, is_signed: true, is_float: false, score: 11 },
    Primitive { token: "u8", bits: 8, is_signed: false, is_float: false, score: 8 },
    Primitive { token: "u16", bits: 16, is_signed: false, is_float: false, score: 9 },
    Primitive { token: "u32", bits: 32, is_signed: false, is_float: false, score: 10 },
    Primitive { token: "u64", bits: 64, is_signed: false, is_float: false, score: 11 },
    Primitive { token: "u128", bits: 128, is_signed: false, is_float: false, score: 12 },
    Primitive { token: "usize", bits: 64, is_signed: false, is_float: false, score: 11 },
    Primitive { token: "f16", bits: 16, is_signed: true, is_float: true, score: 19 },
    Primitive { token: "f32", bits: 32, is_signed: true, is_float: true, score: 20 },
    Primitive { token: "f64", bits: 64, is_signed: true, is_float: true, score: 21 },
    Primitive { token: "f80", bits: 80, is_signed: true, is_float: true, score: 22 },
    Primitive { token: "f128", bits: 128, is_signed: true, is_float: true, score: 23 },
];

/// Owns every semantic type of a compilation session.
#[derive(Debug)]
pub struct TypeArena {
    types: Vec<Type>,
    primitives: FxHashMap<&'static str, TypeId>,
    undefined: TypeId,
    void_ty: TypeId,
}

impl TypeArena {
    pub fn new() -> Self {
        let mut arena = TypeArena {
            types: Vec::new(),
            primitives: FxHashMap::default(),
            undefined: TypeId(0),
            void_ty: TypeId(0),
        };
        arena.undefined = arena.alloc(Type::Undefined);
        arena.void_ty = arena.alloc(Type::Void);
        for prim in PRIMITIVE_TABLE {
            let id = arena.alloc(Type::Primitive(*prim));
            arena.primitives.insert(prim.token, id);
        }
        arena
    }

    pub fn alloc(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.0 as usize]
    }

    /// Write new contents into an existing id. For custom types the emitted
    /// caches (init function, memoised shapes, vtable objects) survive the
    /// refinement.
    pub fn replace(&mut self, id: TypeId, ty: Type) {
        fn carry(old: CustomType, mut new: CustomType) -> CustomType {
            new.init_function = old.init_function;
            new.llir_struct = old.llir_struct;
            new.metadata_struct = old.metadata_struct;
            new.metadata_objects = old.metadata_objects;
            new
        }
        let old = std::mem::replace(&mut self.types[id.0 as usize], Type::Undefined);
        let merged = match (old, ty) {
            (Type::Struct(o), Type::Struct(n)) => Type::Struct(carry(o, n)),
            (Type::Class(o), Type::Class(n)) => Type::Class(carry(o, n)),
            (Type::Iface(o), Type::Iface(n)) => Type::Iface(carry(o, n)),
            (_, ty) => ty,
        };
        self.types[id.0 as usize] = merged;
    }

    // ---- well-known ids ----

    pub fn undefined(&self) -> TypeId {
        self.undefined
    }

    pub fn void(&self) -> TypeId {
        self.void_ty
    }

    /// Look up a primitive (or `void`) by its source token.
    pub fn builtin(&self, token: &str) -> Option<TypeId> {
        if token == "void" {
            return Some(self.void_ty);
        }
        self.primitives.get(token).copied()
    }

    pub fn function(&mut self, return_type: TypeId, parameters: Vec<TypeId>) -> TypeId {
        self.alloc(Type::Function(FunctionType {
            return_type,
            parameters,
            method_of: None,
        }))
    }

    pub fn object(&mut self, custom: TypeId) -> TypeId {
        self.alloc(Type::Object(custom))
    }

    // ---- classification ----

    pub fn is_valid(&self, id: TypeId) -> bool {
        match self.get(id) {
            Type::Undefined => false,
            Type::Void | Type::Primitive(_) | Type::Namespace(_) => true,
            Type::Function(f) => {
                self.is_valid(f.return_type) && f.parameters.iter().all(|&p| self.is_valid(p))
            }
            Type::Struct(c) | Type::Class(c) | Type::Iface(c) => {
                c.members.iter().all(|m| self.is_valid(m.ty))
                    && c.supers.iter().all(|&s| self.is_valid(s))
            }
            Type::Object(custom) => self.is_valid(*custom),
        }
    }

    pub fn custom_kind(&self, id: TypeId) -> Option<CustomKind> {
        match self.get(id) {
            Type::Struct(_) => Some(CustomKind::Struct),
            Type::Class(_) => Some(CustomKind::Class),
            Type::Iface(_) => Some(CustomKind::Iface),
            _ => None,
        }
    }

    pub fn is_custom(&self, id: TypeId) -> bool {
        self.custom_kind(id).is_some()
    }

    pub fn is_virtual(&self, id: TypeId) -> bool {
        matches!(self.custom_kind(id), Some(CustomKind::Class | CustomKind::Iface))
    }

    pub fn custom(&self, id: TypeId) -> Option<&CustomType> {
        match self.get(id) {
            Type::Struct(c) | Type::Class(c) | Type::Iface(c) => Some(c),
            _ => None,
        }
    }

    pub fn custom_mut(&mut self, id: TypeId) -> Option<&mut CustomType> {
        match self.get_mut(id) {
            Type::Struct(c) | Type::Class(c) | Type::Iface(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_function(&self, id: TypeId) -> Option<&FunctionType> {
        match self.get(id) {
            Type::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_primitive(&self, id: TypeId) -> Option<&Primitive> {
        match self.get(id) {
            Type::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// The custom type behind an object handle, if `id` is one.
    pub fn object_custom(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id) {
            Type::Object(custom) => Some(*custom),
            _ => None,
        }
    }

    // ---- FQN encoding ----

    /// The canonical FQN of a type. Two types are equal iff their FQNs are.
    pub fn fqn(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Undefined => "<undefined>".to_string(),
            Type::Void => "void".to_string(),
            Type::Primitive(p) => p.token.to_string(),
            Type::Namespace(name) => name.clone(),
            Type::Function(f) => {
                let mut out = String::from("fn(");
                for (i, &p) in f.parameters.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&self.fqn(p));
                }
                out.push_str(")->");
                out.push_str(&self.fqn(f.return_type));
                out
            }
            Type::Struct(c) => self.custom_fqn("struct", c, false),
            Type::Class(c) => self.custom_fqn("class", c, true),
            Type::Iface(c) => self.custom_fqn("iface", c, true),
            Type::Object(custom) => self
                .custom(*custom)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "<undefined>".to_string()),
        }
    }

    fn custom_fqn(&self, tag: &str, c: &CustomType, with_supers: bool) -> String {
        let mut out = String::from(tag);
        out.push('(');
        out.push_str(&c.name);
        if with_supers {
            for (i, &s) in c.supers.iter().enumerate() {
                out.push(if i == 0 { ':' } else { ',' });
                match self.custom(s) {
                    Some(sc) => out.push_str(&sc.name),
                    None => out.push_str("<unknown>"),
                }
            }
        }
        out.push_str("){");
        for (i, m) in c.members.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&m.name);
            out.push(':');
            out.push_str(&self.fqn(m.ty));
        }
        out.push('}');
        out
    }

    /// Canonical equality: id equality or FQN equality.
    pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
        a == b || self.fqn(a) == self.fqn(b)
    }

    // ---- assignability & specialization ----

    pub fn is_assignable_from(&self, to: TypeId, from: TypeId) -> bool {
        if to == from {
            return true;
        }
        match (self.get(to), self.get(from)) {
            (Type::Primitive(_), Type::Primitive(_)) => true,
            (Type::Object(to_custom), Type::Object(from_custom)) => {
                self.virtual_assignable(*to_custom, *from_custom)
            }
            _ => false,
        }
    }

    /// Whether a handle to `from` may be viewed as a handle to `to`:
    /// identity, or any super of `from` is assignable to `to`, transitively.
    pub fn virtual_assignable(&self, to: TypeId, from: TypeId) -> bool {
        if self.types_equal(to, from) {
            return true;
        }
        if !self.is_virtual(to) || !self.is_virtual(from) {
            return false;
        }
        let Some(from_custom) = self.custom(from) else {
            return false;
        };
        from_custom
            .supers
            .iter()
            .any(|&s| self.virtual_assignable(to, s))
    }

    /// The more specialized of two types; ties favour the left operand.
    pub fn most_specialized(&self, lhs: TypeId, rhs: TypeId) -> TypeId {
        let score = |id: TypeId| self.as_primitive(id).map(|p| p.score).unwrap_or(0);
        if score(rhs) > score(lhs) {
            rhs
        } else {
            lhs
        }
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::MemberKind;
    use smallvec::smallvec;

    fn field(name: &str, ty: TypeId) -> Member {
        Member::new(name, ty, MemberKind::Field, Vec::new())
    }

    #[test]
    fn primitive_fqns_are_tokens() {
        let arena = TypeArena::new();
        let i64t = arena.builtin("i64").unwrap();
        assert_eq!(arena.fqn(i64t), "i64");
        assert_eq!(arena.fqn(arena.void()), "void");
    }

    #[test]
    fn function_fqn_encoding() {
        let mut arena = TypeArena::new();
        let i32t = arena.builtin("i32").unwrap();
        let b = arena.builtin("bool").unwrap();
        let f = arena.function(b, vec![i32t, i32t]);
        assert_eq!(arena.fqn(f), "fn(i32,i32)->bool");
    }

    #[test]
    fn class_fqn_lists_supers_by_name() {
        let mut arena = TypeArena::new();
        let i64t = arena.builtin("i64").unwrap();
        let a = arena.alloc(Type::Class(CustomType::new(
            "A",
            vec![field("a", i64t)],
            smallvec![],
        )));
        let b = arena.alloc(Type::Class(CustomType::new(
            "B",
            vec![field("b", i64t)],
            smallvec![a],
        )));
        assert_eq!(arena.fqn(b), "class(B:A){b:i64}");
    }

    #[test]
    fn equality_is_fqn_equality() {
        let mut arena = TypeArena::new();
        let i64t = arena.builtin("i64").unwrap();
        let f1 = arena.function(i64t, vec![]);
        let f2 = arena.function(i64t, vec![]);
        assert_ne!(f1, f2);
        assert!(arena.types_equal(f1, f2));
    }

    #[test]
    fn primitives_are_mutually_assignable() {
        let arena = TypeArena::new();
        let i8t = arena.builtin("i8").unwrap();
        let f64t = arena.builtin("f64").unwrap();
        assert!(arena.is_assignable_from(i8t, f64t));
        assert!(arena.is_assignable_from(f64t, i8t));
    }

    #[test]
    fn object_assignability_follows_hierarchy() {
        let mut arena = TypeArena::new();
        let a = arena.alloc(Type::Class(CustomType::new("A", vec![], smallvec![])));
        let b = arena.alloc(Type::Class(CustomType::new("B", vec![], smallvec![a])));
        let c = arena.alloc(Type::Class(CustomType::new("C", vec![], smallvec![b])));
        let oa = arena.object(a);
        let oc = arena.object(c);
        assert!(arena.is_assignable_from(oa, oc));
        assert!(!arena.is_assignable_from(oc, oa));
    }

    #[test]
    fn most_specialized_prefers_higher_score_and_lhs_ties() {
        let arena = TypeArena::new();
        let i32t = arena.builtin("i32").unwrap();
        let i64t = arena.builtin("i64").unwrap();
        let u64t = arena.builtin("u64").unwrap();
        let f64t = arena.builtin("f64").unwrap();
        assert_eq!(arena.most_specialized(i32t, i64t), i64t);
        assert_eq!(arena.most_specialized(i64t, i32t), i64t);
        assert_eq!(arena.most_specialized(i64t, f64t), f64t);
        assert_eq!(arena.most_specialized(i64t, u64t), i64t);
    }

    #[test]
    fn replace_preserves_custom_caches() {
        let mut arena = TypeArena::new();
        let id = arena.alloc(Type::Class(CustomType::new("A", vec![], smallvec![])));
        arena.custom_mut(id).unwrap().init_function = Some(cata_llir::FuncId(7));
        let i64t = arena.builtin("i64").unwrap();
        arena.replace(
            id,
            Type::Class(CustomType::new("A", vec![field("a", i64t)], smallvec![])),
        );
        let custom = arena.custom(id).unwrap();
        assert_eq!(custom.members.len(), 1);
        assert_eq!(custom.init_function, Some(cata_llir::FuncId(7)));
    }

    #[test]
    fn undefined_is_invalid_and_propagates() {
        let mut arena = TypeArena::new();
        let undef = arena.undefined();
        let i64t = arena.builtin("i64").unwrap();
        assert!(!arena.is_valid(undef));
        let f = arena.function(undef, vec![i64t]);
        assert!(!arena.is_valid(f));
        let ok = arena.function(i64t, vec![]);
        assert!(arena.is_valid(ok));
    }
}
