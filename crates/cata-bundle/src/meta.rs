//! The `CATA_META` symbol-record format.
//!
//! Layout:
//! ```text
//! CATA_META\n
//! <version>\n
//! <global-namespace>\n
//! <FQN>\0<serialised type>\n      (one per exported symbol)
//! ...
//! CATA_END\n
//! ```
//!
//! Types serialise as a single-byte discriminator (`p` primitive, `u`
//! undefined, `v` void, `f` function, `n` namespace, `c` custom, `o`
//! object handle) followed by variant payloads. Custom types carry a kind
//! byte (`s`/`k`/`i` for struct/class/interface), their name, init-function
//! name, member list, and super references by name; object handles and
//! super references rehydrate through the symbol table after all records
//! are read.

use anyhow::{bail, Context, Result};
use cata_ast::Classifier;
use cata_llir::Linkage;
use cata_sem::{
    CustomKind, CustomType, FunctionType, Member, MemberKind, SemState, Symbol, Type, TypeId,
};
use smallvec::SmallVec;
use tracing::debug;

const HEADER: &[u8] = b"CATA_META\n";
const TRAILER: &[u8] = b"CATA_END\n";

// ---- writing ----

pub fn write_meta(state: &SemState, out: &mut Vec<u8>) -> Result<()> {
    out.extend_from_slice(HEADER);
    out.extend_from_slice(env!("CARGO_PKG_VERSION").as_bytes());
    out.push(b'\n');
    out.extend_from_slice(state.global_namespace.as_bytes());
    out.push(b'\n');

    for (fqn, symbol) in &state.symbols {
        if symbol.imported {
            continue;
        }
        out.extend_from_slice(fqn.as_bytes());
        out.push(0);
        write_type(state, symbol.ty, out)?;
        out.push(b'\n');
    }

    out.extend_from_slice(TRAILER);
    Ok(())
}

fn write_str(out: &mut Vec<u8>, text: &str) {
    out.extend_from_slice(text.as_bytes());
    out.push(0);
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_type(state: &SemState, ty: TypeId, out: &mut Vec<u8>) -> Result<()> {
    match state.types.get(ty) {
        Type::Undefined => out.push(b'u'),
        Type::Void => out.push(b'v'),
        Type::Primitive(p) => {
            out.push(b'p');
            write_str(out, p.token);
        }
        Type::Namespace(name) => {
            out.push(b'n');
            write_str(out, name);
        }
        Type::Function(f) => {
            out.push(b'f');
            write_type(state, f.return_type, out)?;
            write_u32(out, f.parameters.len() as u32);
            for &param in &f.parameters {
                write_type(state, param, out)?;
            }
            match f.method_of {
                Some(owner) => {
                    out.push(1);
                    let name = state
                        .types
                        .custom(owner)
                        .map(|c| c.name.clone())
                        .unwrap_or_default();
                    write_str(out, &name);
                }
                None => out.push(0),
            }
        }
        Type::Struct(c) | Type::Class(c) | Type::Iface(c) => {
            out.push(b'c');
            out.push(match state.types.custom_kind(ty) {
                Some(CustomKind::Struct) => b's',
                Some(CustomKind::Class) => b'k',
                _ => b'i',
            });
            write_str(out, &c.name);
            let init_name = c
                .init_function
                .map(|f| state.builder.module.function(f).name.clone())
                .unwrap_or_default();
            write_str(out, &init_name);
            write_u32(out, c.members.len() as u32);
            for member in &c.members {
                write_str(out, &member.name);
                write_type(state, member.ty, out)?;
                write_u32(out, member.classifiers.len() as u32);
                for classifier in &member.classifiers {
                    write_str(out, classifier.as_str());
                }
            }
            write_u32(out, c.supers.len() as u32);
            for &super_id in &c.supers {
                let name = state
                    .types
                    .custom(super_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                write_str(out, &name);
            }
        }
        Type::Object(custom) => {
            out.push(b'o');
            let name = state
                .types
                .custom(*custom)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            write_str(out, &name);
        }
    }
    Ok(())
}

// ---- reading ----

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn byte(&mut self) -> Result<u8> {
        let Some(&b) = self.data.get(self.pos) else {
            bail!("unexpected end of metadata");
        };
        self.pos += 1;
        Ok(b)
    }

    fn cstr(&mut self) -> Result<String> {
        let start = self.pos;
        while self.byte()? != 0 {}
        Ok(String::from_utf8_lossy(&self.data[start..self.pos - 1]).into_owned())
    }

    fn line(&mut self) -> Result<String> {
        let start = self.pos;
        while self.byte()? != b'\n' {}
        Ok(String::from_utf8_lossy(&self.data[start..self.pos - 1]).into_owned())
    }

    fn u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        for slot in &mut raw {
            *slot = self.byte()?;
        }
        Ok(u32::from_le_bytes(raw))
    }

    fn starts_with(&self, text: &[u8]) -> bool {
        self.data[self.pos..].starts_with(text)
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
    }
}

/// A by-name reference to patch once every record is present.
enum Pending {
    /// `Object(...)` whose referenced custom type is named.
    ObjectRef { object: TypeId, name: String },
    /// A custom type's super at the given position.
    SuperRef { custom: TypeId, index: usize, name: String },
    /// A function's `method_of` owner.
    MethodOf { function: TypeId, name: String },
}

/// Import symbol records, flagging every created symbol as imported.
pub fn read_meta(state: &mut SemState, data: &[u8]) -> Result<()> {
    let mut cursor = Cursor { data, pos: 0 };
    if !cursor.starts_with(HEADER) {
        bail!("not a CATA_META stream");
    }
    cursor.skip(HEADER.len());
    let _version = cursor.line().context("missing version line")?;
    let global_ns = cursor.line().context("missing namespace line")?;
    if state.global_namespace.is_empty() {
        state.global_namespace = global_ns;
    }

    let mut pending: Vec<Pending> = Vec::new();
    let mut imported = 0usize;
    loop {
        if cursor.starts_with(TRAILER) {
            break;
        }
        let fqn = cursor.cstr().context("missing symbol FQN")?;
        let ty = read_type(state, &mut cursor, &mut pending)?;
        if cursor.byte()? != b'\n' {
            bail!("malformed record for `{fqn}`");
        }
        let mut symbol = Symbol::new(cata_common::Span::dummy(), ty);
        symbol.imported = true;
        state.symbols.insert(fqn, symbol);
        imported += 1;
    }

    // rehydrate by-name references now that all symbols exist
    for entry in pending {
        match entry {
            Pending::ObjectRef { object, name } => {
                if let Some(target) = state.symbol_type(&name) {
                    state.types.replace(object, Type::Object(target));
                }
            }
            Pending::SuperRef { custom, index, name } => {
                if let Some(target) = state.symbol_type(&name) {
                    if let Some(c) = state.types.custom_mut(custom) {
                        if index < c.supers.len() {
                            c.supers[index] = target;
                        }
                    }
                }
            }
            Pending::MethodOf { function, name } => {
                let target = state.symbol_type(&name);
                if let (Some(target), Type::Function(f)) =
                    (target, state.types.get_mut(function))
                {
                    f.method_of = Some(target);
                }
            }
        }
    }

    debug!(symbols = imported, "imported bundle metadata");
    Ok(())
}

fn read_type(state: &mut SemState, cursor: &mut Cursor, pending: &mut Vec<Pending>) -> Result<TypeId> {
    match cursor.byte()? {
        b'u' => Ok(state.types.undefined()),
        b'v' => Ok(state.types.void()),
        b'p' => {
            let token = cursor.cstr()?;
            state
                .types
                .builtin(&token)
                .with_context(|| format!("unknown primitive `{token}`"))
        }
        b'n' => {
            let name = cursor.cstr()?;
            Ok(state.types.alloc(Type::Namespace(name)))
        }
        b'f' => {
            let return_type = read_type(state, cursor, pending)?;
            let count = cursor.u32()? as usize;
            let mut parameters = Vec::with_capacity(count);
            for _ in 0..count {
                parameters.push(read_type(state, cursor, pending)?);
            }
            let has_owner = cursor.byte()? != 0;
            let owner_name = if has_owner { Some(cursor.cstr()?) } else { None };
            let id = state.types.alloc(Type::Function(FunctionType {
                return_type,
                parameters,
                method_of: None,
            }));
            if let Some(name) = owner_name {
                pending.push(Pending::MethodOf { function: id, name });
            }
            Ok(id)
        }
        b'c' => {
            let kind = cursor.byte()?;
            let name = cursor.cstr()?;
            let init_name = cursor.cstr()?;
            let member_count = cursor.u32()? as usize;
            let mut members = Vec::with_capacity(member_count);
            for _ in 0..member_count {
                let member_name = cursor.cstr()?;
                let member_ty = read_type(state, cursor, pending)?;
                let classifier_count = cursor.u32()? as usize;
                let mut classifiers = Vec::with_capacity(classifier_count);
                for _ in 0..classifier_count {
                    let text = cursor.cstr()?;
                    if let Some(c) = Classifier::parse(&text) {
                        classifiers.push(c);
                    }
                }
                let member_kind = if state.types.as_function(member_ty).is_some() {
                    MemberKind::Method
                } else {
                    MemberKind::Field
                };
                members.push(Member::new(member_name, member_ty, member_kind, classifiers));
            }
            let super_count = cursor.u32()? as usize;
            let mut supers: SmallVec<[TypeId; 2]> = SmallVec::new();
            let undefined = state.types.undefined();
            let mut super_names = Vec::with_capacity(super_count);
            for _ in 0..super_count {
                super_names.push(cursor.cstr()?);
                supers.push(undefined);
            }

            let mut custom = CustomType::new(name, members, supers);
            if !init_name.is_empty() {
                let func = match state.builder.module.get_named_function(&init_name) {
                    Some(existing) => existing,
                    None => {
                        let void = state.builder.module.types.void();
                        let ptr = state.builder.module.types.ptr();
                        let init_ty = state.builder.module.types.function(void, vec![ptr]);
                        state
                            .builder
                            .module
                            .add_function(&init_name, init_ty, Linkage::External)
                    }
                };
                custom.init_function = Some(func);
            }
            let id = state.types.alloc(match kind {
                b's' => Type::Struct(custom),
                b'k' => Type::Class(custom),
                b'i' => Type::Iface(custom),
                other => bail!("unknown custom kind `{}`", other as char),
            });
            for (index, name) in super_names.into_iter().enumerate() {
                pending.push(Pending::SuperRef { custom: id, index, name });
            }
            Ok(id)
        }
        b'o' => {
            let name = cursor.cstr()?;
            let undefined = state.types.undefined();
            let id = state.types.alloc(Type::Object(undefined));
            pending.push(Pending::ObjectRef { object: id, name });
            Ok(id)
        }
        other => bail!("unknown type discriminator `{}`", other as char),
    }
}
