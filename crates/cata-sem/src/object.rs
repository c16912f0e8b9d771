//! Inheritance machinery over custom types: member lookup through supers,
//! physical field indices in the LLIR struct layout, and virtual-member
//! (vtable slot) enumeration with override resolution.
//!
//! Layouts:
//! - struct:  `[own non-method fields]`
//! - class:   `[metadata ptr][super 0]...[super k][own non-method fields]`
//! - iface:   `[supers...]` or `[metadata ptr]` when it has none, then own
//!   fields

use crate::member::{canonical_name, MemberLocator};
use crate::types::{CustomKind, TypeArena, TypeId};

impl TypeArena {
    /// Find a member by name: own members first, then supers in declaration
    /// order (leftmost-base-wins for multiple inheritance).
    pub fn get_member(&self, custom_id: TypeId, name: &str) -> Option<MemberLocator> {
        let custom = self.custom(custom_id)?;
        for (i, member) in custom.members.iter().enumerate() {
            if member.name == name {
                return Some(MemberLocator::new(custom_id, i));
            }
        }
        for &super_id in &custom.supers {
            if let Some(found) = self.get_member(super_id, name) {
                return Some(found);
            }
        }
        None
    }

    /// Find a member by *canonical* name, ignoring overload suffixes.
    pub fn get_member_canonical(&self, custom_id: TypeId, name: &str) -> Option<MemberLocator> {
        let custom = self.custom(custom_id)?;
        for (i, member) in custom.members.iter().enumerate() {
            if canonical_name(&member.name) == name {
                return Some(MemberLocator::new(custom_id, i));
            }
        }
        for &super_id in &custom.supers {
            if let Some(found) = self.get_member_canonical(super_id, name) {
                return Some(found);
            }
        }
        None
    }

    /// The GEP index of a member inside its residence's LLIR struct.
    /// Methods do not occupy fields; function-typed *fields* do (as
    /// pointers).
    pub fn member_field_index(&self, locator: MemberLocator) -> Option<u32> {
        let custom = self.custom(locator.residence)?;
        let mut index = 0u32;
        for (i, member) in custom.members.iter().enumerate() {
            if i == locator.index {
                if member.is_method() {
                    return None;
                }
                return Some(self.field_base(locator.residence) + index);
            }
            if !member.is_method() {
                index += 1;
            }
        }
        None
    }

    /// The GEP index where own (non-inherited) fields start.
    pub fn field_base(&self, custom_id: TypeId) -> u32 {
        let Some(custom) = self.custom(custom_id) else {
            return 0;
        };
        match self.custom_kind(custom_id) {
            Some(CustomKind::Struct) => 0,
            Some(CustomKind::Class) => 1 + custom.supers.len() as u32,
            Some(CustomKind::Iface) => (custom.supers.len() as u32).max(1),
            None => 0,
        }
    }

    /// The GEP index of a direct super's subobject, or `None` when
    /// `super_id` is not a direct super.
    pub fn super_field_index(&self, custom_id: TypeId, super_id: TypeId) -> Option<u32> {
        let custom = self.custom(custom_id)?;
        let position = custom
            .supers
            .iter()
            .position(|&s| self.types_equal(s, super_id))?;
        let base = match self.custom_kind(custom_id) {
            Some(CustomKind::Class) => 1,
            _ => 0,
        };
        Some(base + position as u32)
    }

    /// Enumerate the vtable slot list of a virtual type: inherited slots
    /// first (supers in declaration order, recursively), own virtuals
    /// appended. An own virtual matching an inherited slot by name and
    /// function type replaces that slot in place (override resolution).
    pub fn virtual_members(&self, virtual_id: TypeId) -> Vec<MemberLocator> {
        let mut slots: Vec<MemberLocator> = Vec::new();
        let Some(custom) = self.custom(virtual_id) else {
            return slots;
        };
        for &super_id in &custom.supers {
            slots.extend(self.virtual_members(super_id));
        }
        for (i, member) in custom.members.iter().enumerate() {
            if !member.is_virtual() {
                continue;
            }
            let overridden = slots.iter().position(|slot| {
                let slot_member = &self.custom(slot.residence).unwrap().members[slot.index];
                slot_member.name == member.name && self.types_equal(slot_member.ty, member.ty)
            });
            match overridden {
                Some(pos) => slots[pos] = MemberLocator::new(virtual_id, i),
                None => slots.push(MemberLocator::new(virtual_id, i)),
            }
        }
        slots
    }

    /// The virtual members whose canonical name matches `name`.
    pub fn virtual_members_named(&self, virtual_id: TypeId, name: &str) -> Vec<MemberLocator> {
        self.virtual_members(virtual_id)
            .into_iter()
            .filter(|slot| {
                let member = &self.custom(slot.residence).unwrap().members[slot.index];
                canonical_name(&member.name) == name
            })
            .collect()
    }

    /// The slot number of `locator` in `virtual_id`'s vtable.
    pub fn virtual_member_index(&self, virtual_id: TypeId, locator: MemberLocator) -> Option<usize> {
        self.virtual_members(virtual_id)
            .iter()
            .position(|slot| *slot == locator)
    }

    /// Among `custom_id`'s virtual members named `name`, the one whose
    /// function type equals `fn_ty`. Used when building vtables for a
    /// presenting ancestor.
    pub fn compatible_virtual_member(
        &self,
        custom_id: TypeId,
        name: &str,
        fn_ty: TypeId,
    ) -> Option<MemberLocator> {
        self.virtual_members_named(custom_id, canonical_name(name))
            .into_iter()
            .find(|slot| {
                let member = &self.custom(slot.residence).unwrap().members[slot.index];
                self.types_equal(member.ty, fn_ty)
            })
    }

    /// `Residence.name` + `.` + member name: the symbol-table key of a
    /// member's backing function or field symbol.
    pub fn member_fqn(&self, locator: MemberLocator) -> String {
        let custom = self.custom(locator.residence).map(|c| c.name.clone());
        let member = self
            .custom(locator.residence)
            .map(|c| c.members[locator.index].name.clone());
        format!(
            "{}.{}",
            custom.unwrap_or_default(),
            member.unwrap_or_default()
        )
    }

    /// Direct access to the member behind a locator.
    pub fn locate(&self, locator: MemberLocator) -> &crate::member::Member {
        &self.custom(locator.residence).expect("residence is custom").members[locator.index]
    }
}
