/*!
Symbol interning for attribute and value names.

Downstream code (the policy model, the slicer, abstraction-refinement,
the bound calculator) never compares strings: rules, states, and queries
are built entirely out of [`AttrId`]/[`ValueId`]/[`UserId`]/[`RuleId`],
each a plain index into a table owned by [`Symbols`]. Display and
serialization are the only code paths that walk back through the table.
*/

use std::collections::HashMap;

pub type AttrId = usize;
pub type ValueId = usize;
pub type UserId = usize;
pub type RuleId = usize;

/// The distinguished "unassigned" value every attribute's domain carries.
pub const BOTTOM: ValueId = 0;
const BOTTOM_SYMBOL: &str = "\u{22a5}"; // "⊥"

/// Interned attribute names and, per attribute, interned domain value names.
///
/// Every attribute's domain has `BOTTOM` ("⊥") at index 0, established
/// here once rather than re-checked at every call site.
#[derive(Debug, Default)]
pub struct Symbols {
    attr_names: Vec<String>,
    attr_by_name: HashMap<String, AttrId>,
    domains: Vec<Vec<String>>,
    domain_by_name: Vec<HashMap<String, ValueId>>,
}

impl Symbols {
    pub fn new() -> Self {
        Symbols::default()
    }

    pub fn intern_attr(&mut self, name: &str) -> AttrId {
        if let Some(&id) = self.attr_by_name.get(name) {
            return id;
        }
        let id = self.attr_names.len();
        self.attr_names.push(name.to_string());
        self.attr_by_name.insert(name.to_string(), id);
        self.domains.push(vec![BOTTOM_SYMBOL.to_string()]);
        let mut by_name = HashMap::new();
        by_name.insert(BOTTOM_SYMBOL.to_string(), BOTTOM);
        self.domain_by_name.push(by_name);
        id
    }

    pub fn find_attr(&self, name: &str) -> Option<AttrId> {
        self.attr_by_name.get(name).copied()
    }

    pub fn intern_value(&mut self, attr: AttrId, name: &str) -> ValueId {
        if name == BOTTOM_SYMBOL {
            return BOTTOM;
        }
        if let Some(&id) = self.domain_by_name[attr].get(name) {
            return id;
        }
        let id = self.domains[attr].len();
        self.domains[attr].push(name.to_string());
        self.domain_by_name[attr].insert(name.to_string(), id);
        id
    }

    pub fn find_value(&self, attr: AttrId, name: &str) -> Option<ValueId> {
        if name == BOTTOM_SYMBOL {
            return Some(BOTTOM);
        }
        self.domain_by_name.get(attr).and_then(|m| m.get(name).copied())
    }

    pub fn attr_name(&self, attr: AttrId) -> &str {
        &self.attr_names[attr]
    }

    pub fn value_name(&self, attr: AttrId, value: ValueId) -> &str {
        &self.domains[attr][value]
    }

    pub fn attr_count(&self) -> usize {
        self.attr_names.len()
    }

    pub fn attrs(&self) -> impl Iterator<Item = AttrId> {
        0..self.attr_names.len()
    }

    pub fn domain_size(&self, attr: AttrId) -> usize {
        self.domains[attr].len()
    }

    pub fn domain(&self, attr: AttrId) -> &[String] {
        &self.domains[attr]
    }

    pub fn value_in_domain(&self, attr: AttrId, value: ValueId) -> bool {
        value < self.domains.get(attr).map_or(0, |d| d.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_is_always_present() {
        let mut s = Symbols::new();
        let a = s.intern_attr("role");
        assert_eq!(s.domain_size(a), 1);
        assert_eq!(s.value_name(a, BOTTOM), "\u{22a5}");
    }

    #[test]
    fn interning_is_idempotent() {
        let mut s = Symbols::new();
        let a1 = s.intern_attr("role");
        let a2 = s.intern_attr("role");
        assert_eq!(a1, a2);
        let v1 = s.intern_value(a1, "admin");
        let v2 = s.intern_value(a1, "admin");
        assert_eq!(v1, v2);
        assert_ne!(v1, BOTTOM);
    }
}
