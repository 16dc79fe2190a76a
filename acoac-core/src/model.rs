/*!
The policy model: the in-memory representation of an ACoAC instance and
its structural invariants.

An [`Instance`] is never mutated in place once built. Slicing and
abstraction each produce a new `Instance` that shares the symbol table
(attribute/value names) and nothing else mutable with its parent; each
carries `user_origin`/`rule_origin` maps back to the root instance so a
counter-example found on a sub-instance can be lifted to the indices the
caller's original file used.
*/

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::error::{AcoacError, InputError, InternalInvariantError};
use crate::symbols::{AttrId, RuleId, Symbols, UserId, ValueId, BOTTOM};

/// A single atom of a precondition: `attribute = value` (positive) or
/// `attribute != value` (negative).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PrecondAtom {
    pub attr: AttrId,
    pub value: ValueId,
    pub positive: bool,
}

impl PrecondAtom {
    pub fn holds(&self, actual: ValueId) -> bool {
        (actual == self.value) == self.positive
    }
}

/// `⟨admin-precondition, target-precondition, target-attribute, target-value, is-negative⟩`.
#[derive(Clone, Debug)]
pub struct Rule {
    pub admin_precond: Vec<PrecondAtom>,
    pub target_precond: Vec<PrecondAtom>,
    pub target_attr: AttrId,
    pub target_value: ValueId,
    pub is_negative: bool,
}

impl Rule {
    /// The (attribute, value) pair this rule assigns when it fires.
    /// Retraction rules always produce `⊥`, and `target_value` is ignored.
    pub fn effect(&self) -> (AttrId, ValueId) {
        if self.is_negative {
            (self.target_attr, BOTTOM)
        } else {
            (self.target_attr, self.target_value)
        }
    }
}

/// A conjunctive query atom: `user u has attribute a = v`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryAtom {
    pub user: UserId,
    pub attr: AttrId,
    pub value: ValueId,
}

pub type Query = Vec<QueryAtom>;

/// A total map `σ : U x A -> Dom(a)`, stored as a dense grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    attr_count: usize,
    values: Vec<ValueId>,
}

impl State {
    pub fn new(user_count: usize, attr_count: usize) -> Self {
        State { attr_count, values: vec![BOTTOM; user_count * attr_count] }
    }

    pub fn get(&self, user: UserId, attr: AttrId) -> ValueId {
        self.values[user * self.attr_count + attr]
    }

    pub fn set(&mut self, user: UserId, attr: AttrId, value: ValueId) {
        self.values[user * self.attr_count + attr] = value;
    }

    pub fn user_count(&self) -> usize {
        self.values.len() / self.attr_count.max(1)
    }
}

/// The concrete effect of one fired rule: `⟨adminIdx, userIdx, attribute, value⟩`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct AdministrativeAction {
    pub admin: UserId,
    pub target: UserId,
    pub attr: AttrId,
    pub value: ValueId,
}

/// The outcome of any pipeline stage. `Unknown` is only ever an
/// intermediate verdict; it never escapes the driver.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub enum AnalysisResult {
    Reachable { actions: Vec<AdministrativeAction>, rules: Vec<RuleId> },
    Unreachable,
    Timeout,
    Error(String),
    Unknown,
}

impl AnalysisResult {
    pub fn is_final(&self) -> bool {
        !matches!(self, AnalysisResult::Unknown)
    }
}

/// An ACoAC instance: users, the shared attribute/value symbol table, an
/// initial assignment, an administrator set, an ordered rule list, and a
/// query.
///
/// Sub-instances produced by slicing and abstraction share `symbols` (an
/// `Rc`, cheap to clone) but own their own `rules`/`users`/`init` -- they
/// never alias a parent's arrays.
#[derive(Clone, Debug)]
pub struct Instance {
    pub symbols: Rc<Symbols>,
    user_count: usize,
    admins: BTreeSet<UserId>,
    init: State,
    pub rules: Vec<Rule>,
    pub query: Query,
    /// `rule_origin[i]` is the index this instance's rule `i` had in the
    /// root instance the whole pipeline started from.
    pub rule_origin: Vec<RuleId>,
    /// `user_origin[i]` is the index this instance's user `i` had in the
    /// root instance.
    pub user_origin: Vec<UserId>,
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.user_count == other.user_count
            && self.admins == other.admins
            && self.init == other.init
            && self.query == other.query
            && self.rules.len() == other.rules.len()
            && self
                .rules
                .iter()
                .zip(other.rules.iter())
                .all(|(a, b)| rules_equal(a, b))
    }
}

fn rules_equal(a: &Rule, b: &Rule) -> bool {
    a.admin_precond == b.admin_precond
        && a.target_precond == b.target_precond
        && a.target_attr == b.target_attr
        && a.target_value == b.target_value
        && a.is_negative == b.is_negative
}

impl Instance {
    /// Build the root instance from parsed data. The origin maps are the
    /// identity, since there is no parent yet to lift indices back to.
    pub fn root(
        symbols: Symbols,
        user_count: usize,
        admins: BTreeSet<UserId>,
        init: State,
        rules: Vec<Rule>,
        query: Query,
    ) -> Self {
        let rule_origin = (0..rules.len()).collect();
        let user_origin = (0..user_count).collect();
        Instance {
            symbols: Rc::new(symbols),
            user_count,
            admins,
            init,
            rules,
            query,
            rule_origin,
            user_origin,
        }
    }

    pub fn user_count(&self) -> usize {
        self.user_count
    }

    pub fn users(&self) -> impl Iterator<Item = UserId> {
        0..self.user_count
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }

    pub fn admins(&self) -> &BTreeSet<UserId> {
        &self.admins
    }

    pub fn init(&self) -> &State {
        &self.init
    }

    /// Build a sub-instance with a restricted user set and/or rule set,
    /// preserving relative order and threading origin maps through.
    pub fn restrict(
        &self,
        surviving_users: &[UserId],
        surviving_rules: &[RuleId],
        new_query: Query,
    ) -> Instance {
        let mut new_init = State::new(surviving_users.len(), self.symbols.attr_count());
        let mut new_admins = BTreeSet::new();
        for (new_idx, &old_idx) in surviving_users.iter().enumerate() {
            if self.is_admin(old_idx) {
                new_admins.insert(new_idx);
            }
            for attr in self.symbols.attrs() {
                new_init.set(new_idx, attr, self.init.get(old_idx, attr));
            }
        }

        let new_rules: Vec<Rule> = surviving_rules.iter().map(|&i| self.rules[i].clone()).collect();
        let new_rule_origin: Vec<RuleId> =
            surviving_rules.iter().map(|&i| self.rule_origin[i]).collect();
        let new_user_origin: Vec<UserId> =
            surviving_users.iter().map(|&i| self.user_origin[i]).collect();

        Instance {
            symbols: Rc::clone(&self.symbols),
            user_count: surviving_users.len(),
            admins: new_admins,
            init: new_init,
            rules: new_rules,
            query: new_query,
            rule_origin: new_rule_origin,
            user_origin: new_user_origin,
        }
    }

    /// Whether `state` satisfies this instance's query.
    pub fn satisfies(&self, state: &State) -> bool {
        self.query.iter().all(|atom| state.get(atom.user, atom.attr) == atom.value)
    }

    pub fn satisfies_init(&self) -> bool {
        self.satisfies(&self.init)
    }

    /// Whether `rule` can fire for the ordered pair `(admin, target)` in `state`.
    pub fn rule_fires(&self, rule: &Rule, admin: UserId, target: UserId, state: &State) -> bool {
        if admin == target || !self.is_admin(admin) {
            return false;
        }
        let admin_ok = rule
            .admin_precond
            .iter()
            .all(|atom| atom.holds(state.get(admin, atom.attr)));
        let target_ok = rule
            .target_precond
            .iter()
            .all(|atom| atom.holds(state.get(target, atom.attr)));
        if !admin_ok || !target_ok {
            return false;
        }
        let new_value = if rule.is_negative { BOTTOM } else { rule.target_value };
        state.get(target, rule.target_attr) != new_value
    }

    /// Fire `rule` for `(admin, target)`, returning the resulting state and
    /// the administrative action this produced. Caller must have already
    /// checked [`Instance::rule_fires`].
    pub fn fire(&self, rule: &Rule, admin: UserId, target: UserId, state: &State) -> (State, AdministrativeAction) {
        let mut next = state.clone();
        let value = if rule.is_negative { BOTTOM } else { rule.target_value };
        next.set(target, rule.target_attr, value);
        (next, AdministrativeAction { admin, target, attr: rule.target_attr, value })
    }

    /// Replay a trail of `(rule index, admin, target)` triples starting
    /// from `init`, returning the resulting state if every step fires.
    pub fn replay(&self, trail: &[(RuleId, UserId, UserId)]) -> Option<State> {
        let mut state = self.init.clone();
        for &(rule_idx, admin, target) in trail {
            let rule = self.rules.get(rule_idx)?;
            if !self.rule_fires(rule, admin, target, &state) {
                return None;
            }
            let (next, _) = self.fire(rule, admin, target, &state);
            state = next;
        }
        Some(state)
    }

    /// Checks the structural invariants every parsed or transformed
    /// instance must satisfy. Violations are programming bugs (fatal),
    /// not user errors.
    pub fn check_invariants(&self) -> Result<(), AcoacError> {
        for user in self.users() {
            for attr in self.symbols.attrs() {
                let v = self.init.get(user, attr);
                if !self.symbols.value_in_domain(attr, v) {
                    return Err(InternalInvariantError::InitOutOfDomain { user, attr }.into());
                }
            }
        }
        for admin in &self.admins {
            if *admin >= self.user_count {
                return Err(InternalInvariantError::AdminNotAUser(*admin).into());
            }
        }
        for rule in &self.rules {
            if rule.target_attr >= self.symbols.attr_count() {
                return Err(InternalInvariantError::RuleBadAttribute.into());
            }
            if !self.symbols.value_in_domain(rule.target_attr, rule.target_value) {
                return Err(InternalInvariantError::RuleBadValue.into());
            }
            for atom in rule.admin_precond.iter().chain(rule.target_precond.iter()) {
                if !self.symbols.value_in_domain(atom.attr, atom.value) {
                    return Err(InternalInvariantError::RuleBadValue.into());
                }
            }
        }
        for atom in &self.query {
            if atom.user >= self.user_count {
                return Err(InputError::QueryUserOutOfRange(atom.user).into());
            }
            if !self.symbols.value_in_domain(atom.attr, atom.value) {
                return Err(InputError::QueryValueNotInDomain.into());
            }
        }
        Ok(())
    }
}
