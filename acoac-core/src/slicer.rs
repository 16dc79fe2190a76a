/*!
Size-reduction passes that run between the pre-check and abstraction-
refinement: dropping users the query can never depend on, and dropping
rules that can never fire.

Both passes are sound over-approximations: they only ever remove a user
or a rule once it is certain doing so cannot turn a reachable instance
into an unreachable one. [`slice`] can therefore also return a verdict
directly, when the fixpoint it computes proves the query is
unreachable on its own.
*/

use std::collections::{BTreeSet, HashSet};

use crate::model::{AnalysisResult, Instance};
use crate::symbols::{AttrId, RuleId, UserId, ValueId, BOTTOM};

/// Drop every user that is neither an administrator nor named by the
/// query. Such a user can never fire a rule (only administrators do)
/// and, since nothing asks about its attributes, it can never affect
/// whether the query holds.
pub fn user_clean(instance: &Instance) -> Instance {
    let mut keep: Vec<UserId> = instance
        .users()
        .filter(|&u| instance.is_admin(u) || instance.query.iter().any(|a| a.user == u))
        .collect();
    keep.sort_unstable();

    if keep.len() == instance.user_count() {
        return instance.clone();
    }

    let remap: std::collections::HashMap<UserId, UserId> =
        keep.iter().enumerate().map(|(new, &old)| (old, new)).collect();
    let new_query = instance
        .query
        .iter()
        .map(|a| crate::model::QueryAtom { user: remap[&a.user], attr: a.attr, value: a.value })
        .collect();

    let all_rules: Vec<RuleId> = (0..instance.rules.len()).collect();
    instance.restrict(&keep, &all_rules, new_query)
}

/// Compute, per attribute, the set of values some reachable global state
/// could assign to *some* user, starting from the values already present
/// in `init` and closing under every rule whose positive preconditions
/// are already known reachable.
fn reachable_values(instance: &Instance) -> Vec<HashSet<ValueId>> {
    let attr_count = instance.symbols.attr_count();
    let mut reachable: Vec<HashSet<ValueId>> = (0..attr_count)
        .map(|a| {
            let mut set = HashSet::new();
            set.insert(BOTTOM);
            for u in instance.users() {
                set.insert(instance.init().get(u, a));
            }
            set
        })
        .collect();

    loop {
        let mut changed = false;
        for rule in &instance.rules {
            let admin_ok = rule
                .admin_precond
                .iter()
                .all(|atom| !atom.positive || reachable[atom.attr].contains(&atom.value));
            let target_ok = rule
                .target_precond
                .iter()
                .all(|atom| !atom.positive || reachable[atom.attr].contains(&atom.value));
            if admin_ok && target_ok {
                let (attr, value) = rule.effect();
                if reachable[attr].insert(value) {
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    reachable
}

/// Compute, per attribute, the set of values that matter to proving the
/// query: a value is useful if the query asks for it, or if it appears
/// in the precondition of a rule whose own effect is already known
/// useful. This is the mirror image of [`reachable_values`], chasing
/// dependencies backward from the query instead of forward from `init`.
fn useful_values(instance: &Instance) -> Vec<HashSet<ValueId>> {
    let attr_count = instance.symbols.attr_count();
    let mut useful: Vec<HashSet<ValueId>> = vec![HashSet::new(); attr_count];
    for atom in &instance.query {
        useful[atom.attr].insert(atom.value);
    }

    loop {
        let mut changed = false;
        for rule in &instance.rules {
            let (attr, value) = rule.effect();
            if !useful[attr].contains(&value) {
                continue;
            }
            for atom in rule.admin_precond.iter().chain(rule.target_precond.iter()) {
                if atom.positive && useful[atom.attr].insert(atom.value) {
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    useful
}

/// A rule survives slicing only if every positive precondition atom it
/// carries references a value the fixpoint found reachable (an
/// unreachable precondition value means the rule can never fire in any
/// run, regardless of user assignment) and its effect is a value the
/// backward closure found useful (an effect nothing downstream of the
/// query ever asks about or depends on cannot matter to the verdict).
fn rule_is_live(rule: &crate::model::Rule, reachable: &[HashSet<ValueId>], useful: &[HashSet<ValueId>]) -> bool {
    let preconditions_reachable = rule
        .admin_precond
        .iter()
        .chain(rule.target_precond.iter())
        .all(|atom| !atom.positive || reachable[atom.attr].contains(&atom.value));
    let (attr, value) = rule.effect();
    preconditions_reachable && useful[attr].contains(&value)
}

/// Drop rules that can never fire, or whose effect can never matter to
/// the query. If the forward fixpoint used to find them proves some
/// queried `(attribute, value)` pair is unreachable from any run of the
/// surviving rules, return that verdict directly instead of a sliced
/// instance.
pub fn slice(instance: &Instance) -> (Instance, Option<AnalysisResult>) {
    let reachable = reachable_values(instance);

    for atom in &instance.query {
        let already_holds = instance.init().get(atom.user, atom.attr) == atom.value;
        if !already_holds && !reachable[atom.attr].contains(&atom.value) {
            return (instance.clone(), Some(AnalysisResult::Unreachable));
        }
    }

    let useful = useful_values(instance);
    let live_rules: Vec<RuleId> = instance
        .rules
        .iter()
        .enumerate()
        .filter(|(_, r)| rule_is_live(r, &reachable, &useful))
        .map(|(i, _)| i)
        .collect();

    if live_rules.len() == instance.rules.len() {
        return (instance.clone(), None);
    }

    let all_users: Vec<UserId> = instance.users().collect();
    let sliced = instance.restrict(&all_users, &live_rules, instance.query.clone());
    (sliced, None)
}

/// Attributes that still have more than one reachable value (besides
/// `⊥`) after slicing.
pub fn live_attributes(instance: &Instance) -> BTreeSet<AttrId> {
    let reachable = reachable_values(instance);
    reachable
        .iter()
        .enumerate()
        .filter(|(_, vs)| vs.len() > 1)
        .map(|(a, _)| a)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PrecondAtom, QueryAtom, Rule, State};
    use crate::symbols::Symbols;
    use std::collections::BTreeSet;

    #[test]
    fn user_clean_drops_irrelevant_bystanders() {
        let mut symbols = Symbols::new();
        let r = symbols.intern_attr("r");
        let x = symbols.intern_value(r, "X");
        let init = State::new(3, symbols.attr_count());
        let mut admins = BTreeSet::new();
        admins.insert(0);
        let inst = Instance::root(symbols, 3, admins, init, vec![], vec![QueryAtom { user: 1, attr: r, value: x }]);
        let cleaned = user_clean(&inst);
        assert_eq!(cleaned.user_count(), 2);
    }

    #[test]
    fn slice_proves_unreachable_when_no_rule_can_produce_value() {
        let mut symbols = Symbols::new();
        let r = symbols.intern_attr("r");
        let x = symbols.intern_value(r, "X");
        let init = State::new(1, symbols.attr_count());
        let inst = Instance::root(symbols, 1, BTreeSet::new(), init, vec![], vec![QueryAtom { user: 0, attr: r, value: x }]);
        let (_sliced, verdict) = slice(&inst);
        assert_eq!(verdict, Some(AnalysisResult::Unreachable));
    }

    #[test]
    fn slice_drops_rules_gated_on_unreachable_preconditions() {
        let mut symbols = Symbols::new();
        let r = symbols.intern_attr("r");
        let x = symbols.intern_value(r, "X");
        let y = symbols.intern_value(r, "Y");
        let init = State::new(1, symbols.attr_count());
        let dead_rule = Rule {
            admin_precond: vec![PrecondAtom { attr: r, value: y, positive: true }],
            target_precond: vec![],
            target_attr: r,
            target_value: x,
            is_negative: false,
        };
        let mut admins = BTreeSet::new();
        admins.insert(0);
        let inst = Instance::root(symbols, 1, admins, init, vec![dead_rule], vec![]);
        let (sliced, verdict) = slice(&inst);
        assert!(verdict.is_none());
        assert_eq!(sliced.rules.len(), 0);
    }

    #[test]
    fn slice_drops_rules_with_effects_the_query_never_depends_on() {
        let mut symbols = Symbols::new();
        let r = symbols.intern_attr("r");
        let x = symbols.intern_value(r, "X");
        let noise = symbols.intern_attr("noise");
        let n = symbols.intern_value(noise, "N");
        let init = State::new(1, symbols.attr_count());
        let relevant_rule = Rule {
            admin_precond: vec![],
            target_precond: vec![],
            target_attr: r,
            target_value: x,
            is_negative: false,
        };
        let irrelevant_rule = Rule {
            admin_precond: vec![],
            target_precond: vec![],
            target_attr: noise,
            target_value: n,
            is_negative: false,
        };
        let mut admins = BTreeSet::new();
        admins.insert(0);
        let inst = Instance::root(
            symbols,
            1,
            admins,
            init,
            vec![relevant_rule, irrelevant_rule],
            vec![QueryAtom { user: 0, attr: r, value: x }],
        );
        let (sliced, verdict) = slice(&inst);
        assert!(verdict.is_none());
        assert_eq!(sliced.rules.len(), 1);
    }
}
