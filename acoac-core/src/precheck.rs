/*!
Cheap, sound checks run before any model checker is invoked.

Four trivial verdicts are detected here, in order: the query already holds
in the initial state; there are no administrators at all, so no rule can
ever fire; every rule is inapplicable from the initial state (vacuously
true when there are no rules); or some queried `(attribute, value)` pair
can never be produced because no rule in the instance ever assigns it.
Anything else is reported [`AnalysisResult::Unknown`] and the pipeline
moves on to slicing.
*/

use std::collections::HashSet;

use crate::model::{AnalysisResult, Instance};

/// Run the pre-check. Never produces a false [`AnalysisResult::Reachable`]
/// or false [`AnalysisResult::Unreachable`] -- only [`AnalysisResult::Unknown`]
/// is allowed to be wrong in the sense of being refined later.
pub fn precheck(instance: &Instance) -> AnalysisResult {
    if instance.satisfies_init() {
        return AnalysisResult::Reachable { actions: Vec::new(), rules: Vec::new() };
    }

    if instance.admins().is_empty() {
        return AnalysisResult::Unreachable;
    }

    let no_rule_fires_from_init = instance.rules.iter().all(|rule| {
        instance
            .admins()
            .iter()
            .all(|&admin| instance.users().all(|target| !instance.rule_fires(rule, admin, target, instance.init())))
    });
    if no_rule_fires_from_init {
        return AnalysisResult::Unreachable;
    }

    let producible: HashSet<(usize, usize)> = instance
        .rules
        .iter()
        .map(|rule| rule.effect())
        .collect();

    for atom in &instance.query {
        if instance.init().get(atom.user, atom.attr) == atom.value {
            continue;
        }
        if !producible.contains(&(atom.attr, atom.value)) {
            return AnalysisResult::Unreachable;
        }
    }

    AnalysisResult::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QueryAtom, Rule, State};
    use crate::symbols::Symbols;
    use std::collections::BTreeSet;

    fn instance_with_rules(rules: Vec<Rule>, query_value_equals_init: bool) -> Instance {
        let mut symbols = Symbols::new();
        let r = symbols.intern_attr("r");
        let x = symbols.intern_value(r, "X");
        let mut init = State::new(1, symbols.attr_count());
        let query_value = if query_value_equals_init {
            init.set(0, r, x);
            x
        } else {
            x
        };
        Instance::root(
            symbols,
            1,
            BTreeSet::new(),
            init,
            rules,
            vec![QueryAtom { user: 0, attr: r, value: query_value }],
        )
    }

    #[test]
    fn reachable_when_query_already_holds() {
        let inst = instance_with_rules(vec![], true);
        assert_eq!(precheck(&inst), AnalysisResult::Reachable { actions: vec![], rules: vec![] });
    }

    #[test]
    fn unreachable_when_value_unproducible() {
        let inst = instance_with_rules(vec![], false);
        assert_eq!(precheck(&inst), AnalysisResult::Unreachable);
    }

    #[test]
    fn unknown_when_some_rule_could_produce_it() {
        let mut symbols = Symbols::new();
        let r = symbols.intern_attr("r");
        let x = symbols.intern_value(r, "X");
        let init = State::new(2, symbols.attr_count());
        let rule = Rule {
            admin_precond: vec![],
            target_precond: vec![],
            target_attr: r,
            target_value: x,
            is_negative: false,
        };
        let inst = Instance::root(
            symbols,
            2,
            {
                let mut s = BTreeSet::new();
                s.insert(0);
                s
            },
            init,
            vec![rule],
            vec![QueryAtom { user: 1, attr: r, value: x }],
        );
        assert_eq!(precheck(&inst), AnalysisResult::Unknown);
    }

    #[test]
    fn unreachable_when_there_are_no_administrators() {
        let mut symbols = Symbols::new();
        let r = symbols.intern_attr("r");
        let x = symbols.intern_value(r, "X");
        let init = State::new(2, symbols.attr_count());
        let rule = Rule {
            admin_precond: vec![],
            target_precond: vec![],
            target_attr: r,
            target_value: x,
            is_negative: false,
        };
        let inst = Instance::root(
            symbols,
            2,
            BTreeSet::new(),
            init,
            vec![rule],
            vec![QueryAtom { user: 1, attr: r, value: x }],
        );
        assert_eq!(precheck(&inst), AnalysisResult::Unreachable);
    }

    #[test]
    fn unreachable_when_every_rule_is_gated_on_the_sole_admin_as_its_own_target() {
        let mut symbols = Symbols::new();
        let r = symbols.intern_attr("r");
        let x = symbols.intern_value(r, "X");
        let init = State::new(1, symbols.attr_count());
        let rule = Rule {
            admin_precond: vec![],
            target_precond: vec![],
            target_attr: r,
            target_value: x,
            is_negative: false,
        };
        let mut admins = BTreeSet::new();
        admins.insert(0);
        let inst = Instance::root(symbols, 1, admins, init, vec![rule], vec![QueryAtom { user: 0, attr: r, value: x }]);
        assert_eq!(precheck(&inst), AnalysisResult::Unreachable);
    }
}
