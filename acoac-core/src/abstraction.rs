/*!
Abstraction-refinement (CEGAR-style) over the rule set.

[`AbsRef`] under-approximates an instance by keeping only rules it has
proven relevant within the current round budget, along two
complementary strategies that both grow monotonically as rounds
advance:

- forward: a rule is included once every value its preconditions need
  is already reachable from `init` by rules included in an earlier
  round;
- backward: a rule is included once the `(attribute, value)` pair it
  produces is already known useful -- initially "useful" means "the
  query asks for it", and a rule's own preconditions become useful once
  the rule itself is included.

Each call to [`AbsRef::refine`] runs one more round of both closures and
hands back a sub-instance restricted to the intersection of both rule
sets -- a rule only earns its way into the abstraction once it is both
reachable from `init` and useful to the query. Because both sets only
grow, their intersection only grows too, and the full rule list is a
fixed finite bound, so this always reaches the point where a round adds
nothing new -- at which point refinement is exhausted and the original
(unabstracted) instance is the only remaining under-approximation to
try.
*/

use std::collections::HashSet;

use crate::model::Instance;
use crate::symbols::{RuleId, ValueId, BOTTOM};

#[derive(Debug)]
pub struct AbsRef {
    round: u32,
    original: Instance,
    forward_rules: HashSet<RuleId>,
    reachable: Vec<HashSet<ValueId>>,
    backward_rules: HashSet<RuleId>,
    useful: Vec<HashSet<ValueId>>,
    converged_returned: bool,
}

impl AbsRef {
    pub fn new(original: Instance) -> Self {
        let attr_count = original.symbols.attr_count();
        let mut reachable: Vec<HashSet<ValueId>> = (0..attr_count)
            .map(|a| {
                let mut set = HashSet::new();
                set.insert(BOTTOM);
                for u in original.users() {
                    set.insert(original.init().get(u, a));
                }
                set
            })
            .collect();
        reachable.resize_with(attr_count, || {
            let mut s = HashSet::new();
            s.insert(BOTTOM);
            s
        });

        let mut useful: Vec<HashSet<ValueId>> = vec![HashSet::new(); attr_count];
        for atom in &original.query {
            useful[atom.attr].insert(atom.value);
        }

        AbsRef {
            round: 0,
            original,
            forward_rules: HashSet::new(),
            reachable,
            backward_rules: HashSet::new(),
            useful,
            converged_returned: false,
        }
    }

    fn precond_satisfied(atoms: &[crate::model::PrecondAtom], reached: &[HashSet<ValueId>]) -> bool {
        atoms.iter().all(|a| !a.positive || reached[a.attr].contains(&a.value))
    }

    /// Run one more layer of both closures, evaluated against a snapshot
    /// of the reachable/useful sets taken before this round so that a
    /// round only ever picks up rules one hop away from what the
    /// previous round already found -- independent of the order rules
    /// happen to be listed in.
    fn advance(&mut self) -> bool {
        let mut changed = false;
        let reached_before = self.reachable.clone();
        let useful_before = self.useful.clone();

        for (idx, rule) in self.original.rules.iter().enumerate() {
            if self.forward_rules.contains(&idx) {
                continue;
            }
            if Self::precond_satisfied(&rule.admin_precond, &reached_before)
                && Self::precond_satisfied(&rule.target_precond, &reached_before)
            {
                self.forward_rules.insert(idx);
                let (attr, value) = rule.effect();
                self.reachable[attr].insert(value);
                changed = true;
            }
        }

        for (idx, rule) in self.original.rules.iter().enumerate() {
            if self.backward_rules.contains(&idx) {
                continue;
            }
            let (attr, value) = rule.effect();
            if useful_before[attr].contains(&value) {
                self.backward_rules.insert(idx);
                for atom in rule.admin_precond.iter().chain(rule.target_precond.iter()) {
                    if atom.positive {
                        self.useful[atom.attr].insert(atom.value);
                    }
                }
                changed = true;
            }
        }

        self.round += 1;
        changed
    }

    fn build_abstraction(&self) -> Instance {
        let mut live: Vec<RuleId> = self
            .forward_rules
            .intersection(&self.backward_rules)
            .copied()
            .collect();
        live.sort_unstable();
        let all_users: Vec<usize> = self.original.users().collect();
        self.original.restrict(&all_users, &live, self.original.query.clone())
    }

    /// The round-0 abstraction: one layer of forward closure seeded from
    /// `init`, one layer of backward closure seeded from the query.
    pub fn abstract_instance(&mut self) -> Instance {
        self.advance();
        self.build_abstraction()
    }

    /// Advance the closures by one round and return the next, larger,
    /// under-approximation. Once a round adds nothing new, the full
    /// instance is returned exactly once more (there is nothing left to
    /// abstract away), and every call after that returns `None`.
    pub fn refine(&mut self) -> Option<Instance> {
        if self.converged_returned {
            return None;
        }
        let grew = self.advance();
        if grew {
            Some(self.build_abstraction())
        } else {
            self.converged_returned = true;
            Some(self.original.clone())
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn live_rule_count(&self) -> usize {
        self.forward_rules.intersection(&self.backward_rules).count()
    }
}
