/*!
The native `.aabac` instance format: one declaration per line.

```text
attr role : employee, manager, admin ;
users 4 ;
admins 0 ;
init 1.role = employee ;
rule admin: role=admin target: role=employee -> role = manager ;
rule admin: role=admin target: role=manager -> !role ;
query 1.role = manager ;
```

Every attribute implicitly carries the bottom value `⊥` at domain index
0 (see [`crate::symbols`]); it never appears in the `attr` line. A rule
clause with no atoms (`admin:` or `target:` followed immediately by
another keyword or `->`) has an always-true precondition. `-> !attr`
is a retraction rule: it always assigns `⊥`, so the explicit value is
omitted.
*/

use std::collections::BTreeSet;

use crate::error::{AcoacError, InputError};
use crate::model::{Instance, PrecondAtom, QueryAtom, Rule, State};
use crate::symbols::Symbols;

struct Parser<'a> {
    symbols: Symbols,
    user_count: usize,
    admins: BTreeSet<usize>,
    init_edits: Vec<(usize, &'a str, &'a str)>,
    rules: Vec<RawRule<'a>>,
    query: Vec<(usize, &'a str, &'a str)>,
}

struct RawRule<'a> {
    admin_precond: Vec<(&'a str, &'a str, bool)>,
    target_precond: Vec<(&'a str, &'a str, bool)>,
    target_attr: &'a str,
    target_value: Option<&'a str>,
    is_negative: bool,
}

pub fn parse_aabac(source: &str) -> Result<Instance, AcoacError> {
    let mut parser = Parser {
        symbols: Symbols::new(),
        user_count: 0,
        admins: BTreeSet::new(),
        init_edits: Vec::new(),
        rules: Vec::new(),
        query: Vec::new(),
    };

    for (line_no, raw_line) in source.lines().enumerate() {
        let line = strip_comment(raw_line).trim().trim_end_matches(';').trim();
        if line.is_empty() {
            continue;
        }
        parser.parse_line(line, line_no + 1)?;
    }

    parser.finish()
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn syntax_err(line: usize, message: impl Into<String>) -> AcoacError {
    InputError::Syntax { line, message: message.into() }.into()
}

impl<'a> Parser<'a> {
    fn parse_line(&mut self, line: &'a str, line_no: usize) -> Result<(), AcoacError> {
        let (keyword, rest) = split_first_word(line);
        match keyword {
            "attr" => self.parse_attr(rest, line_no),
            "users" => {
                self.user_count = rest
                    .trim()
                    .parse()
                    .map_err(|_| syntax_err(line_no, "expected an integer after 'users'"))?;
                Ok(())
            }
            "admins" => {
                for tok in rest.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                    let idx: usize = tok
                        .parse()
                        .map_err(|_| syntax_err(line_no, format!("bad admin index {tok:?}")))?;
                    self.admins.insert(idx);
                }
                Ok(())
            }
            "init" => self.parse_init(rest, line_no),
            "rule" => self.parse_rule(rest, line_no),
            "query" => self.parse_query(rest, line_no),
            other => Err(syntax_err(line_no, format!("unrecognized keyword {other:?}"))),
        }
    }

    fn parse_attr(&mut self, rest: &'a str, line_no: usize) -> Result<(), AcoacError> {
        let (name, domain) = rest
            .split_once(':')
            .ok_or_else(|| syntax_err(line_no, "expected 'attr <name> : v1, v2, ...'"))?;
        let name = name.trim();
        if self.symbols.find_attr(name).is_some() {
            return Err(InputError::DuplicateAttribute(name.to_string()).into());
        }
        let attr = self.symbols.intern_attr(name);
        for value in domain.split(',').map(str::trim).filter(|v| !v.is_empty()) {
            self.symbols.intern_value(attr, value);
        }
        Ok(())
    }

    fn parse_init(&mut self, rest: &'a str, line_no: usize) -> Result<(), AcoacError> {
        let (lhs, value) = rest
            .split_once('=')
            .ok_or_else(|| syntax_err(line_no, "expected 'init u.attr = value'"))?;
        let (user, attr) = lhs
            .trim()
            .split_once('.')
            .ok_or_else(|| syntax_err(line_no, "expected 'u.attr' on the left of '='"))?;
        let user: usize = user
            .trim()
            .parse()
            .map_err(|_| syntax_err(line_no, format!("bad user index {user:?}")))?;
        self.init_edits.push((user, attr.trim(), value.trim()));
        Ok(())
    }

    fn parse_query(&mut self, rest: &'a str, line_no: usize) -> Result<(), AcoacError> {
        let (lhs, value) = rest
            .split_once('=')
            .ok_or_else(|| syntax_err(line_no, "expected 'query u.attr = value'"))?;
        let (user, attr) = lhs
            .trim()
            .split_once('.')
            .ok_or_else(|| syntax_err(line_no, "expected 'u.attr' on the left of '='"))?;
        let user: usize = user
            .trim()
            .parse()
            .map_err(|_| syntax_err(line_no, format!("bad user index {user:?}")))?;
        self.query.push((user, attr.trim(), value.trim()));
        Ok(())
    }

    fn parse_rule(&mut self, rest: &'a str, line_no: usize) -> Result<(), AcoacError> {
        let (lhs, target_clause) = rest
            .split_once("->")
            .ok_or_else(|| syntax_err(line_no, "expected '->' in rule"))?;

        let admin_clause = lhs
            .trim()
            .strip_prefix("admin:")
            .map(|s| {
                let end = s.find("target:").unwrap_or(s.len());
                &s[..end]
            })
            .unwrap_or("");
        let target_precond_clause = lhs.trim().find("target:").map(|i| &lhs.trim()[i + "target:".len()..]).unwrap_or("");

        let admin_precond = parse_atom_list(admin_clause, line_no)?;
        let target_precond = parse_atom_list(target_precond_clause, line_no)?;

        let target_clause = target_clause.trim();
        let (is_negative, attr_and_value) = if let Some(stripped) = target_clause.strip_prefix('!') {
            (true, stripped.trim())
        } else {
            (false, target_clause)
        };

        let (target_attr, target_value) = if is_negative {
            (attr_and_value, None)
        } else {
            let (a, v) = attr_and_value
                .split_once('=')
                .ok_or_else(|| syntax_err(line_no, "expected 'attr = value' after '->'"))?;
            (a.trim(), Some(v.trim()))
        };

        self.rules.push(RawRule { admin_precond, target_precond, target_attr, target_value, is_negative });
        Ok(())
    }

    fn finish(self) -> Result<Instance, AcoacError> {
        let Parser { mut symbols, user_count, admins, init_edits, rules, query } = self;

        let mut init = State::new(user_count, symbols.attr_count());
        for (user, attr_name, value_name) in init_edits {
            let attr = symbols
                .find_attr(attr_name)
                .ok_or_else(|| InputError::UnknownAttribute(attr_name.to_string()))?;
            let value = symbols
                .find_value(attr, value_name)
                .ok_or(InputError::QueryValueNotInDomain)?;
            if user >= user_count {
                return Err(InputError::UnknownUser(user).into());
            }
            init.set(user, attr, value);
        }

        let mut built_rules = Vec::with_capacity(rules.len());
        for raw in rules {
            let admin_precond = resolve_atoms(&symbols, raw.admin_precond)?;
            let target_precond = resolve_atoms(&symbols, raw.target_precond)?;
            let target_attr = symbols
                .find_attr(raw.target_attr)
                .ok_or_else(|| InputError::UnknownAttribute(raw.target_attr.to_string()))?;
            let target_value = match raw.target_value {
                Some(v) => symbols.find_value(target_attr, v).ok_or(InputError::QueryValueNotInDomain)?,
                None => 0,
            };
            built_rules.push(Rule {
                admin_precond,
                target_precond,
                target_attr,
                target_value,
                is_negative: raw.is_negative,
            });
        }

        let mut built_query = Vec::with_capacity(query.len());
        for (user, attr_name, value_name) in query {
            let attr = symbols
                .find_attr(attr_name)
                .ok_or_else(|| InputError::UnknownAttribute(attr_name.to_string()))?;
            let value = symbols.find_value(attr, value_name).ok_or(InputError::QueryValueNotInDomain)?;
            if user >= user_count {
                return Err(InputError::QueryUserOutOfRange(user).into());
            }
            built_query.push(QueryAtom { user, attr, value });
        }

        let instance = Instance::root(symbols, user_count, admins, init, built_rules, built_query);
        instance.check_invariants()?;
        Ok(instance)
    }
}

fn parse_atom_list(clause: &str, line_no: usize) -> Result<Vec<(&str, &str, bool)>, AcoacError> {
    let clause = clause.trim();
    if clause.is_empty() {
        return Ok(Vec::new());
    }
    clause
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|atom| {
            if let Some((attr, value)) = atom.split_once("!=") {
                Ok((attr.trim(), value.trim(), false))
            } else if let Some((attr, value)) = atom.split_once('=') {
                Ok((attr.trim(), value.trim(), true))
            } else {
                Err(syntax_err(line_no, format!("bad precondition atom {atom:?}")))
            }
        })
        .collect()
}

fn resolve_atoms(symbols: &Symbols, atoms: Vec<(&str, &str, bool)>) -> Result<Vec<PrecondAtom>, AcoacError> {
    atoms
        .into_iter()
        .map(|(attr_name, value_name, positive)| {
            let attr = symbols
                .find_attr(attr_name)
                .ok_or_else(|| InputError::UnknownAttribute(attr_name.to_string()))?;
            let value = symbols
                .find_value(attr, value_name)
                .ok_or(InputError::QueryValueNotInDomain)?;
            Ok(PrecondAtom { attr, value, positive })
        })
        .collect()
}

fn split_first_word(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(idx) => (&line[..idx], line[idx..].trim_start()),
        None => (line, ""),
    }
}

/// Render an instance back to `.aabac` text. Deterministic: attributes
/// and rules are written in their interned/stored order, so re-parsing
/// the output always reproduces a structurally equal instance.
pub fn write_aabac(instance: &Instance) -> String {
    let mut out = String::new();
    let symbols = &instance.symbols;

    for attr in symbols.attrs() {
        let domain = symbols.domain(attr);
        let values = domain[1..].join(", ");
        out.push_str(&format!("attr {} : {} ;\n", symbols.attr_name(attr), values));
    }

    out.push_str(&format!("users {} ;\n", instance.user_count()));
    let admins: Vec<String> = instance.admins().iter().map(|a| a.to_string()).collect();
    out.push_str(&format!("admins {} ;\n", admins.join(", ")));

    for user in instance.users() {
        for attr in symbols.attrs() {
            let value = instance.init().get(user, attr);
            if value != crate::symbols::BOTTOM {
                out.push_str(&format!(
                    "init {}.{} = {} ;\n",
                    user,
                    symbols.attr_name(attr),
                    symbols.value_name(attr, value)
                ));
            }
        }
    }

    for rule in &instance.rules {
        let admin_clause = render_atoms(symbols, &rule.admin_precond);
        let target_clause = render_atoms(symbols, &rule.target_precond);
        if rule.is_negative {
            out.push_str(&format!(
                "rule admin: {admin_clause} target: {target_clause} -> !{} ;\n",
                symbols.attr_name(rule.target_attr)
            ));
        } else {
            out.push_str(&format!(
                "rule admin: {admin_clause} target: {target_clause} -> {} = {} ;\n",
                symbols.attr_name(rule.target_attr),
                symbols.value_name(rule.target_attr, rule.target_value)
            ));
        }
    }

    for atom in &instance.query {
        out.push_str(&format!(
            "query {}.{} = {} ;\n",
            atom.user,
            symbols.attr_name(atom.attr),
            symbols.value_name(atom.attr, atom.value)
        ));
    }

    out
}

fn render_atoms(symbols: &Symbols, atoms: &[PrecondAtom]) -> String {
    atoms
        .iter()
        .map(|a| {
            let op = if a.positive { "=" } else { "!=" };
            format!("{}{op}{}", symbols.attr_name(a.attr), symbols.value_name(a.attr, a.value))
        })
        .collect::<Vec<_>>()
        .join(",")
}
