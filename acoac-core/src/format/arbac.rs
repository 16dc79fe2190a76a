/*!
ARBAC (administrative role-based access control) input, translated into
an ACoAC instance with a single `role` attribute.

```text
roles employee, manager, admin ;
users 3 ;
UA 0.admin ;
can_assign admin, employee -> manager ;
can_assign admin, manager, !admin -> admin ;
can_revoke admin, manager ;
query 1, manager ;
```

`can_assign <adminRole>, <precond>, ... -> <role>` lets any user holding
`adminRole` give `role` to a target whose current role satisfies every
listed precondition (`r` for "currently has `r`", `!r` for "does not
currently have `r`"). `can_revoke <adminRole>, <role>` lets any user
holding `adminRole` take `role` away from a target that currently holds
it. Both translate directly to a single-attribute [`Rule`]: ARBAC's "one
role at a time" user model is exactly the `role` attribute's domain.
*/

use std::collections::BTreeSet;

use crate::error::{AcoacError, InputError};
use crate::model::{Instance, PrecondAtom, QueryAtom, Rule, State};
use crate::symbols::{AttrId, Symbols};

const ROLE_ATTR_NAME: &str = "role";

pub fn parse_arbac(source: &str) -> Result<Instance, AcoacError> {
    let mut symbols = Symbols::new();
    let role_attr = symbols.intern_attr(ROLE_ATTR_NAME);

    let mut user_count = 0usize;
    let mut ua_edits: Vec<(usize, String)> = Vec::new();
    let mut rules: Vec<Rule> = Vec::new();
    let mut query: Vec<(usize, String)> = Vec::new();

    for (line_no, raw_line) in source.lines().enumerate() {
        let line_no = line_no + 1;
        let line = strip_comment(raw_line).trim().trim_end_matches(';').trim();
        if line.is_empty() {
            continue;
        }
        let (keyword, rest) = match line.find(char::is_whitespace) {
            Some(idx) => (&line[..idx], line[idx..].trim_start()),
            None => (line, ""),
        };

        match keyword {
            "roles" => {
                for role in rest.split(',').map(str::trim).filter(|r| !r.is_empty()) {
                    symbols.intern_value(role_attr, role);
                }
            }
            "users" => {
                user_count = rest
                    .trim()
                    .parse()
                    .map_err(|_| syntax_err(line_no, "expected an integer after 'users'"))?;
            }
            "UA" => {
                let (user, role) = rest
                    .split_once('.')
                    .ok_or_else(|| syntax_err(line_no, "expected 'UA user.role'"))?;
                let user: usize = user
                    .trim()
                    .parse()
                    .map_err(|_| syntax_err(line_no, format!("bad user index {user:?}")))?;
                ua_edits.push((user, role.trim().to_string()));
            }
            "can_assign" => {
                rules.push(parse_can_assign(rest, line_no, &symbols, role_attr)?);
            }
            "can_revoke" => {
                rules.push(parse_can_revoke(rest, line_no, &symbols, role_attr)?);
            }
            "query" => {
                let (user, role) = rest
                    .split_once(',')
                    .ok_or_else(|| syntax_err(line_no, "expected 'query user, role'"))?;
                let user: usize = user
                    .trim()
                    .parse()
                    .map_err(|_| syntax_err(line_no, format!("bad user index {user:?}")))?;
                query.push((user, role.trim().to_string()));
            }
            other => return Err(syntax_err(line_no, format!("unrecognized keyword {other:?}"))),
        }
    }

    // ARBAC grants administrative power through role membership, not a
    // fixed administrator set; every user is a potential administrator
    // and `admin_precond` is what actually gates who may fire a rule.
    let admins: BTreeSet<usize> = (0..user_count).collect();

    let mut init = State::new(user_count, symbols.attr_count());
    for (user, role) in ua_edits {
        if user >= user_count {
            return Err(InputError::UnknownUser(user).into());
        }
        let value = symbols
            .find_value(role_attr, &role)
            .ok_or_else(|| InputError::UnknownAttribute(role))?;
        init.set(user, role_attr, value);
    }

    let mut built_query = Vec::with_capacity(query.len());
    for (user, role) in query {
        if user >= user_count {
            return Err(InputError::QueryUserOutOfRange(user).into());
        }
        let value = symbols.find_value(role_attr, &role).ok_or(InputError::QueryValueNotInDomain)?;
        built_query.push(QueryAtom { user, attr: role_attr, value });
    }

    let instance = Instance::root(symbols, user_count, admins, init, rules, built_query);
    instance.check_invariants()?;
    Ok(instance)
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

fn parse_can_assign(rest: &str, line_no: usize, symbols: &Symbols, role_attr: AttrId) -> Result<Rule, AcoacError> {
    let (head, target_role) = rest
        .split_once("->")
        .ok_or_else(|| syntax_err(line_no, "expected '-> role' in can_assign"))?;
    let mut fields = head.split(',').map(str::trim).filter(|f| !f.is_empty());
    let admin_role = fields.next().ok_or_else(|| syntax_err(line_no, "can_assign needs an administrative role"))?;

    let admin_value = symbols
        .find_value(role_attr, admin_role)
        .ok_or_else(|| InputError::UnknownAttribute(admin_role.to_string()))?;

    let mut target_precond = Vec::new();
    for field in fields {
        let (name, positive) = match field.strip_prefix('!') {
            Some(stripped) => (stripped.trim(), false),
            None => (field, true),
        };
        let value = symbols
            .find_value(role_attr, name)
            .ok_or_else(|| InputError::UnknownAttribute(name.to_string()))?;
        target_precond.push(PrecondAtom { attr: role_attr, value, positive });
    }

    let target_value = symbols
        .find_value(role_attr, target_role.trim())
        .ok_or_else(|| InputError::UnknownAttribute(target_role.trim().to_string()))?;

    Ok(Rule {
        admin_precond: vec![PrecondAtom { attr: role_attr, value: admin_value, positive: true }],
        target_precond,
        target_attr: role_attr,
        target_value,
        is_negative: false,
    })
}

fn parse_can_revoke(rest: &str, line_no: usize, symbols: &Symbols, role_attr: AttrId) -> Result<Rule, AcoacError> {
    let (admin_role, target_role) = rest
        .split_once(',')
        .ok_or_else(|| syntax_err(line_no, "expected 'can_revoke adminRole, role'"))?;
    let admin_value = symbols
        .find_value(role_attr, admin_role.trim())
        .ok_or_else(|| InputError::UnknownAttribute(admin_role.trim().to_string()))?;
    let target_value = symbols
        .find_value(role_attr, target_role.trim())
        .ok_or_else(|| InputError::UnknownAttribute(target_role.trim().to_string()))?;

    Ok(Rule {
        admin_precond: vec![PrecondAtom { attr: role_attr, value: admin_value, positive: true }],
        target_precond: vec![PrecondAtom { attr: role_attr, value: target_value, positive: true }],
        target_attr: role_attr,
        target_value: 0,
        is_negative: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
roles employee, manager, admin ;
users 3 ;
UA 0.admin ;
can_assign admin, employee -> manager ;
can_revoke admin, manager ;
query 1, manager ;
";

    #[test]
    fn translates_to_a_single_role_attribute() {
        let instance = parse_arbac(SAMPLE).unwrap();
        assert_eq!(instance.symbols.attr_count(), 1);
        assert_eq!(instance.rules.len(), 2);
        assert_eq!(instance.query.len(), 1);
    }

    #[test]
    fn every_user_can_be_an_administrator_when_their_role_gates_it() {
        let instance = parse_arbac(SAMPLE).unwrap();
        assert!(instance.is_admin(0));
        assert!(instance.is_admin(2));
    }

    #[test]
    fn rejects_unknown_role_reference() {
        let bad = "roles a ;\nusers 1 ;\ncan_assign a, b -> a ;\n";
        assert!(parse_arbac(bad).is_err());
    }
}
