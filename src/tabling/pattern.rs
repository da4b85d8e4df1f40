//! Canonical call-pattern serialization for the variant check (spec §4.7).
use crate::subst::Subst;
use crate::term::{Atom, Term};

/// A normalized call pattern: which predicate, and what its arguments
/// look like once every ground subterm is serialized and every
/// still-unbound variable is renumbered from 0 by first appearance.
/// Two calls are variants iff their `CallKey`s are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey {
    predicate_id: u64,
    pattern: String,
}

impl CallKey {
    pub fn predicate_id(&self) -> u64 {
        self.predicate_id
    }
}

/// Normalize `args` under `s` into a [`CallKey`]; reuses
/// [`crate::reify::reify`] for the variable-renaming half of the job.
pub fn normalize(predicate_id: u64, args: &[Term], s: &Subst) -> CallKey {
    let tuple = crate::term::list(args.to_vec());
    let reified = crate::reify::reify(&tuple, s);
    let mut pattern = String::new();
    serialize(&reified, &mut pattern);
    CallKey { predicate_id, pattern }
}

fn serialize(t: &Term, out: &mut String) {
    match t {
        Term::Nil => out.push_str("()"),
        Term::Pair(car, cdr) => {
            out.push('(');
            serialize(car, out);
            out.push(',');
            serialize(cdr, out);
            out.push(')');
        }
        Term::Var(v) => {
            out.push_str("V#");
            out.push_str(&v.id.to_string());
        }
        Term::Atom(a) => match a {
            Atom::Int(i) => out.push_str(&format!("i{i}")),
            Atom::Float(f) => out.push_str(&format!("f{}", f.to_bits())),
            Atom::Symbol(s) => out.push_str(&format!("y{}:{}", s.len(), s)),
            Atom::Str(s) => out.push_str(&format!("s{}:{}", s.len(), s)),
            Atom::Bool(b) => out.push_str(&format!("b{b}")),
            Atom::Blob(b) => out.push_str(&format!("x{}", hex(b))),
        },
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::term::{atom, fresh, var};

    #[test]
    fn ground_calls_with_same_values_are_variants() {
        let s = Subst::new();
        let k1 = normalize(1, &[atom(1i64), atom(2i64)], &s);
        let k2 = normalize(1, &[atom(1i64), atom(2i64)], &s);
        assert_eq!(k1, k2);
    }

    #[test]
    fn different_predicate_ids_are_not_variants() {
        let s = Subst::new();
        let k1 = normalize(1, &[atom(1i64)], &s);
        let k2 = normalize(2, &[atom(1i64)], &s);
        assert_ne!(k1, k2);
    }

    #[test]
    fn two_free_variables_are_variants_regardless_of_identity() {
        let s = Subst::new();
        let a = fresh("a");
        let b = fresh("b");
        let k1 = normalize(1, &[var(a)], &s);
        let k2 = normalize(1, &[var(b)], &s);
        assert_eq!(k1, k2);
    }

    #[test]
    fn symbol_and_string_with_equal_text_are_not_confused() {
        let s = Subst::new();
        let k1 = normalize(1, &[crate::term::symbol("x")], &s);
        let k2 = normalize(1, &[atom("x")], &s);
        assert_ne!(k1, k2);
    }
}
