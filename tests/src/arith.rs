//! This example is taken from MashPlant/lalr1

use gll_bsr_core::*;
use std::collections::BTreeSet;

fn lexical() -> LexicalGrammar {
    LexicalGrammar::builder()
        .tag("ADD", "[+]")
        .tag("SUB", "-")
        .tag("MUL", "[*]")
        .tag("DIV", "/")
        .tag("MOD", "%")
        .tag("LPAR", "[(]")
        .tag("RPAR", "[)]")
        .tag("INT", "[0-9]+")
        .ignore("WS", " +")
        .build(&mut AutomatonCache::new())
        .unwrap()
}

fn grammar(lexical: &LexicalGrammar) -> Grammar {
    let binary = |op| vec![n("Expr"), t(op), n("Expr")];
    Grammar::builder(lexical)
        .rule(
            "Expr",
            [
                binary("ADD"),
                binary("SUB"),
                binary("MUL"),
                binary("DIV"),
                binary("MOD"),
                vec![t("SUB"), n("Expr")],
                vec![t("LPAR"), n("Expr"), t("RPAR")],
                vec![t("INT")],
            ],
        )
        .start("Expr")
        .build()
        .unwrap()
}

#[test]
fn ambiguous() {
    let lexical = lexical();
    let grammar = grammar(&lexical);
    let bsr = Parser::new(&grammar).parse_str(&lexical, "1 + 2 + 3").unwrap();
    // two ways to parse
    assert_eq!(bsr.roots().len(), 2);
    let splits: BTreeSet<_> = bsr.roots().iter().map(|&id| bsr.epn(id).split).collect();
    assert_eq!(splits, BTreeSet::from([2, 4]));
    assert!(bsr.is_ambiguous());
    assert!(crate::is_sound(&bsr));
}

#[test]
fn values() {
    let lexical = lexical();
    let grammar = grammar(&lexical);
    let bsr = Parser::new(&grammar).parse_str(&lexical, "8 - 4 - 2").unwrap();
    let mut values = Vec::new();
    let mut derivations = bsr.derivations();
    while let Some(steps) = derivations.next() {
        let mut steps = steps.iter();
        values.push(eval(&bsr, &mut steps));
        assert!(steps.next().is_none());
    }
    values.sort();
    assert_eq!(values, vec![2, 6]);
}

fn leaf<'a>(bsr: &Bsr<'_>, steps: &mut impl Iterator<Item = &'a DerivationStep>) -> String {
    match steps.next() {
        Some(DerivationStep::Leaf { index }) => bsr.terminals()[*index].text.clone(),
        other => panic!("expected a leaf, got {:?}", other),
    }
}

/// Evaluates the tree whose preorder steps start at `steps`.
fn eval<'a>(bsr: &Bsr<'_>, steps: &mut impl Iterator<Item = &'a DerivationStep>) -> i64 {
    let alternative = match steps.next() {
        Some(DerivationStep::Node { alternative, .. }) => *alternative,
        other => panic!("expected a node, got {:?}", other),
    };
    match alternative {
        0..=4 => {
            let l = eval(bsr, steps);
            leaf(bsr, steps);
            let r = eval(bsr, steps);
            match alternative {
                0 => l + r,
                1 => l - r,
                2 => l * r,
                3 => l / r,
                _ => l % r,
            }
        }
        5 => {
            leaf(bsr, steps);
            -eval(bsr, steps)
        }
        6 => {
            leaf(bsr, steps);
            let i = eval(bsr, steps);
            leaf(bsr, steps);
            i
        }
        _ => leaf(bsr, steps).parse().unwrap(),
    }
}

check_count! {unambiguous, "1 + (2 * -3)", 1}
check_count! {prefix_minus, "-1 - 2", 2}
check_count! {catalan, "1 + 2 * 3 - 4", 5}
check_error! {unclosed, "(1 + 2", 4}
check_error! {dangling, "1 +", 2}
