//! This example is taken from the original paper

use gll_bsr_core::*;

fn lexical() -> LexicalGrammar {
    LexicalGrammar::builder()
        .tag("A", "a")
        .tag("B", "b")
        .tag("C", "c")
        .tag("D", "d")
        .ignore("WS", " ")
        .build(&mut AutomatonCache::new())
        .unwrap()
}

fn grammar(lexical: &LexicalGrammar) -> Grammar {
    Grammar::builder(lexical)
        .rule("S", [vec![n("A"), n("S"), t("D")], vec![n("B"), n("S")], vec![]])
        .rule("A", [vec![t("A")], vec![t("C")]])
        .rule("B", [vec![t("A")], vec![t("B")]])
        .start("S")
        .build()
        .unwrap()
}

#[test]
fn paper() {
    let lexical = lexical();
    let grammar = grammar(&lexical);
    let bsr = Parser::new(&grammar).parse_str(&lexical, "aabd").unwrap();
    // two ways to parse
    assert_eq!(bsr.count_derivations(), Some(2));
    let first: Vec<_> = bsr
        .roots()
        .iter()
        .map(|&id| grammar.name(bsr.epn(id).slot.nonterminal))
        .collect();
    assert_eq!(first, vec!["S", "S"]);

    let a = grammar.id("A").unwrap();
    let b = grammar.id("B").unwrap();
    assert!(!grammar.is_cyclic(a) && !grammar.is_cyclic(b));
    assert!(grammar.is_cyclic(grammar.start()));
    // the first `a` is read both as an A and as a B
    assert_eq!(bsr.node(NodeKey::Nonterminal(a), 0, 1).len(), 1);
    assert_eq!(bsr.node(NodeKey::Nonterminal(b), 0, 1).len(), 1);
}

check_count! {eps, "", 1}
check_count! {single_b, "b", 1}
check_count! {single_a, "a", 1}
check_error! {single_d, "d", 0}
check_count! {ad, "ad", 1}
