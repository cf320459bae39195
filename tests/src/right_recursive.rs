use gll_bsr_core::*;

fn lexical() -> LexicalGrammar {
    LexicalGrammar::builder()
        .tag("A", "a")
        .tag("B", "b")
        .build(&mut AutomatonCache::new())
        .unwrap()
}

fn grammar(lexical: &LexicalGrammar) -> Grammar {
    Grammar::builder(lexical)
        .rule("L", [vec![t("A"), n("L")], vec![t("B")]])
        .start("L")
        .build()
        .unwrap()
}

check_count! {one, "b", 1}
check_count! {three, "aab", 1}
check_error! {unterminated, "aa", 2}

const DEPTH: usize = 100_000;

#[test]
fn deep_list() {
    let lexical = lexical();
    let grammar = grammar(&lexical);
    let input = format!("{}b", "a".repeat(DEPTH));
    let bsr = Parser::new(&grammar).parse_str(&lexical, &input).unwrap();
    assert_eq!(bsr.roots().len(), 1);
    assert_eq!(bsr.count_derivations(), Some(1));

    let mut derivations = bsr.derivations();
    let steps = derivations.next().map(|steps| steps.to_vec()).unwrap();
    // one node and one leaf per terminal
    assert_eq!(steps.len(), 2 * (DEPTH + 1));
    assert_eq!(steps[1], DerivationStep::Leaf { index: 0 });
    assert_eq!(steps.last(), Some(&DerivationStep::Leaf { index: DEPTH }));
    assert!(derivations.next().is_none());
}
