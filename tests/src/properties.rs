//! Property-based tests for the lexer, the off-side rule and the SCC classifier

use gll_bsr_core::*;
use proptest::prelude::*;

fn expressions() -> LexicalGrammar {
    LexicalGrammar::builder()
        .tag("IF", "if")
        .tag("IDENT", "[a-z]+")
        .tag("NUMBER", "[0-9]+")
        .tag("EQ", "=")
        .tag("EQEQ", "==")
        .tag("PLUS", "[+]")
        .ignore("WS", "[ \n]+")
        .build(&mut AutomatonCache::new())
        .unwrap()
}

fn blocks() -> LexicalGrammar {
    LexicalGrammar::builder()
        .indent("INDENT")
        .dedent("DEDENT")
        .tag("WORD", "[a-z]+")
        .ignore("WS", "[ \n]+")
        .build(&mut AutomatonCache::new())
        .unwrap()
}

/// Depths of consecutive lines: the first at 0, each at most one deeper than the previous.
fn depths_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..4, 1..12).prop_map(|raw| {
        let mut depths = Vec::with_capacity(raw.len());
        let mut previous = 0;
        for (index, depth) in raw.into_iter().enumerate() {
            let depth = if index == 0 { 0 } else { depth.min(previous + 1) };
            depths.push(depth);
            previous = depth;
        }
        depths
    })
}

fn indented(depths: &[usize]) -> String {
    depths
        .iter()
        .map(|depth| format!("{}x\n", "  ".repeat(*depth)))
        .collect()
}

/// Cyclic nonterminals by brute-force transitive closure.
fn brute_force_cycles(nodes: usize, edges: &[(usize, usize)]) -> Vec<bool> {
    let mut reach = vec![vec![false; nodes]; nodes];
    for &(from, to) in edges {
        reach[from][to] = true;
    }
    for k in 0..nodes {
        for i in 0..nodes {
            for j in 0..nodes {
                if reach[i][k] && reach[k][j] {
                    reach[i][j] = true;
                }
            }
        }
    }
    (0..nodes).map(|i| reach[i][i]).collect()
}

const NODES: usize = 6;

proptest! {
    #[test]
    fn lexing_is_deterministic(input in "[a-z0-9=+ \n?]{0,40}") {
        let grammar = expressions();
        let first: Vec<_> = grammar.lexer(&input).collect();
        let second: Vec<_> = grammar.lexer(&input).collect();
        prop_assert_eq!(&first, &second);
        for terminal in first.into_iter().flatten() {
            prop_assert_eq!(&input[terminal.start.offset..terminal.end.offset], terminal.text.as_str());
        }
    }

    #[test]
    fn offside_terminals_balance(depths in depths_strategy()) {
        let grammar = blocks();
        let (indent, dedent) = grammar.offside().unwrap();
        let input = indented(&depths);
        let mut lexer = grammar.lexer(&input);
        let mut words = 0;
        let mut open = 0i64;
        while let Some(terminal) = lexer.next() {
            let terminal = terminal.unwrap();
            if terminal.tag == indent {
                open += 1;
            } else if terminal.tag == dedent {
                open -= 1;
            } else {
                prop_assert_eq!(lexer.indentation_depth(), depths[words]);
                prop_assert_eq!(open, depths[words] as i64);
                words += 1;
            }
        }
        prop_assert_eq!(words, depths.len());
        prop_assert_eq!(open, 0);
    }

    #[test]
    fn unmatched_width_is_an_error(depths in depths_strategy()) {
        prop_assume!(depths.last().map_or(false, |depth| *depth >= 1));
        let grammar = blocks();
        let input = format!("{} x\n", indented(&depths));
        let result: Result<Vec<_>, _> = grammar.lexer(&input).collect();
        let unmatched = matches!(result, Err(LexicalError::Indentation { width: 1, .. }));
        prop_assert!(unmatched, "expected an indentation error, got {:?}", result);
    }

    #[test]
    fn cyclic_iff_on_a_cycle(edges in prop::collection::vec((0..NODES, 0..NODES), 0..15)) {
        let lexical = LexicalGrammar::builder()
            .tag("X", "x")
            .build(&mut AutomatonCache::new())
            .unwrap();
        let mut builder = Grammar::builder(&lexical).start("N0");
        for node in 0..NODES {
            let mut alternatives = vec![vec![t("X")]];
            for &(_, to) in edges.iter().filter(|(from, _)| *from == node) {
                alternatives.push(vec![n(&format!("N{}", to))]);
            }
            builder = builder.rule(&format!("N{}", node), alternatives);
        }
        let grammar = builder.build().unwrap();

        let expected = brute_force_cycles(NODES, &edges);
        for (node, cyclic) in expected.into_iter().enumerate() {
            let id = grammar.id(&format!("N{}", node)).unwrap();
            prop_assert_eq!(grammar.is_cyclic(id), cyclic);
        }

        // every one of these grammars derives a single `x`
        let bsr = Parser::new(&grammar).parse_str(&lexical, "x").unwrap();
        prop_assert!(crate::is_sound(&bsr));
    }
}
