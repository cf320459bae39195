//! Terminals produced by a `logos` lexer instead of the built-in one.

use gll_bsr_core::*;
use logos::Logos;

#[derive(Logos, Debug, Eq, PartialEq, Clone)]
#[logos(skip r"[ \t\n]+")]
pub enum Token {
    #[token("+")]
    Add,
    #[token("*")]
    Mul,
    #[token("(")]
    LPar,
    #[token(")")]
    RPar,
    #[regex("[0-9]+")]
    IntLit,
}

fn lexical() -> LexicalGrammar {
    LexicalGrammar::builder()
        .external("Add")
        .external("Mul")
        .external("LPar")
        .external("RPar")
        .external("IntLit")
        .build(&mut AutomatonCache::new())
        .unwrap()
}

fn grammar(lexical: &LexicalGrammar) -> Grammar {
    Grammar::builder(lexical)
        .rule("Expr", [vec![n("Term"), many(vec![t("Add"), n("Term")])]])
        .rule("Term", [vec![n("Factor"), many(vec![t("Mul"), n("Factor")])]])
        .rule(
            "Factor",
            [vec![t("IntLit")], vec![t("LPar"), n("Expr"), t("RPar")]],
        )
        .start("Expr")
        .build()
        .unwrap()
}

fn parse<'g>(lexical: &LexicalGrammar, grammar: &'g Grammar, input: &str) -> Result<Bsr<'g>, Error> {
    Parser::new(grammar).parse(LogosTerminals::<Token>::new(lexical, input))
}

#[test]
fn unambiguous() {
    let lexical = lexical();
    let grammar = grammar(&lexical);
    let bsr = parse(&lexical, &grammar, "1 + 2 * (3 + 4)").unwrap();
    assert_eq!(bsr.count_derivations(), Some(1));
    assert!(!bsr.is_ambiguous());
    assert!(crate::is_sound(&bsr));
    assert_eq!(bsr.terminals()[5].text, "3");
    assert_eq!(bsr.terminals()[5].start, Position::new(9, 1, 10));
}

#[test]
fn precedence() {
    let lexical = lexical();
    let grammar = grammar(&lexical);
    let bsr = parse(&lexical, &grammar, "1 + 2 * 3").unwrap();
    let term = grammar.id("Term").unwrap();
    // `2 * 3` is one term
    assert_eq!(bsr.node(NodeKey::Nonterminal(term), 2, 5).len(), 1);
    assert!(bsr.node(NodeKey::Nonterminal(term), 0, 3).is_empty());
}

#[test]
fn errors() {
    let lexical = lexical();
    let grammar = grammar(&lexical);
    let err = parse(&lexical, &grammar, "1 + ?").unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Lexical);

    let err = parse(&lexical, &grammar, "(1 + 2").unwrap_err();
    let Error::Syntactic(err) = err else {
        panic!("expected a syntactic error");
    };
    let report = err.no_derivation().unwrap();
    assert_eq!(report.index, 4);
    assert_eq!(report.found, None);
    assert!(report.expected.contains(&"RPar".to_string()));
}
