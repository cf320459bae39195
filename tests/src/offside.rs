use gll_bsr_core::*;

fn lexical() -> LexicalGrammar {
    LexicalGrammar::builder()
        .indent("INDENT")
        .dedent("DEDENT")
        .tag("WORD", "[a-z]+")
        .tag("COLON", ":")
        .ignore("COMMENT", "#[^\n]*")
        .ignore("WS", "[ \n]+")
        .build(&mut AutomatonCache::new())
        .unwrap()
}

fn grammar(lexical: &LexicalGrammar) -> Grammar {
    Grammar::builder(lexical)
        .rule("Block", [vec![many1(vec![n("Stmt")])]])
        .rule(
            "Stmt",
            [
                vec![t("WORD")],
                vec![t("WORD"), t("COLON"), t("INDENT"), n("Block"), t("DEDENT")],
            ],
        )
        .start("Block")
        .build()
        .unwrap()
}

check_count! {flat, "a\nb\nc\n", 1}
check_count! {nested, "a:\n  b\n  c:\n    d\ne\n", 1}
check_count! {closed_at_end, "a:\n  b:\n    c", 1}
check_count! {comments_and_blank_lines, "a:\n\n# top\n    # deeper\n  b\n\n  c\n", 1}
check_error! {missing_block, "a:\nb", 2}

#[test]
fn terminals() {
    let lexical = lexical();
    let names: Vec<_> = lexical
        .lexer("a:\n  b:\n    c\n  d\n")
        .map(|terminal| lexical.name(terminal.unwrap().tag).to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "WORD", "COLON", "INDENT", "WORD", "COLON", "INDENT", "WORD", "DEDENT", "WORD",
            "DEDENT"
        ]
    );
}

#[test]
fn unmatched_dedent() {
    let lexical = lexical();
    let grammar = grammar(&lexical);
    let err = Parser::new(&grammar)
        .parse_str(&lexical, "a:\n    b\n  c\n")
        .unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::Lexical);
    assert_eq!(
        err,
        Error::Lexical(LexicalError::Indentation {
            position: Position::new(11, 3, 3),
            width: 2,
        })
    );
}

#[test]
fn expected_indent() {
    let lexical = lexical();
    let grammar = grammar(&lexical);
    let err = Parser::new(&grammar).parse_str(&lexical, "a:\nb").unwrap_err();
    let Error::Syntactic(err) = err else {
        panic!("expected a syntactic error");
    };
    let report = err.no_derivation().unwrap();
    assert_eq!(report.expected, vec!["INDENT"]);
    assert_eq!(report.found.as_deref(), Some("WORD"));
}
