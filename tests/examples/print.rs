//! Print the call-return forest and BSR graph

use gll_bsr_core::*;
use std::fs::File;
use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let lexical = LexicalGrammar::builder()
        .tag("Ta", "a")
        .tag("Tb", "b")
        .tag("Tc", "c")
        .tag("Td", "d")
        .build(&mut AutomatonCache::new())?;
    let grammar = Grammar::builder(&lexical)
        .rule("S", [vec![n("A"), n("S"), t("Td")], vec![n("B"), n("S")], vec![]])
        .rule("A", [vec![t("Ta")], vec![t("Tc")]])
        .rule("B", [vec![t("Ta")], vec![t("Tb")]])
        .start("S")
        .build()?;

    let terminals = lexical.lexer("aabd").collect::<Result<Vec<_>, _>>()?;
    {
        let mut state = ParsingState::new(&grammar, &terminals);
        state.run();
        write!(File::create("crf.dot")?, "{}", state.print_crf_dot())?;
    }

    let bsr = Parser::new(&grammar).parse(terminals.into_iter().map(Ok))?;
    write!(File::create("bsr.dot")?, "{}", bsr.to_dot())?;
    match bsr.count_derivations() {
        Some(count) => println!("{} derivations", count),
        None => println!("infinitely many derivations"),
    }
    Ok(())
}
