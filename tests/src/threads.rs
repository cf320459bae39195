use gll_bsr_core::*;
use std::sync::{Arc, Mutex};
use std::thread;

fn sums(cache: &mut AutomatonCache) -> LexicalGrammar {
    LexicalGrammar::builder()
        .tag("N", "[0-9]+")
        .tag("PLUS", "[+]")
        .ignore("WS", " +")
        .build(cache)
        .unwrap()
}

fn grammar(lexical: &LexicalGrammar) -> Grammar {
    Grammar::builder(lexical)
        .rule("E", [vec![n("E"), t("PLUS"), n("E")], vec![t("N")]])
        .start("E")
        .build()
        .unwrap()
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn shared_types_are_send_and_sync() {
    assert_send_sync::<AutomatonCache>();
    assert_send_sync::<LexicalGrammar>();
    assert_send_sync::<Grammar>();
    assert_send_sync::<Bsr<'static>>();
    assert_send_sync::<Error>();
}

#[test]
fn parses_share_one_grammar() {
    let lexical = sums(&mut AutomatonCache::new());
    let grammar = grammar(&lexical);
    let inputs = ["1", "1 + 2", "1 + 2 + 3", "1 + 2 + 3 + 4", "1 + 2 + 3 + 4 + 5", "1 +"];
    let sequential: Vec<_> = inputs
        .iter()
        .map(|input| Parser::new(&grammar).parse_str(&lexical, input).map(|bsr| bsr.count_derivations()))
        .collect();

    let concurrent: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|input| {
                let (lexical, grammar) = (&lexical, &grammar);
                scope.spawn(move || {
                    Parser::new(grammar)
                        .parse_str(lexical, input)
                        .map(|bsr| bsr.count_derivations())
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(concurrent, sequential);
    let catalan: Vec<Result<Option<u128>, Error>> = vec![Ok(Some(1)), Ok(Some(1)), Ok(Some(2)), Ok(Some(5)), Ok(Some(14))];
    assert_eq!(concurrent[..5], catalan[..]);
    assert!(concurrent[5].is_err());
}

#[test]
fn threads_share_one_cache() {
    let cache = Mutex::new(AutomatonCache::new());
    let shared = sums(&mut cache.lock().unwrap());
    let automata: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = &cache;
                scope.spawn(move || {
                    let lexical = sums(&mut cache.lock().unwrap());
                    let grammar = grammar(&lexical);
                    let bsr = Parser::new(&grammar).parse_str(&lexical, "1 + 2 + 3").unwrap();
                    assert_eq!(bsr.count_derivations(), Some(2));
                    lexical.tag(lexical.tag_id("N").unwrap()).automaton().cloned().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    let original = shared.tag(shared.tag_id("N").unwrap()).automaton().unwrap();
    assert!(automata.iter().all(|automaton| Arc::ptr_eq(automaton, original)));
    assert_eq!(cache.into_inner().unwrap().len(), 3);
}
