#![no_main]

use libfuzzer_sys::fuzz_target;

use cppfix::parse::Document;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let doc = Document::parse("fuzz.cpp", text);
    for token in doc.tokens() {
        let _ = doc.text_of_range(token.start, token.end);
    }
    let _ = doc.tree().path_to(text.len() / 2);
});
