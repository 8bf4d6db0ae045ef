#![no_main]

use libfuzzer_sys::fuzz_target;

use cppfix::changeset::ChangeSet;

// Each 4-byte chunk is one edit: opcode, two offsets, a length byte.
fuzz_target!(|data: &[u8]| {
    let (text, ops) = data.split_at(data.len() / 2);
    let Ok(text) = std::str::from_utf8(text) else {
        return;
    };
    let len = text.len().max(1);
    let mut cs = ChangeSet::new();
    for chunk in ops.chunks_exact(4) {
        let a = chunk[1] as usize % len;
        let b = chunk[2] as usize % len;
        let (start, end) = (a.min(b), a.max(b));
        match chunk[0] % 5 {
            0 => {
                cs.insert(a, "x".repeat(chunk[3] as usize % 4));
            }
            1 => {
                cs.remove(start, end);
            }
            2 => {
                cs.replace(start, end, "y");
            }
            3 => {
                cs.move_range(start, end, chunk[3] as usize % len);
            }
            _ => {
                cs.copy(start, end, chunk[3] as usize % len);
            }
        }
    }
    if let Ok(out) = cs.apply(text) {
        assert!(!cs.has_error());
        let _ = out.len();
    }
});
