use incpdf::{dictionary, PrevTrailer};
use std::io::Read;

#[allow(dead_code)]
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[allow(dead_code)]
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// The decimal value on the line following `startxref`.
#[allow(dead_code)]
pub fn startxref_value(update: &[u8]) -> i64 {
    let at = find(update, b"startxref\r\n").expect("no startxref") + 11;
    let digits = &update[at..];
    let end = find(digits, b"\r\n").expect("unterminated startxref value");
    std::str::from_utf8(&digits[..end]).unwrap().parse().unwrap()
}

/// Bytes between the first `stream` keyword and its `endstream`.
#[allow(dead_code)]
pub fn stream_payload(update: &[u8]) -> Vec<u8> {
    let begin = find(update, b"stream\r\n").expect("no stream keyword") + 8;
    let length = find(&update[begin..], b"\r\nendstream").expect("no endstream keyword");
    update[begin..begin + length].to_vec()
}

/// The integer following the first `/Length` key.
#[allow(dead_code)]
pub fn length_value(update: &[u8]) -> usize {
    let at = find(update, b"/Length ").expect("no Length key") + 8;
    let rest = &update[at..];
    let end = rest.iter().position(|byte| !byte.is_ascii_digit()).unwrap();
    std::str::from_utf8(&rest[..end]).unwrap().parse().unwrap()
}

/// Byte offsets of all in-use records in a classical xref table.
#[allow(dead_code)]
pub fn used_offsets(update: &[u8]) -> Vec<u64> {
    update
        .split(|&byte| byte == b'\n')
        .filter_map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.len() == 18 && line.ends_with(b" n") {
                std::str::from_utf8(&line[..10]).ok()?.parse().ok()
            } else {
                None
            }
        })
        .collect()
}

#[allow(dead_code)]
pub fn inflate(data: &[u8]) -> Vec<u8> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut output = Vec::new();
    decoder.read_to_end(&mut output).expect("payload does not inflate");
    output
}

#[allow(dead_code)]
pub fn classical_trailer(size: i64, position: u64) -> PrevTrailer {
    PrevTrailer::new(dictionary! { "Size" => size }, position)
}
