//! ASCII 33..90 → dot/dash pattern, using the shift-register trick the
//! spec's Design Notes call out: the terminator is encoded as "the
//! sentinel bit is the last bit still standing" rather than a separate
//! length field.
//!
//! Two views of the same table are needed because the engine walks the
//! pattern in two different directions for two different reasons:
//!
//! - **Transmission** (`tx_code`) consumes elements LSB-first, shifting
//!   right after each one, stopping when only the sentinel `0x01` remains
//!   (spec §4.4 "SND_PTT/SND_ELE/SND_DELAY"). The code is built by
//!   scanning the pattern in reverse so the *first* element lands at bit 0.
//! - **Collector matching** (`decode`) grows forward as the operator keys
//!   elements in real time (spec §4.4 "Collector & echo"): each new
//!   element shifts the accumulator left and ORs itself in at bit 0, so
//!   the most recent element is always at the bottom. `decode` matches
//!   against a table built the same way.
//!
//! `0x01` means "no code" for both directions.

pub const NO_CODE: u8 = 0x01;

const TABLE: &[(u8, &str)] = &[
    (b'A', ".-"),
    (b'B', "-..."),
    (b'C', "-.-."),
    (b'D', "-.."),
    (b'E', "."),
    (b'F', "..-."),
    (b'G', "--."),
    (b'H', "...."),
    (b'I', ".."),
    (b'J', ".---"),
    (b'K', "-.-"),
    (b'L', ".-.."),
    (b'M', "--"),
    (b'N', "-."),
    (b'O', "---"),
    (b'P', ".--."),
    (b'Q', "--.-"),
    (b'R', ".-."),
    (b'S', "..."),
    (b'T', "-"),
    (b'U', "..-"),
    (b'V', "...-"),
    (b'W', ".--"),
    (b'X', "-..-"),
    (b'Y', "-.--"),
    (b'Z', "--.."),
    (b'0', "-----"),
    (b'1', ".----"),
    (b'2', "..---"),
    (b'3', "...--"),
    (b'4', "....-"),
    (b'5', "....."),
    (b'6', "-...."),
    (b'7', "--..."),
    (b'8', "---.."),
    (b'9', "----."),
    (b'.', ".-.-.-"),
    (b',', "--..--"),
    (b'?', "..--.."),
    (b'/', "-..-."),
    (b'!', "-.-.--"),
    (b'=', "-...-"),
    (b'+', ".-.-."),
    (b'-', "-....-"),
    (b':', "---..."),
    (b';', "-.-.-."),
    (b'\'', ".----."),
    (b'"', ".-..-."),
    (b'(', "-.--."),
    (b')', "-.--.-"),
    (b'@', ".--.-."),
    (b'&', ".-..."),
];

fn pattern_for(ascii: u8) -> Option<&'static str> {
    TABLE
        .iter()
        .find(|&&(a, _)| a == ascii)
        .map(|&(_, pattern)| pattern)
}

/// Transmit-ready code for `ascii`: bit 0 is the first element to send,
/// dash = 1, dot = 0; shift right after each element; done once the value
/// equals `NO_CODE`. Returns `NO_CODE` when `ascii` has no Morse mapping.
pub fn tx_code(ascii: u8) -> u8 {
    let Some(pattern) = pattern_for(ascii) else {
        return NO_CODE;
    };
    let mut code: u8 = 1;
    for ch in pattern.chars().rev() {
        code <<= 1;
        if ch == '-' {
            code |= 1;
        }
    }
    code
}

/// Is `code` a dash for the current element, and should sending continue
/// after shifting it right once?
pub fn next_element(code: u8) -> (bool, u8) {
    let is_dash = code & 0x01 != 0;
    (is_dash, code >> 1)
}

pub fn is_complete(code: u8) -> bool {
    code == NO_CODE
}

/// Collector code for `ascii`, built the same way the operator's live
/// collector accumulates (see module docs). Used only to build the
/// decode table; `decode` is the inverse lookup.
fn collector_code(pattern: &str) -> u8 {
    let mut code: u8 = 1;
    for ch in pattern.chars() {
        code = (code << 1) | if ch == '-' { 1 } else { 0 };
    }
    code
}

/// Match a live collector value against the table, returning the ASCII
/// character if `collector` exactly encodes a known pattern.
pub fn decode(collector: u8) -> Option<u8> {
    TABLE
        .iter()
        .find(|&&(_, pattern)| collector_code(pattern) == collector)
        .map(|&(ascii, _)| ascii)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ascii_is_no_code() {
        assert_eq!(tx_code(b'#'), NO_CODE);
        assert_eq!(tx_code(b' '), NO_CODE);
    }

    #[test]
    fn e_is_a_single_dot() {
        let code = tx_code(b'E');
        let (is_dash, rest) = next_element(code);
        assert!(!is_dash);
        assert!(is_complete(rest));
    }

    #[test]
    fn t_is_a_single_dash() {
        let code = tx_code(b'T');
        let (is_dash, rest) = next_element(code);
        assert!(is_dash);
        assert!(is_complete(rest));
    }

    #[test]
    fn a_is_dot_then_dash() {
        let mut code = tx_code(b'A');
        let (d1, rest1) = next_element(code);
        assert!(!d1);
        code = rest1;
        let (d2, rest2) = next_element(code);
        assert!(d2);
        assert!(is_complete(rest2));
    }

    #[test]
    fn every_table_entry_round_trips_through_sending() {
        for &(ascii, pattern) in TABLE {
            let mut code = tx_code(ascii);
            let mut sent = String::new();
            for _ in 0..pattern.len() {
                let (is_dash, rest) = next_element(code);
                sent.push(if is_dash { '-' } else { '.' });
                code = rest;
            }
            assert!(is_complete(code), "pattern for {} did not terminate", ascii as char);
            assert_eq!(sent, pattern, "mismatch for {}", ascii as char);
        }
    }

    #[test]
    fn collector_decodes_typed_elements() {
        // Type S: dot, dot, dot.
        let mut collector: u8 = 1;
        for _ in 0..3 {
            collector = (collector << 1) | 0;
        }
        assert_eq!(decode(collector), Some(b'S'));
    }

    #[test]
    fn collector_no_match_on_partial_pattern() {
        // Just one dot typed so far — matches 'E', not a longer letter.
        let collector: u8 = (1 << 1) | 0;
        assert_eq!(decode(collector), Some(b'E'));
    }
}
