pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode a big-endian unsigned integer of arbitrary width.
///
/// Works by repeated long division of the byte string by 62, so inputs wider
/// than any native integer (a SHA-256 digest, for instance) convert exactly.
/// Zero encodes as `"0"`, never as an empty string.
pub fn encode_bytes(bytes: &[u8]) -> String {
    let mut n: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
    if n.is_empty() {
        return char::from(ALPHABET[0]).to_string();
    }

    // Digits come out least-significant first.
    let mut digits = Vec::new();
    while !n.is_empty() {
        let mut rem: u32 = 0;
        let mut quotient = Vec::with_capacity(n.len());
        for &byte in &n {
            let acc = (rem << 8) | u32::from(byte);
            let q = acc / 62;
            rem = acc % 62;
            if !(quotient.is_empty() && q == 0) {
                quotient.push(q as u8);
            }
        }
        digits.push(ALPHABET[rem as usize]);
        n = quotient;
    }

    digits.reverse();
    String::from_utf8(digits).expect("base62 chars are valid UTF-8")
}

/// Force an encoded value to exactly `width` characters: keep the leading
/// (most significant) characters when too long, left-pad with `'0'` when too
/// short.
pub fn fit(encoded: &str, width: usize) -> String {
    if encoded.len() >= width {
        encoded[..width].to_string()
    } else {
        let pad = char::from(ALPHABET[0]).to_string().repeat(width - encoded.len());
        pad + encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_base62(s: &str) -> bool {
        s.bytes().all(|b| ALPHABET.contains(&b))
    }

    #[test]
    fn test_encode_zero() {
        assert_eq!(encode_bytes(&[]), "0");
        assert_eq!(encode_bytes(&[0, 0, 0]), "0");
    }

    #[test]
    fn test_encode_small_values() {
        assert_eq!(encode_bytes(&[61]), "z");
        assert_eq!(encode_bytes(&[62]), "10");
        assert_eq!(encode_bytes(&[0x01, 0x00]), "48");
        assert_eq!(encode_bytes(&[0, 0, 61]), "z");
    }

    #[test]
    fn test_encode_matches_native_conversion() {
        let n: u128 = 0x0123_4567_89ab_cdef_fedc_ba98_7654_3210;
        let mut expected = Vec::new();
        let mut m = n;
        while m > 0 {
            expected.push(ALPHABET[(m % 62) as usize]);
            m /= 62;
        }
        expected.reverse();
        assert_eq!(
            encode_bytes(&n.to_be_bytes()),
            String::from_utf8(expected).unwrap()
        );
    }

    #[test]
    fn test_encode_wider_than_u128() {
        let encoded = encode_bytes(&[0xff; 32]);
        // 2^256 - 1 needs 43 base62 digits.
        assert_eq!(encoded.len(), 43);
        assert!(is_base62(&encoded));
    }

    #[test]
    fn test_fit_truncates_from_the_end() {
        assert_eq!(fit("abcdef", 3), "abc");
        assert_eq!(fit("abc", 3), "abc");
    }

    #[test]
    fn test_fit_left_pads_with_zero() {
        assert_eq!(fit("z", 4), "000z");
        assert_eq!(fit("", 2), "00");
    }
}
