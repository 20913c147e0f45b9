//! WBI request signing.
//!
//! Certain endpoints require a `w_rid` signature computed from the request
//! parameters, a timestamp (`wts`) and a mixing key derived from the two
//! session keys published by the nav endpoint. The transform must match the
//! verifier byte for byte: key mixing order, value filtering, byte-wise key
//! sort and form-style percent-encoding are all part of the contract.
//!
//! This module is pure: given the same parameters, keys and timestamp it
//! always produces the same map, and it never errors. Callers must confirm
//! key availability first; signing with empty keys produces a signature the
//! service will reject.

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Fixed permutation over the 64-character key concatenation. A constant of
/// the algorithm, not configuration.
const MIXIN_KEY_ENC_TAB: [usize; 64] = [
    46, 47, 18, 2, 53, 8, 23, 32, 15, 50, 10, 31, 58, 3, 45, 35, 27, 43, 5, 49, 33, 9, 42, 19, 29,
    28, 14, 39, 12, 38, 41, 13, 37, 48, 7, 16, 24, 55, 40, 61, 26, 17, 0, 1, 60, 51, 30, 4, 22,
    25, 54, 21, 56, 59, 6, 63, 57, 62, 11, 36, 20, 34, 44, 52,
];

/// Characters the verifier strips from every value before encoding.
const FILTERED: [char; 5] = ['!', '\'', '(', ')', '*'];

/// Everything except alphanumerics and `-_.~` gets percent-encoded; a space
/// stays in the set here and is turned into `+` afterwards, matching the
/// form-encoding the verifier decodes with.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b' ');

/// Derive the 32-character mixing key from `img_key + sub_key`.
pub fn mixin_key(img_key: &str, sub_key: &str) -> String {
    let raw: Vec<char> = img_key.chars().chain(sub_key.chars()).collect();
    MIXIN_KEY_ENC_TAB
        .iter()
        .filter_map(|&i| raw.get(i))
        .take(32)
        .collect()
}

/// Sign `params` with the given keys and timestamp.
///
/// Steps: insert `wts`, strip `!'()*` from every value, sort keys byte-wise,
/// form-encode into a query string, then append the MD5 of
/// `query + mixin_key` as `w_rid`.
pub fn sign(
    params: BTreeMap<String, String>,
    img_key: &str,
    sub_key: &str,
    wts: i64,
) -> BTreeMap<String, String> {
    let key = mixin_key(img_key, sub_key);

    let mut signed: BTreeMap<String, String> = params
        .into_iter()
        .map(|(k, v)| (k, filter_value(&v)))
        .collect();
    signed.insert("wts".to_string(), wts.to_string());

    let query = encode_query(&signed);

    let mut hasher = Md5::new();
    hasher.update(query.as_bytes());
    hasher.update(key.as_bytes());
    let digest = hex::encode(hasher.finalize());

    signed.insert("w_rid".to_string(), digest);
    signed
}

fn filter_value(value: &str) -> String {
    value.chars().filter(|c| !FILTERED.contains(c)).collect()
}

/// `key=value&key=value` with form-style escaping (space encodes as `+`).
fn encode_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", quote_plus(k), quote_plus(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn quote_plus(s: &str) -> String {
    utf8_percent_encode(s, QUERY_SET)
        .to_string()
        .replace(' ', "+")
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMG_KEY: &str = "7cd084941338484aae1ad9425b84077c";
    const SUB_KEY: &str = "4932caff0ff746eab6f01bf08b70ac45";

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn mixin_key_permutes_and_truncates_to_32() {
        // First table entry is 46, i.e. the 47th character of img+sub.
        let key = mixin_key(&"a".repeat(32), &"b".repeat(32));
        assert_eq!(key.len(), 32);
        assert_eq!(key, "bbaabaababaababbababbabaaaababba");
    }

    #[test]
    fn matches_recorded_golden_vector() {
        let key = mixin_key(IMG_KEY, SUB_KEY);
        assert_eq!(key, "ea1db124af3c7062474693fa704f4ff8");

        let signed = sign(
            params(&[("foo", "114"), ("bar", "514"), ("zab", "1919810")]),
            IMG_KEY,
            SUB_KEY,
            1_702_204_169,
        );
        assert_eq!(signed["wts"], "1702204169");
        assert_eq!(signed["w_rid"], "8f6f2b5b3d485fe1886cec6a0be8c5d4");
    }

    #[test]
    fn filtered_characters_never_reach_the_output() {
        let signed = sign(
            params(&[("keyword", "Rust (lang)!*"), ("mid", "42")]),
            IMG_KEY,
            SUB_KEY,
            1_717_000_000,
        );
        let value = &signed["keyword"];
        for c in ['!', '\'', '(', ')', '*'] {
            assert!(!value.contains(c), "{c:?} leaked into {value:?}");
        }
        assert_eq!(value, "Rust lang");
        assert_eq!(signed["w_rid"], "c7e96713318ddb96e38cf515320a5a8d");
    }

    #[test]
    fn signing_is_deterministic_for_a_fixed_timestamp() {
        let input = params(&[("oid", "1"), ("type", "11"), ("message", "好运连连")]);
        let a = sign(input.clone(), IMG_KEY, SUB_KEY, 1_700_000_000);
        let b = sign(input, IMG_KEY, SUB_KEY, 1_700_000_000);
        assert_eq!(a, b);
    }

    #[test]
    fn w_rid_is_lowercase_hex_of_128_bits() {
        let signed = sign(params(&[("a", "b")]), IMG_KEY, SUB_KEY, 0);
        let rid = &signed["w_rid"];
        assert_eq!(rid.len(), 32);
        assert!(rid.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn query_encoding_uses_plus_for_spaces() {
        assert_eq!(quote_plus("a b"), "a+b");
        assert_eq!(quote_plus("~tilde-safe_chars.ok"), "~tilde-safe_chars.ok");
        assert_eq!(quote_plus("你好"), "%E4%BD%A0%E5%A5%BD");
    }
}
