//! Field name hierarchy from `pdftk generate_fdf` output
//!
//! The FDF export lists fields as nested dictionaries. A terminal field
//! carries its own `/T (name)`; a parent carries a `/Kids [ ... ]` array and
//! its `/T` comes *after* the array closes:
//!
//! ```text
//! /Fields [
//! <<
//! /Kids [
//! <<
//! /V ()
//! /T (a)
//! >>]
//! /T (group1)
//! >>
//! <<
//! /V ()
//! /T (c)
//! >>]
//! ```
//!
//! Reading forward, `a` is seen before anyone knows it lives in `group1`.
//! Walking the token stream from the tail instead, a name that directly
//! follows `]` is always a parent label and can be pushed as a prefix before
//! its children are reached.

use crate::pdf::fields::NAME_SEPARATOR;
use std::collections::BTreeSet;

const LEAF_PREFIX: &str = "/T (";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Name(&'a str),
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();

    for line in text.lines() {
        if line.contains('[') {
            tokens.push(Token::Open);
        }
        if line.contains(']') {
            tokens.push(Token::Close);
        }
        if let Some(rest) = line.strip_prefix(LEAF_PREFIX) {
            let rest = rest.trim_end();
            tokens.push(Token::Name(rest.strip_suffix(')').unwrap_or(rest)));
        }
    }

    tokens
}

/// Reconstruct every fully-qualified dotted field name from FDF text.
pub fn parse_keys(text: &str) -> BTreeSet<String> {
    let tokens = tokenize(text);
    let mut keys = BTreeSet::new();

    if tokens.len() < 2 {
        return keys;
    }

    // outermost pair is the /Fields array itself
    let tokens = &tokens[1..tokens.len() - 1];

    let mut prefixes: Vec<String> = Vec::new();
    let mut end = tokens.len();

    while end > 0 {
        end -= 1;
        let name = match tokens[end] {
            Token::Name(name) => name,
            Token::Open | Token::Close => continue,
        };

        let Some(prev) = end.checked_sub(1) else {
            keys.insert(name.to_string());
            break;
        };

        // an unnamed parent contributes no segment
        let qualified = match prefixes.last().filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{}{}{}", prefix, NAME_SEPARATOR, name),
            None => name.to_string(),
        };

        match tokens[prev] {
            Token::Close => prefixes.push(qualified),
            Token::Open => {
                keys.insert(qualified);
                // every `[` directly before the first child closes one level
                let closed = tokens[..=prev]
                    .iter()
                    .rev()
                    .take_while(|t| **t == Token::Open)
                    .count();
                for _ in 0..closed {
                    prefixes.pop();
                }
            }
            Token::Name(_) => {
                keys.insert(qualified);
            }
        }
    }

    keys
}
