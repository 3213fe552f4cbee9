//! Expansion of the placeholder mini-language used inside payment detail and
//! instruction pools.
//!
//! Supported directives:
//! - `{number:MIN:MAX}` - uniform integer in `[MIN, MAX]` (bounds are swapped when reversed)
//! - `{string:LEN}` - `LEN` random characters from `A-Z0-9`
//!
//! Anything else between braces is copied through literally.

use crate::utils::{random_string, ALPHANUMERIC};
use rand::Rng;

/// Directive lengths above this are treated as malformed and left literal.
pub const MAX_STRING_DIRECTIVE_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Number { min: i64, max: i64 },
    String { length: usize },
}

impl Directive {
    /// Parses the text between `{` and `}`.
    pub fn parse(inner: &str) -> Option<Self> {
        let mut parts = inner.split(':');
        let kind = parts.next()?;
        let args: Vec<&str> = parts.collect();

        match (kind, args.as_slice()) {
            ("number", [min, max]) => {
                let min: i64 = min.trim().parse().ok()?;
                let max: i64 = max.trim().parse().ok()?;
                if min <= max {
                    Some(Directive::Number { min, max })
                } else {
                    Some(Directive::Number { min: max, max: min })
                }
            }
            ("string", [length]) => {
                let length: usize = length.trim().parse().ok()?;
                if length > MAX_STRING_DIRECTIVE_LEN {
                    return None;
                }
                Some(Directive::String { length })
            }
            _ => None,
        }
    }

    pub fn render<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        match *self {
            Directive::Number { min, max } => rng.gen_range(min..=max).to_string(),
            Directive::String { length } => random_string(rng, length, ALPHANUMERIC),
        }
    }
}

/// Resolves every directive in `template`, left to right, exactly once each.
/// Generated text is never rescanned.
pub fn expand_directives<R: Rng + ?Sized>(template: &str, rng: &mut R) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let candidate = &rest[open..];

        let Some(close) = candidate.find('}') else {
            output.push_str(candidate);
            return output;
        };

        match Directive::parse(&candidate[1..close]) {
            Some(directive) => {
                output.push_str(&directive.render(rng));
                rest = &candidate[close + 1..];
            }
            None => {
                // Not a directive: emit the brace and rescan from the next character,
                // so a directive nested after a stray `{` is still found.
                output.push('{');
                rest = &candidate[1..];
            }
        }
    }

    output.push_str(rest);
    output
}
