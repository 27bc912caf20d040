//! Declarative mnemonic classification rules.
//!
//! Each rule pairs a set of accepted prefixes (long and short SCPI forms)
//! with a domain kind and the bounds of its valid index range. Rules are
//! evaluated in table order, first match wins; adding a new domain kind is
//! a new table row, not a new branch.

use super::kind::ParamKind;

/// Generic wildcard marker used by syntax templates and placeholder blocks.
pub const PLACEHOLDER: &str = "<x>";

/// One classification rule: accepted prefixes plus the valid index range.
#[derive(Debug)]
pub struct MnemonicRule {
    /// Domain kind assigned on match.
    pub kind: ParamKind,
    /// Accepted prefixes, uppercase, longest first.
    pub prefixes: &'static [&'static str],
    /// First valid index (0 for digital bits, 1 for everything else).
    pub first_index: u32,
    /// Number of valid indices.
    pub count: u32,
}

/// The ordered rule table. First match wins.
pub const MNEMONIC_RULES: &[MnemonicRule] = &[
    MnemonicRule {
        kind: ParamKind::Channel,
        prefixes: &["CHANNEL", "CHAN", "CH"],
        first_index: 1,
        count: 4,
    },
    MnemonicRule {
        kind: ParamKind::DigitalBit,
        prefixes: &["D"],
        first_index: 0,
        count: 8,
    },
    MnemonicRule {
        kind: ParamKind::Reference,
        prefixes: &["REFERENCE", "REF"],
        first_index: 1,
        count: 4,
    },
    MnemonicRule {
        kind: ParamKind::Math,
        prefixes: &["MATH"],
        first_index: 1,
        count: 4,
    },
    // Two aliased notations for the same eight buses: B1 and BUS1.
    MnemonicRule {
        kind: ParamKind::Bus,
        prefixes: &["BUS", "B"],
        first_index: 1,
        count: 8,
    },
    MnemonicRule {
        kind: ParamKind::Measurement,
        prefixes: &["MEASUREMENT", "MEASU", "MEAS"],
        first_index: 1,
        count: 8,
    },
    MnemonicRule {
        kind: ParamKind::Cursor,
        prefixes: &["CURSOR", "CURS"],
        first_index: 1,
        count: 2,
    },
    MnemonicRule {
        kind: ParamKind::Zoom,
        prefixes: &["ZOOM"],
        first_index: 1,
        count: 1,
    },
    MnemonicRule {
        kind: ParamKind::Search,
        prefixes: &["SEARCH"],
        first_index: 1,
        count: 8,
    },
    MnemonicRule {
        kind: ParamKind::Power,
        prefixes: &["POWER", "POW"],
        first_index: 1,
        count: 8,
    },
    MnemonicRule {
        kind: ParamKind::Histogram,
        prefixes: &["HISTOGRAM", "HIS"],
        first_index: 1,
        count: 4,
    },
    MnemonicRule {
        kind: ParamKind::Callout,
        prefixes: &["CALLOUT", "CALL"],
        first_index: 1,
        count: 4,
    },
    MnemonicRule {
        kind: ParamKind::Mask,
        prefixes: &["MASK"],
        first_index: 1,
        count: 8,
    },
    MnemonicRule {
        kind: ParamKind::Area,
        prefixes: &["AREA"],
        first_index: 1,
        count: 8,
    },
    MnemonicRule {
        kind: ParamKind::Source,
        prefixes: &["SOURCE", "SOUR"],
        first_index: 1,
        count: 2,
    },
    MnemonicRule {
        kind: ParamKind::Edge,
        prefixes: &["EDGE"],
        first_index: 1,
        count: 2,
    },
    MnemonicRule {
        kind: ParamKind::Segment,
        prefixes: &["SEGMENT", "SEG"],
        first_index: 1,
        count: 8,
    },
    MnemonicRule {
        kind: ParamKind::Point,
        prefixes: &["POINT"],
        first_index: 1,
        count: 4,
    },
    MnemonicRule {
        kind: ParamKind::Table,
        prefixes: &["TABLE", "TAB"],
        first_index: 1,
        count: 4,
    },
    MnemonicRule {
        kind: ParamKind::View,
        prefixes: &["VIEW"],
        first_index: 1,
        count: 4,
    },
    MnemonicRule {
        kind: ParamKind::Function,
        prefixes: &["FUNCTION", "FUNC"],
        first_index: 1,
        count: 2,
    },
    MnemonicRule {
        kind: ParamKind::Output,
        prefixes: &["OUTPUT", "OUTP"],
        first_index: 1,
        count: 2,
    },
    MnemonicRule {
        kind: ParamKind::Plot,
        prefixes: &["PLOT"],
        first_index: 1,
        count: 4,
    },
];

/// A successful rule match for one token.
#[derive(Debug)]
pub struct RuleMatch {
    /// The rule that matched.
    pub rule: &'static MnemonicRule,
    /// The matched prefix, uppercased (`"CH"`, `"BUS"`, `"B"`).
    pub prefix: String,
    /// Concrete index digits, or `None` for a `<x>` placeholder.
    pub index: Option<u32>,
    /// Digital-group suffix bit index for channel tokens (`CH1_D3`); `None`
    /// when absent, `Some(None)` for a placeholder bit (`CH1_D<x>`).
    pub digital_bit: Option<Option<u32>>,
}

impl RuleMatch {
    /// `true` when either index position holds the `<x>` wildcard.
    pub fn is_placeholder(&self) -> bool {
        self.index.is_none() || self.digital_bit == Some(None)
    }

    /// Generate the bounded option list for this match.
    ///
    /// Options keep the notation the token used (`B3` stays in `B` form,
    /// `BUS3` in `BUS` form). A channel with a digital-group suffix
    /// enumerates its eight bit lines instead of the four analog channels.
    pub fn options(&self) -> Vec<String> {
        if self.digital_bit.is_some() {
            let ch = self.index.unwrap_or(1);
            return (0..8).map(|i| format!("{}{ch}_D{i}", self.prefix)).collect();
        }
        let first = self.rule.first_index;
        (first..first + self.rule.count)
            .map(|i| format!("{}{i}", self.prefix))
            .collect()
    }

    /// The default option for a placeholder token: the option with numeric
    /// index 1 (`CH1`, `B1`, and `D1` for zero-based digital bits).
    pub fn default_option(&self) -> String {
        let options = self.options();
        let first = if self.digital_bit.is_some() {
            0
        } else {
            self.rule.first_index
        };
        let pos = (1usize.saturating_sub(first as usize)).min(options.len() - 1);
        options[pos].clone()
    }
}

/// Try the ordered rule table against a token. First match wins.
pub fn match_mnemonic(token: &str) -> Option<RuleMatch> {
    let upper = token.to_ascii_uppercase();
    for rule in MNEMONIC_RULES {
        for &prefix in rule.prefixes {
            let Some(rest) = upper.strip_prefix(prefix) else {
                continue;
            };
            let Some((index, rest)) = take_index(rest) else {
                continue;
            };
            if rest.is_empty() {
                return Some(RuleMatch {
                    rule,
                    prefix: prefix.to_string(),
                    index,
                    digital_bit: None,
                });
            }
            // Digital-group suffix is only meaningful on channels.
            if rule.kind == ParamKind::Channel
                && let Some(rest) = rest.strip_prefix("_D")
                && let Some((bit, rest)) = take_index(rest)
                && rest.is_empty()
            {
                return Some(RuleMatch {
                    rule,
                    prefix: prefix.to_string(),
                    index,
                    digital_bit: Some(bit),
                });
            }
        }
    }
    None
}

/// Whether a token has the shape of a known indexed mnemonic.
pub fn looks_indexed(token: &str) -> bool {
    match_mnemonic(token).is_some()
}

/// Consume a concrete index (digits) or the `<x>` placeholder from the
/// front of `rest`. Returns `None` when neither is present.
fn take_index(rest: &str) -> Option<(Option<u32>, &str)> {
    if let Some(after) = rest.strip_prefix("<X>") {
        return Some((None, after));
    }
    let digits: &str = rest.split(|c: char| !c.is_ascii_digit()).next().unwrap_or("");
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<u32>().ok()?;
    Some((Some(value), &rest[digits.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_match() {
        let m = match_mnemonic("CH1").unwrap();
        assert_eq!(m.rule.kind, ParamKind::Channel);
        assert_eq!(m.index, Some(1));
        assert_eq!(m.options(), vec!["CH1", "CH2", "CH3", "CH4"]);
    }

    #[test]
    fn channel_long_form() {
        let m = match_mnemonic("CHANnel3").unwrap();
        assert_eq!(m.rule.kind, ParamKind::Channel);
        assert_eq!(m.index, Some(3));
    }

    #[test]
    fn channel_placeholder_defaults_to_index_one() {
        let m = match_mnemonic("CH<x>").unwrap();
        assert!(m.is_placeholder());
        assert_eq!(m.default_option(), "CH1");
        assert_eq!(m.options().len(), 4);
    }

    #[test]
    fn channel_digital_group_has_eight_options() {
        let m = match_mnemonic("CH1_D3").unwrap();
        assert_eq!(m.rule.kind, ParamKind::Channel);
        assert_eq!(m.digital_bit, Some(Some(3)));
        let opts = m.options();
        assert_eq!(opts.len(), 8);
        assert_eq!(opts[0], "CH1_D0");
        assert_eq!(opts[7], "CH1_D7");
    }

    #[test]
    fn bus_aliased_notations() {
        let short = match_mnemonic("B3").unwrap();
        assert_eq!(short.rule.kind, ParamKind::Bus);
        assert_eq!(short.options().len(), 8);
        assert_eq!(short.options()[0], "B1");

        let long = match_mnemonic("BUS3").unwrap();
        assert_eq!(long.rule.kind, ParamKind::Bus);
        assert_eq!(long.options()[7], "BUS8");
    }

    #[test]
    fn cursor_has_two_options_zoom_one() {
        assert_eq!(match_mnemonic("CURSOR1").unwrap().options().len(), 2);
        assert_eq!(match_mnemonic("ZOOM1").unwrap().options(), vec!["ZOOM1"]);
    }

    #[test]
    fn digital_bit_indexed_from_zero() {
        let m = match_mnemonic("D0").unwrap();
        assert_eq!(m.rule.kind, ParamKind::DigitalBit);
        let opts = m.options();
        assert_eq!(opts.len(), 8);
        assert_eq!(opts[0], "D0");
        assert_eq!(opts[7], "D7");
        assert_eq!(match_mnemonic("D<x>").unwrap().default_option(), "D1");
    }

    #[test]
    fn non_indexed_words_do_not_match() {
        assert!(match_mnemonic("ACQuire").is_none());
        assert!(match_mnemonic("STATE").is_none());
        assert!(match_mnemonic("DISPLAY").is_none());
    }

    #[test]
    fn digits_must_follow_prefix_immediately() {
        assert!(match_mnemonic("DATA1").is_none());
        assert!(match_mnemonic("CHX").is_none());
    }
}
