//! Unit conversion between SI (base 1000) and binary (base 1024) prefixed
//! units.
//!
//! Quantities arrive from the inventory layer in whatever unit the provider
//! reports (`KB`, `MiB`, ...). Normalizing them to a common base before they
//! are aggregated keeps measures comparable without accumulating rounding
//! error: the distance between two prefixes is an exact rational, and only a
//! cross-family conversion (e.g. `PB` to `TiB`) degrades to the nearest
//! IEEE-754 value.

use num_rational::Ratio;

use crate::error::{Error, Result};

/// Base unit symbols recognized after a prefix is stripped.
pub const SYMBOLS: &[&str] = &["B", "b", "bps", "Hz", "W"];

/// SI prefixes and their multiplicative distance from the base unit.
pub const SI_PREFIX: &[(&str, i128)] = &[
    ("", 1),
    ("K", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
    ("P", 1_000_000_000_000_000),
    ("E", 1_000_000_000_000_000_000),
    ("Z", 1_000_000_000_000_000_000_000),
    ("Y", 1_000_000_000_000_000_000_000_000),
];

/// Binary prefixes, powers of 1024.
pub const BINARY_PREFIX: &[(&str, i128)] = &[
    ("", 1),
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
    ("Pi", 1 << 50),
    ("Ei", 1 << 60),
    ("Zi", 1 << 70),
    ("Yi", 1 << 80),
];

/// Which prefix table lookups run against. `All` is the union of both.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PrefixFamily {
    Si,
    Binary,
    #[default]
    All,
}

impl PrefixFamily {
    fn value_of(self, prefix: &str) -> Option<i128> {
        let lookup = |table: &[(&str, i128)]| {
            table
                .iter()
                .find(|(sym, _)| *sym == prefix)
                .map(|(_, value)| *value)
        };
        match self {
            PrefixFamily::Si => lookup(SI_PREFIX),
            PrefixFamily::Binary => lookup(BINARY_PREFIX),
            PrefixFamily::All => lookup(SI_PREFIX).or_else(|| lookup(BINARY_PREFIX)),
        }
    }

    /// Candidate prefixes, longest first, so `KiB` resolves to `Ki` + `B`
    /// and never to `K` + `iB`.
    fn prefixes(self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = match self {
            PrefixFamily::Si => SI_PREFIX.iter().map(|(sym, _)| *sym).collect(),
            PrefixFamily::Binary => BINARY_PREFIX.iter().map(|(sym, _)| *sym).collect(),
            PrefixFamily::All => SI_PREFIX
                .iter()
                .chain(BINARY_PREFIX.iter())
                .map(|(sym, _)| *sym)
                .collect(),
        };
        out.sort_by_key(|sym| std::cmp::Reverse(sym.len()));
        out
    }
}

/// Splits a unit string and returns its prefix.
///
/// The longest known prefix of the family wins, provided the remainder is a
/// recognized base symbol. A bare base symbol (or a missing unit) maps to the
/// empty prefix; a string that matches nothing is returned unchanged.
pub fn extract_prefix(unit: Option<&str>, family: PrefixFamily) -> String {
    let unit = match unit {
        Some(u) if !u.is_empty() => u,
        _ => return String::new(),
    };
    if SYMBOLS.contains(&unit) {
        return String::new();
    }
    for prefix in family.prefixes() {
        if prefix.is_empty() {
            continue;
        }
        if let Some(rest) = unit.strip_prefix(prefix) {
            if SYMBOLS.contains(&rest) {
                return prefix.to_string();
            }
        }
    }
    unit.to_string()
}

/// Exact ratio `value(origin) / value(destination)` between two prefixes,
/// or `None` when either prefix is unknown in the family.
pub fn distance(origin: &str, destination: &str, family: PrefixFamily) -> Option<Ratio<i128>> {
    let from = family.value_of(origin)?;
    let to = family.value_of(destination)?;
    Some(Ratio::new(from, to))
}

/// Converts `value` from one unit string to another.
///
/// Both units are parsed with [`extract_prefix`]; an unknown unit on either
/// side is an error. Within one family the ratio is exact; across families
/// the result is the closest `f64` to `value * (1000^a / 1024^b)`.
pub fn to_unit(value: f64, from_unit: &str, to_unit: &str, family: PrefixFamily) -> Result<f64> {
    let from_prefix = extract_prefix(Some(from_unit), family);
    let to_prefix = extract_prefix(Some(to_unit), family);
    let ratio = distance(&from_prefix, &to_prefix, family).ok_or_else(|| {
        if family.value_of(&from_prefix).is_none() {
            Error::UnknownUnit(from_unit.to_string())
        } else {
            Error::UnknownUnit(to_unit.to_string())
        }
    })?;
    Ok(value * *ratio.numer() as f64 / *ratio.denom() as f64)
}
