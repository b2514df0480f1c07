use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::WagsError;

/// Short identifier of a data source. Names the cache subdirectory and
/// prefixes every cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct SourceName(String);

impl SourceName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SourceName {
    type Err = WagsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
        if !is_valid {
            return Err(WagsError::InvalidSourceName(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for SourceName {
    type Error = WagsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Provider-defined release identifier (a release number, a dated tag, ...).
///
/// Versions end up inside cache filenames, so anything that could escape the
/// source directory is rejected. Ordering is version-aware, see
/// [`compare_natural`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Version(String);

impl Version {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = WagsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && normalized != "."
            && normalized != ".."
            && !normalized
                .chars()
                .any(|ch| ch == '/' || ch == '\\' || ch.is_control() || ch.is_whitespace());
        if !is_valid {
            return Err(WagsError::InvalidVersion(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

impl TryFrom<String> for Version {
    type Error = WagsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_natural(&self.0, &other.0)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two identifiers treating runs of ASCII digits as numbers.
///
/// Zero-padded dates order the same as plain lexicographic order, while
/// unpadded release numbers (`chembl_9` vs `chembl_10`) order numerically.
/// Ties such as `v01` / `v1` fall back to byte order so the result is total.
pub fn compare_natural(left: &str, right: &str) -> Ordering {
    let mut lhs = left.as_bytes();
    let mut rhs = right.as_bytes();
    loop {
        match (lhs.first(), rhs.first()) {
            (None, None) => return left.cmp(right),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) if a.is_ascii_digit() && b.is_ascii_digit() => {
                let (l_digits, l_rest) = split_digits(lhs);
                let (r_digits, r_rest) = split_digits(rhs);
                let l_trimmed = trim_leading_zeros(l_digits);
                let r_trimmed = trim_leading_zeros(r_digits);
                let ordering = l_trimmed
                    .len()
                    .cmp(&r_trimmed.len())
                    .then_with(|| l_trimmed.cmp(r_trimmed));
                if ordering != Ordering::Equal {
                    return ordering;
                }
                lhs = l_rest;
                rhs = r_rest;
            }
            (Some(a), Some(b)) => {
                if a != b {
                    return a.cmp(b);
                }
                lhs = &lhs[1..];
                rhs = &rhs[1..];
            }
        }
    }
}

fn split_digits(input: &[u8]) -> (&[u8], &[u8]) {
    let end = input
        .iter()
        .position(|byte| !byte.is_ascii_digit())
        .unwrap_or(input.len());
    input.split_at(end)
}

fn trim_leading_zeros(digits: &[u8]) -> &[u8] {
    let start = digits
        .iter()
        .position(|byte| *byte != b'0')
        .unwrap_or(digits.len());
    &digits[start..]
}

/// Sources shipped with the crate, selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KnownSource {
    Mondo,
    Chembl,
}

impl fmt::Display for KnownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnownSource::Mondo => write!(f, "mondo"),
            KnownSource::Chembl => write!(f, "chembl"),
        }
    }
}
