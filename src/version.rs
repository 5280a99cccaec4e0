//! Version strings of nodes and model references.
//!
//! A version is one of three shapes, each with its own bump rule:
//! strict semver (`1.2.3-rc.1+build`), a loose triple of digit groups that is
//! not strict semver (`01.2.3`), or anything else.

use once_cell::sync::Lazy;
use regex::Regex;

static SEMVER: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
  )
  .expect("valid semver pattern")
});

static LOOSE_TRIPLE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").expect("valid triple pattern"));

/// Suffix appended to versions that cannot be bumped.
pub const ADAPTED_SUFFIX: &str = "-adapted";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionShape {
  Semantic { major: u64, minor: u64 },
  /// Three digit groups; `major` is kept verbatim.
  LooseTriple { major: String, minor: u64 },
  Unparseable,
}

impl VersionShape {
  pub fn classify(version: &str) -> Self {
    if let Some(c) = SEMVER.captures(version) {
      let major = c[1].parse::<u64>();
      let minor = c[2].parse::<u64>();
      if let (Ok(major), Ok(minor)) = (major, minor) {
        return VersionShape::Semantic { major, minor };
      }
    }
    if let Some(c) = LOOSE_TRIPLE.captures(version) {
      if let Ok(minor) = c[2].parse::<u64>() {
        return VersionShape::LooseTriple {
          major: c[1].to_string(),
          minor,
        };
      }
    }
    VersionShape::Unparseable
  }
}

/// Next minor version: `1.2.3-rc+b` -> `1.3.0`, `01.2.3` -> `01.3.0`,
/// anything else -> `<version>-adapted`. A minor that cannot be incremented
/// also takes the `-adapted` form.
pub fn bump_minor(version: &str) -> String {
  let bumped = match VersionShape::classify(version) {
    VersionShape::Semantic { major, minor } => minor
      .checked_add(1)
      .map(|minor| format!("{}.{}.0", major, minor)),
    VersionShape::LooseTriple { major, minor } => minor
      .checked_add(1)
      .map(|minor| format!("{}.{}.0", major, minor)),
    VersionShape::Unparseable => None,
  };
  bumped.unwrap_or_else(|| format!("{}{}", version, ADAPTED_SUFFIX))
}

/// Splits `name_vX` at the last `_v` when the remainder starts with a digit.
pub fn split_version_suffix(id: &str) -> Option<(&str, &str)> {
  let idx = id.rfind("_v")?;
  let rest = &id[idx + 2..];
  if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
    Some((&id[..idx], rest))
  } else {
    None
  }
}

/// Replaces the version suffix of `id` with `new_version`, or appends
/// `_v<new_version>` when `id` has none.
pub fn with_version_suffix(id: &str, new_version: &str) -> String {
  match split_version_suffix(id) {
    Some((prefix, _)) => format!("{}_v{}", prefix, new_version),
    None => format!("{}_v{}", id, new_version),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classifies_three_shapes() {
    assert_eq!(
      VersionShape::classify("1.2.3"),
      VersionShape::Semantic { major: 1, minor: 2 }
    );
    assert_eq!(
      VersionShape::classify("1.2.3-rc.1+build.5"),
      VersionShape::Semantic { major: 1, minor: 2 }
    );
    assert_eq!(
      VersionShape::classify("01.2.3"),
      VersionShape::LooseTriple {
        major: "01".to_string(),
        minor: 2
      }
    );
    assert_eq!(VersionShape::classify("v2"), VersionShape::Unparseable);
    assert_eq!(VersionShape::classify("1.2"), VersionShape::Unparseable);
  }

  #[test]
  fn bump_minor_per_shape() {
    assert_eq!(bump_minor("1.0.0"), "1.1.0");
    assert_eq!(bump_minor("1.1.0"), "1.2.0");
    assert_eq!(bump_minor("2.9.7-beta+sha"), "2.10.0");
    assert_eq!(bump_minor("01.2.3"), "01.3.0");
    assert_eq!(bump_minor("1.02.3"), "1.3.0");
    assert_eq!(bump_minor("latest"), "latest-adapted");
  }

  #[test]
  fn bump_minor_at_u64_max_falls_back_to_suffix() {
    let max = format!("1.{}.0", u64::MAX);
    assert_eq!(
      VersionShape::classify(&max),
      VersionShape::Semantic {
        major: 1,
        minor: u64::MAX
      }
    );
    assert_eq!(bump_minor(&max), format!("{}-adapted", max));
    let loose = format!("01.{}.0", u64::MAX);
    assert_eq!(bump_minor(&loose), format!("{}-adapted", loose));
  }

  #[test]
  fn version_suffix_is_replaced_or_appended() {
    assert_eq!(with_version_suffix("forecast_v1.0.0", "1.1.0"), "forecast_v1.1.0");
    assert_eq!(with_version_suffix("a_vendor_v2.0.0", "2.1.0"), "a_vendor_v2.1.0");
    assert_eq!(with_version_suffix("plain", "1.1.0"), "plain_v1.1.0");
    assert_eq!(with_version_suffix("my_vendor", "1.1.0"), "my_vendor_v1.1.0");
  }
}
