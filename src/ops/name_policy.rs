//! Path transforms and exclude matching for `create`/`extract`. The
//! transform mini-language's syntax itself is an external collaborator's
//! concern; this module applies an already-parsed substitution.

use std::path::{Component, Path, PathBuf};

pub use super::config::NameTransform;
use super::config::OperationConfig;

trait ApplyTransform {
  fn apply(&self, name: &str) -> String;
}

impl ApplyTransform for NameTransform {
  fn apply(&self, name: &str) -> String {
    if self.global {
      name.replace(self.pattern.as_str(), &self.replacement)
    } else {
      name.replacen(self.pattern.as_str(), &self.replacement, 1)
    }
  }
}

/// Applies every transform in order "apply name
/// transforms" step.
#[must_use]
pub fn apply_transforms(name: &str, transforms: &[NameTransform]) -> String {
  let mut out = name.to_string();
  for t in transforms {
    out = t.apply(&out);
  }
  out
}

/// Drops `count` leading path components
/// `strip_components`. Returns `None` if the path has fewer components
/// than `count`, meaning the entry should be skipped entirely.
#[must_use]
pub fn strip_components(path: &Path, count: u32) -> Option<PathBuf> {
  let mut components = path.components();
  for _ in 0..count {
    components.next()?;
  }
  let remainder: PathBuf = components.collect();
  if remainder.as_os_str().is_empty() {
    None
  } else {
    Some(remainder)
  }
}

/// Strips a leading `/` (and any `..`/`.` components are left to the
/// caller; this only addresses `absolute_names` switch).
#[must_use]
pub fn sanitize_absolute(path: &Path, absolute_names: bool) -> PathBuf {
  if absolute_names {
    return path.to_path_buf();
  }
  path
    .components()
    .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
    .collect()
}

/// Exclude-pattern matching: a pattern matches if it
/// equals the full path, equals the basename, matches via a
/// single-`*`-wildcard prefix/suffix split against either, or is a
/// proper prefix of the path followed by `/`.
#[must_use]
pub fn matches_exclude(path: &str, pattern: &str) -> bool {
  let basename = path.rsplit('/').next().unwrap_or(path);

  if pattern == path || pattern == basename {
    return true;
  }
  if let Some(star) = pattern.find('*') {
    let (prefix, suffix) = (&pattern[..star], &pattern[star + 1..]);
    let wildcard_matches =
      |s: &str| s.len() >= prefix.len() + suffix.len() && s.starts_with(prefix) && s.ends_with(suffix);
    if wildcard_matches(path) || wildcard_matches(basename) {
      return true;
    }
  }
  if let Some(rest) = path.strip_prefix(pattern) {
    if rest.starts_with('/') {
      return true;
    }
  }
  false
}

#[must_use]
pub fn is_excluded(path: &str, patterns: &[String]) -> bool {
  patterns.iter().any(|p| matches_exclude(path, p))
}

/// The name a filesystem `path` will carry in the archive once transforms,
/// `--absolute-names` and the rest of `create`'s naming rules are applied.
/// Shared by `create` (to build the entry) and `update` (to compare a
/// filesystem path against a name already recorded in the archive).
#[must_use]
pub fn archived_name(path: &Path, config: &OperationConfig) -> String {
  let transformed = apply_transforms(&path.to_string_lossy(), &config.transforms);
  sanitize_absolute(Path::new(&transformed), config.absolute_names)
    .to_string_lossy()
    .to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn transform_replaces_first_occurrence_unless_global() {
    let t = NameTransform {
      pattern: "foo".into(),
      replacement: "bar".into(),
      global: false,
    };
    assert_eq!(t.apply("foo/foo/baz"), "bar/foo/baz");
  }

  #[test]
  fn strip_components_drops_leading_parts() {
    let p = Path::new("a/b/c.txt");
    assert_eq!(strip_components(p, 1), Some(PathBuf::from("b/c.txt")));
    assert_eq!(strip_components(p, 3), None);
  }

  #[test]
  fn exclude_matches_full_path_basename_wildcard_and_prefix() {
    assert!(matches_exclude("a/b/c.txt", "c.txt"));
    assert!(matches_exclude("a/b/c.txt", "a/b/c.txt"));
    assert!(matches_exclude("a/b/c.txt", "*.txt"));
    assert!(matches_exclude("a/b/c.txt", "a/b"));
    assert!(!matches_exclude("a/bc.txt", "a/b"));
  }
}
