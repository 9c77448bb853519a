// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::collections::{HashMap, HashSet};
use std::fmt;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// A parsed docker image reference
///
/// The `Display` impl may be used to convert a parsed image back to a plain
/// string:
/// ```
/// use dockerfile_analyzer::ImageRef;
///
/// let image = ImageRef::parse("quay.io/prometheus/node-exporter:v0.18.1");
/// assert_eq!(image.registry, Some("quay.io".to_string()));
/// assert_eq!(image.image, "prometheus/node-exporter");
/// assert_eq!(image.tag, Some("v0.18.1".to_string()));
/// assert_eq!(image.to_string(), "quay.io/prometheus/node-exporter:v0.18.1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
  /// an optional registry, generally Docker Hub if unset
  pub registry: Option<String>,

  /// an image string, possibly including a user or organization name
  pub image: String,

  /// An optional image tag (after the colon, e.g. `:1.2.3`), generally inferred
  /// to mean `:latest` if unset
  pub tag: Option<String>,

  /// An optional embedded image digest, e.g. `sha256:...`. Conflicts with `tag`.
  pub hash: Option<String>
}

/// Determines if the first path component of an image refers to a registry
/// hostname: `localhost`, or anything containing a `.` or a port.
fn is_registry(component: &str) -> bool {
  component == "localhost" || component.contains('.') || component.contains(':')
}

lazy_static! {
  static ref VAR: Regex = Regex::new(
    r"\$(?:([A-Za-z_][A-Za-z0-9_]*)|\{([A-Za-z_][A-Za-z0-9_]*)(?::([-+])([^}]*))?\})"
  ).unwrap();
}

/// Given a map of variables, substitutes `$NAME`, `${NAME}`, `${NAME:-word}`
/// and `${NAME:+word}` references in `s`.
///
/// Values may themselves contain references, up to `max_recursion_depth`
/// levels deep. Names of every variable used are added to `used_vars`.
///
/// Returns None if a referenced variable is undefined (and has no `:-`
/// fallback) or the recursion depth is exceeded.
pub fn substitute(
  s: &str,
  vars: &HashMap<&str, &str>,
  used_vars: &mut HashSet<String>,
  max_recursion_depth: u8
) -> Option<String> {
  let mut out = String::with_capacity(s.len());
  let mut last = 0;

  for caps in VAR.captures_iter(s) {
    if max_recursion_depth == 0 {
      return None;
    }

    let full = caps.get(0)?;
    out.push_str(&s[last..full.start()]);
    out.push_str(&substitute_one(&caps, vars, used_vars, max_recursion_depth)?);
    last = full.end();
  }

  out.push_str(&s[last..]);
  Some(out)
}

fn substitute_one(
  caps: &Captures,
  vars: &HashMap<&str, &str>,
  used_vars: &mut HashSet<String>,
  max_recursion_depth: u8
) -> Option<String> {
  let name = caps.get(1).or_else(|| caps.get(2))?.as_str();
  let modifier = caps.get(3).map(|m| m.as_str());
  let word = caps.get(4).map(|m| m.as_str()).unwrap_or("");

  let value = match vars.get(name) {
    Some(value) => {
      used_vars.insert(name.to_string());
      if modifier == Some("+") { word } else { *value }
    },
    None => match modifier {
      Some("-") => word,
      Some(_) => "",
      None => return None
    }
  };

  substitute(value, vars, used_vars, max_recursion_depth.saturating_sub(1))
}

impl ImageRef {
  /// Parses an `ImageRef` from a string.
  ///
  /// This is not fallible, however malformed image strings may return
  /// unexpected results.
  pub fn parse(s: &str) -> ImageRef {
    // `host/foo` is ambiguous with a Docker Hub organization, so only
    // `localhost` or components with a `.` or `:` count as registries
    let (registry, rest) = match s.find('/') {
      Some(i) if is_registry(&s[..i]) => (Some(s[..i].to_string()), &s[i + 1..]),
      _ => (None, s)
    };

    if let Some(at) = rest.find('@') {
      return ImageRef {
        registry,
        image: rest[..at].to_string(),
        tag: None,
        hash: Some(rest[at + 1..].to_string())
      };
    }

    match rest.find(':') {
      Some(colon) => ImageRef {
        registry,
        image: rest[..colon].to_string(),
        tag: Some(rest[colon + 1..].to_string()),
        hash: None
      },
      None => ImageRef {
        registry,
        image: rest.to_string(),
        tag: None,
        hash: None
      }
    }
  }

  /// Whether this reference implies the `latest` tag: no tag and no digest.
  pub fn is_implicit_latest(&self) -> bool {
    self.tag.is_none() && self.hash.is_none()
  }

  /// Substitutes variable references in this image using the given
  /// variables, returning the resolved image and the names used.
  pub fn resolve_vars(&self, vars: &HashMap<&str, &str>) -> Option<(ImageRef, HashSet<String>)> {
    let mut used_vars = HashSet::new();
    let s = substitute(&self.to_string(), vars, &mut used_vars, 16)?;

    Some((ImageRef::parse(&s), used_vars))
  }
}

impl fmt::Display for ImageRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(registry) = &self.registry {
      write!(f, "{}/", registry)?;
    }

    write!(f, "{}", self.image)?;

    if let Some(tag) = &self.tag {
      write!(f, ":{}", tag)?;
    } else if let Some(hash) = &self.hash {
      write!(f, "@{}", hash)?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn image(registry: Option<&str>, image: &str, tag: Option<&str>, hash: Option<&str>) -> ImageRef {
    ImageRef {
      registry: registry.map(String::from),
      image: image.into(),
      tag: tag.map(String::from),
      hash: hash.map(String::from)
    }
  }

  #[test]
  fn parse_docker_hub() {
    assert_eq!(ImageRef::parse("alpine:3.10"), image(None, "alpine", Some("3.10"), None));
    assert_eq!(ImageRef::parse("clux/muslrust"), image(None, "clux/muslrust", None, None));
    assert_eq!(
      ImageRef::parse("org/app@sha256:abc"),
      image(None, "org/app", None, Some("sha256:abc"))
    );
    assert_eq!(ImageRef::parse("org/app@"), image(None, "org/app", None, Some("")));
  }

  #[test]
  fn parse_registry() {
    assert_eq!(
      ImageRef::parse("gcr.io/project/app:v1"),
      image(Some("gcr.io"), "project/app", Some("v1"), None)
    );
    assert_eq!(
      ImageRef::parse("localhost/foo/bar"),
      image(Some("localhost"), "foo/bar", None, None)
    );
    assert_eq!(
      ImageRef::parse("example.com:1234/foo/bar/baz:qux"),
      image(Some("example.com:1234"), "foo/bar/baz", Some("qux"), None)
    );
    assert_eq!(ImageRef::parse("host/foo"), image(None, "host/foo", None, None));
  }

  #[test]
  fn implicit_latest() {
    assert!(ImageRef::parse("ubuntu").is_implicit_latest());
    assert!(!ImageRef::parse("ubuntu:22.04").is_implicit_latest());
    assert!(!ImageRef::parse("ubuntu@sha256:0").is_implicit_latest());
  }

  #[test]
  fn substitution() {
    let mut vars = HashMap::new();
    vars.insert("foo", "bar");
    vars.insert("nested", "${foo}");
    vars.insert("loop1", "$loop2");
    vars.insert("loop2", "$loop1");

    let mut used = HashSet::new();
    assert_eq!(substitute("a $foo ${nested}", &vars, &mut used, 16).as_deref(), Some("a bar bar"));
    assert_eq!(used.len(), 2);

    let mut used = HashSet::new();
    assert_eq!(substitute("$missing", &vars, &mut used, 16), None);
    assert_eq!(substitute("${missing:-dflt}", &vars, &mut used, 16).as_deref(), Some("dflt"));
    assert_eq!(substitute("${missing:+alt}", &vars, &mut used, 16).as_deref(), Some(""));
    assert_eq!(substitute("${foo:+alt}", &vars, &mut used, 16).as_deref(), Some("alt"));
    assert_eq!(substitute("$loop1", &vars, &mut used, 16), None);
    assert_eq!(substitute("$foo", &vars, &mut used, 0), None);
  }

  #[test]
  fn resolve_vars() {
    let mut vars = HashMap::new();
    vars.insert("base", "alpine");
    vars.insert("tag", "3.12");

    let (resolved, used) = ImageRef::parse("${base}:${tag}").resolve_vars(&vars).unwrap();
    assert_eq!(resolved, ImageRef::parse("alpine:3.12"));
    assert!(used.contains("base") && used.contains("tag"));
  }
}
