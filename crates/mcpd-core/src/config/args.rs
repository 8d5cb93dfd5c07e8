//! Normalisation of server argument lists.
//!
//! Argument lists are treated as ordered multisets of tokens:
//! - `--flag` and `--flag=value` are long flags; the flag name is the part
//!   before `=`
//! - `-x` / `-xvalue` are short flags and pass through untouched
//! - anything not starting with `-` is positional
//!
//! The canonical form keeps every valued long flag as a single
//! `--flag=value` token so lists can be merged and filtered by flag name.

use std::collections::{BTreeSet, HashSet};

/// Name of the long flag carried by `token`, without any inline value.
///
/// Returns `None` for short flags and positionals.
pub fn flag_name(token: &str) -> Option<&str> {
    if !token.starts_with("--") || token.len() <= 2 {
        return None;
    }
    Some(token.split_once('=').map_or(token, |(name, _)| name))
}

fn is_flag(token: &str) -> bool {
    token.starts_with('-')
}

/// Canonicalises raw argument tokens.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    bool_flags: BTreeSet<String>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags that never take a value, so a following positional is kept apart.
    pub fn with_bool_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bool_flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Produce the canonical token list.
    ///
    /// `--flag value` becomes `--flag=value` when `value` does not start with
    /// `-` and `--flag` is not a known boolean. Duplicate tokens keep their
    /// first occurrence.
    pub fn normalize<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<String> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;

        while i < tokens.len() {
            let token = tokens[i].as_ref().trim();
            i += 1;
            if token.is_empty() {
                continue;
            }

            let takes_next = token.starts_with("--")
                && !token.contains('=')
                && flag_name(token).is_some()
                && !self.bool_flags.contains(token);

            if takes_next
                && let Some(next) = tokens.get(i).map(|t| t.as_ref().trim())
                && !next.is_empty()
                && !is_flag(next)
            {
                out.push(format!("{}={}", token, next));
                i += 1;
                continue;
            }

            out.push(token.to_string());
        }

        dedup(out)
    }
}

/// Normalise with no known boolean flags.
pub fn normalize<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    Normalizer::new().normalize(tokens)
}

fn dedup(tokens: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

/// Append tokens from `incoming` that are not already in `existing`.
///
/// `existing` keeps its order; new tokens follow in their incoming order.
pub fn merge(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut merged = existing.to_vec();
    for token in incoming {
        if !merged.contains(token) {
            merged.push(token.clone());
        }
    }
    merged
}

/// Remove every token matching one of `names`.
///
/// A long-flag name removes all of its variants (`--flag`, `--flag=value`);
/// any other name removes only tokens equal to it.
pub fn remove_matching_flags<S: AsRef<str>>(list: &[String], names: &[S]) -> Vec<String> {
    let flag_names: HashSet<&str> = names
        .iter()
        .filter_map(|name| flag_name(name.as_ref().trim()))
        .collect();
    let exact: HashSet<&str> = names.iter().map(|name| name.as_ref().trim()).collect();

    list.iter()
        .filter(|token| {
            let matches_flag = flag_name(token).is_some_and(|name| flag_names.contains(name));
            !matches_flag && !exact.contains(token.as_str())
        })
        .cloned()
        .collect()
}

/// Apply `incoming` over `existing` as a set operation.
///
/// Long flags in `incoming` replace every existing variant of the same flag;
/// the first replaced occurrence keeps its slot. Remaining incoming tokens
/// are merged at the end.
pub fn upsert_flags(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut result = Vec::with_capacity(existing.len() + incoming.len());
    let mut placed: HashSet<&str> = HashSet::new();

    for token in existing {
        let Some(name) = flag_name(token) else {
            result.push(token.clone());
            continue;
        };
        let replacements: Vec<&String> = incoming
            .iter()
            .filter(|t| flag_name(t) == Some(name))
            .collect();
        if replacements.is_empty() {
            result.push(token.clone());
        } else if placed.insert(name) {
            result.extend(replacements.into_iter().cloned());
        }
    }

    let result = dedup(result);
    merge(&result, incoming)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn flag_name_forms() {
        assert_eq!(flag_name("--port=8080"), Some("--port"));
        assert_eq!(flag_name("--verbose"), Some("--verbose"));
        assert_eq!(flag_name("-v"), None);
        assert_eq!(flag_name("--"), None);
        assert_eq!(flag_name("server.py"), None);
    }

    #[test]
    fn collapses_flag_followed_by_value() {
        assert_eq!(
            normalize(&["--port", "8080", "--verbose", "--name=x"]),
            v(&["--port=8080", "--verbose", "--name=x"])
        );
    }

    #[test]
    fn does_not_collapse_into_following_flag() {
        assert_eq!(
            normalize(&["--verbose", "--debug", "-x"]),
            v(&["--verbose", "--debug", "-x"])
        );
    }

    #[test]
    fn known_bool_flag_keeps_positional_apart() {
        let normalizer = Normalizer::new().with_bool_flags(["--verbose"]);
        assert_eq!(
            normalizer.normalize(&["--verbose", "server.py"]),
            v(&["--verbose", "server.py"])
        );
        assert_eq!(
            normalize(&["--verbose", "server.py"]),
            v(&["--verbose=server.py"])
        );
    }

    #[test]
    fn short_flags_and_positionals_pass_through() {
        assert_eq!(
            normalize(&["-p", "8080", "-xvalue", "run"]),
            v(&["-p", "8080", "-xvalue", "run"])
        );
    }

    #[test]
    fn dedups_keeping_first() {
        assert_eq!(
            normalize(&["--a=1", "--b", "--a=1", "--b"]),
            v(&["--a=1", "--b"])
        );
    }

    #[test]
    fn merge_appends_absent_only() {
        assert_eq!(
            merge(&v(&["--a=1", "--b"]), &v(&["--b", "--c=3", "--a=2"])),
            v(&["--a=1", "--b", "--c=3", "--a=2"])
        );
    }

    #[test]
    fn remove_matches_all_variants() {
        let list = v(&["--verbose", "--verbose=true", "--port=8080"]);
        assert_eq!(remove_matching_flags(&list, &["--verbose"]), v(&["--port=8080"]));
    }

    #[test]
    fn remove_by_inline_name_uses_flag_name() {
        let list = v(&["--port=1", "--port=2", "--host=x"]);
        assert_eq!(remove_matching_flags(&list, &["--port=1"]), v(&["--host=x"]));
    }

    #[test]
    fn remove_positional_requires_exact_match() {
        let list = v(&["server.py", "server", "--server=x"]);
        assert_eq!(
            remove_matching_flags(&list, &["server"]),
            v(&["server.py", "--server=x"])
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let list = v(&["--a", "--a=1", "pos", "-x", "--b=2"]);
        let names = ["--a", "pos"];
        let once = remove_matching_flags(&list, &names);
        let twice = remove_matching_flags(&once, &names);
        assert_eq!(once, twice);
        assert_eq!(once, v(&["-x", "--b=2"]));
    }

    #[test]
    fn upsert_replaces_in_place() {
        let existing = v(&["--tz=UTC", "--verbose", "--tz=GMT", "--port=1"]);
        let incoming = v(&["--tz=Europe/London", "--new"]);
        assert_eq!(
            upsert_flags(&existing, &incoming),
            v(&["--tz=Europe/London", "--verbose", "--port=1", "--new"])
        );
    }

    #[test]
    fn upsert_with_same_tokens_is_unchanged() {
        let existing = v(&["--a=1", "--b"]);
        assert_eq!(upsert_flags(&existing, &v(&["--b", "--a=1"])), existing);
    }
}
