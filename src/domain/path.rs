//! Portable path contraction and expansion
//!
//! Save locations are stored in "contracted" form: the longest
//! environment-variable value that prefixes the absolute path is replaced
//! with its token (`%USERPROFILE%` on Windows, `$HOME` elsewhere), keeping
//! profiles portable across machines and user accounts.
//!
//! Expansion is total: unresolved tokens pass through literally and simply
//! fail later existence checks. Contraction is lossy-safe: with no matching
//! variable the literal absolute path is returned unchanged.

use std::collections::HashMap;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Minimum length for an environment value to be a contraction candidate.
/// Filters out noise like `/` or drive roots, as short values would win
/// prefix matches for nearly every path.
const MIN_CANDIDATE_LEN: usize = 4;

/// Strips `file://` URL prefixes and surrounding whitespace from a
/// user-supplied path (drag-and-drop and copy-paste often carry both).
pub fn clean_input_path(raw: &str) -> String {
    let clean = raw.trim();
    let clean = if clean.to_lowercase().starts_with("file://") {
        &clean[7..]
    } else {
        clean
    };
    // file:///C:/... leaves /C:/...; drop the slash before a drive letter
    let bytes = clean.as_bytes();
    let clean = if bytes.len() >= 3 && bytes[0] == b'/' && bytes[2] == b':' {
        &clean[1..]
    } else {
        clean
    };
    clean.trim_end_matches(['/', '\\']).to_string()
}

/// A snapshot of environment variables used for contraction and expansion.
///
/// Both operations are deterministic for a given snapshot; production code
/// captures the live environment once per invocation, tests supply fixtures.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Captures the current process environment; entries that are not
    /// valid UTF-8 cannot appear in tokens and are dropped
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Builds a snapshot from explicit variables (test fixtures)
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Looks up a raw variable value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Replaces the longest matching environment-value prefix of
    /// `abs_path` with its variable token.
    ///
    /// Only variables whose values are existing paths of at least
    /// [`MIN_CANDIDATE_LEN`] characters are considered; ties are broken by
    /// preferring the most specific (longest) value, then variable name.
    /// With no match the path is returned unchanged.
    pub fn contract(&self, abs_path: &str) -> String {
        if abs_path.is_empty() {
            return String::new();
        }

        let mut candidates: Vec<(&str, &str)> = self
            .vars
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str().trim_end_matches(['/', '\\'])))
            .filter(|(_, v)| v.len() >= MIN_CANDIDATE_LEN && Path::new(v).exists())
            .collect();
        candidates.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(b.0)));

        let norm_path = normalize_case(abs_path);
        for (name, value) in candidates {
            let norm_value = normalize_case(value);
            if !norm_path.starts_with(&norm_value) {
                continue;
            }
            let remaining = &abs_path[value.len()..];
            if remaining.is_empty() {
                return token(name);
            }
            if remaining.starts_with(['/', '\\']) {
                let rest = remaining.trim_start_matches(['/', '\\']);
                return format!("{}{}{}", token(name), MAIN_SEPARATOR, rest);
            }
            // Prefix match without a path boundary (e.g. /home/user vs
            // /home/username); keep looking.
        }

        abs_path.to_string()
    }

    /// Expands every recognized variable token in `contracted` and returns
    /// the absolute path. Never fails: unresolved tokens stay literal, so a
    /// stale contracted path surfaces as a missing folder downstream.
    ///
    /// Both `%VAR%` and `$VAR`/`${VAR}` forms are accepted on every
    /// platform, since config files travel between machines. A leading `~`
    /// resolves to the home directory when known.
    pub fn expand(&self, contracted: &str) -> PathBuf {
        let chars: Vec<char> = contracted.chars().collect();
        let mut out = String::with_capacity(contracted.len());
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '%' => {
                    if let Some(end) = find_percent_end(&chars, i + 1) {
                        let name: String = chars[i + 1..end].iter().collect();
                        if let Some(value) = self.vars.get(&name) {
                            out.push_str(value);
                            i = end + 1;
                            continue;
                        }
                    }
                    out.push('%');
                    i += 1;
                }
                '$' => {
                    let (name, end) = read_dollar_name(&chars, i + 1);
                    match name.and_then(|n| self.vars.get(&n).map(|v| (v, end))) {
                        Some((value, end)) => {
                            out.push_str(value);
                            i = end;
                        }
                        None => {
                            out.push('$');
                            i += 1;
                        }
                    }
                }
                c => {
                    out.push(c);
                    i += 1;
                }
            }
        }

        PathBuf::from(self.expand_home(&out))
    }

    fn expand_home(&self, path: &str) -> String {
        if path != "~" && !path.starts_with("~/") && !path.starts_with("~\\") {
            return path.to_string();
        }
        let home = self
            .vars
            .get("HOME")
            .or_else(|| self.vars.get("USERPROFILE"));
        match home {
            Some(home) => format!("{}{}", home, &path[1..]),
            None => path.to_string(),
        }
    }
}

/// Formats a variable reference in the platform's native syntax
fn token(name: &str) -> String {
    #[cfg(windows)]
    {
        format!("%{}%", name)
    }
    #[cfg(not(windows))]
    {
        format!("${}", name)
    }
}

/// Case folding for prefix comparison: Windows paths compare
/// case-insensitively with `/` and `\` interchangeable.
fn normalize_case(path: &str) -> String {
    #[cfg(windows)]
    {
        path.to_lowercase().replace('/', "\\")
    }
    #[cfg(not(windows))]
    {
        path.to_string()
    }
}

/// Finds the closing `%` of a `%VAR%` token, requiring a non-empty name
fn find_percent_end(chars: &[char], start: usize) -> Option<usize> {
    let end = chars[start..].iter().position(|&c| c == '%')? + start;
    (end > start).then_some(end)
}

/// Reads a `$VAR` or `${VAR}` name; returns the name and the index just
/// past it, or `None` when no valid name follows the `$`
fn read_dollar_name(chars: &[char], start: usize) -> (Option<String>, usize) {
    if chars.get(start) == Some(&'{') {
        if let Some(close) = chars[start + 1..].iter().position(|&c| c == '}') {
            let end = start + 1 + close;
            if end > start + 1 {
                return (Some(chars[start + 1..end].iter().collect()), end + 1);
            }
        }
        return (None, start);
    }

    let mut end = start;
    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    if end == start {
        (None, start)
    } else {
        (Some(chars[start..end].iter().collect()), end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sep() -> char {
        MAIN_SEPARATOR
    }

    #[test]
    fn contract_replaces_longest_prefix() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_str().unwrap().to_string();
        let nested = dir.path().join("saves");
        std::fs::create_dir_all(&nested).unwrap();

        let env = EnvSnapshot::from_vars([
            ("BASE".to_string(), base.clone()),
            ("SAVES".to_string(), nested.to_str().unwrap().to_string()),
        ]);

        let target = format!("{}{}saves{}Game", base, sep(), sep());
        let contracted = env.contract(&target);

        // SAVES is the longer value, so it wins over BASE
        assert!(
            contracted.starts_with("$SAVES") || contracted.starts_with("%SAVES%"),
            "got {contracted}"
        );
    }

    #[test]
    fn contract_without_match_returns_literal() {
        let env = EnvSnapshot::from_vars([("NOPE", "/does/not/exist/anywhere")]);
        assert_eq!(env.contract("/some/other/path"), "/some/other/path");
    }

    #[test]
    fn contract_exact_value_is_bare_token() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_str().unwrap().to_string();
        let env = EnvSnapshot::from_vars([("BASE".to_string(), base.clone())]);

        let contracted = env.contract(&base);
        assert!(contracted == "$BASE" || contracted == "%BASE%");
    }

    #[test]
    fn contract_requires_path_boundary() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_str().unwrap().to_string();
        let env = EnvSnapshot::from_vars([("BASE".to_string(), base.clone())]);

        // Same prefix but not at a separator boundary
        let sibling = format!("{}extra", base);
        assert_eq!(env.contract(&sibling), sibling);
    }

    #[test]
    fn expand_resolves_both_token_forms() {
        let env = EnvSnapshot::from_vars([("USERPROFILE", "/home/user")]);

        assert_eq!(
            env.expand("%USERPROFILE%/Saves"),
            PathBuf::from("/home/user/Saves")
        );
        assert_eq!(
            env.expand("$USERPROFILE/Saves"),
            PathBuf::from("/home/user/Saves")
        );
        assert_eq!(
            env.expand("${USERPROFILE}/Saves"),
            PathBuf::from("/home/user/Saves")
        );
    }

    #[test]
    fn expand_leaves_unresolved_tokens_literal() {
        let env = EnvSnapshot::default();

        assert_eq!(
            env.expand("%UNKNOWN%/Saves"),
            PathBuf::from("%UNKNOWN%/Saves")
        );
        assert_eq!(env.expand("$UNKNOWN/Saves"), PathBuf::from("$UNKNOWN/Saves"));
    }

    #[test]
    fn expand_handles_stray_symbols() {
        let env = EnvSnapshot::default();

        assert_eq!(env.expand("100%"), PathBuf::from("100%"));
        assert_eq!(env.expand("price$"), PathBuf::from("price$"));
        assert_eq!(env.expand("a%%b"), PathBuf::from("a%%b"));
    }

    #[test]
    fn expand_tilde_to_home() {
        let env = EnvSnapshot::from_vars([("HOME", "/home/user")]);

        assert_eq!(env.expand("~/saves"), PathBuf::from("/home/user/saves"));
        assert_eq!(env.expand("~"), PathBuf::from("/home/user"));
        // Mid-path tilde is not a home reference
        assert_eq!(env.expand("/a/~b"), PathBuf::from("/a/~b"));
    }

    #[test]
    fn round_trip_through_supported_variable() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_str().unwrap().to_string();
        let env = EnvSnapshot::from_vars([("SAVEROOT".to_string(), base.clone())]);

        let original = format!("{}{}Game{}slot1", base, sep(), sep());
        let contracted = env.contract(&original);
        assert_ne!(contracted, original, "contraction should have matched");

        assert_eq!(env.expand(&contracted), PathBuf::from(original));
    }

    #[test]
    fn short_or_missing_values_are_not_candidates() {
        let env = EnvSnapshot::from_vars([("SHLVL", "2"), ("GONE", "/no/such/dir/xyz")]);
        assert_eq!(env.contract("/no/such/dir/xyz/deep"), "/no/such/dir/xyz/deep");
    }

    #[test]
    fn clean_input_path_strips_url_prefixes() {
        assert_eq!(clean_input_path("  /plain/path "), "/plain/path");
        assert_eq!(clean_input_path("file:///home/user/x"), "/home/user/x");
        assert_eq!(clean_input_path("file:///C:/Games/Saves"), "C:/Games/Saves");
        assert_eq!(clean_input_path("/trailing/slash/"), "/trailing/slash");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Every path reachable through a supported variable survives
            /// contract -> expand unchanged
            #[test]
            fn contract_expand_round_trip(
                segments in proptest::collection::vec("[A-Za-z0-9 _.-]{1,12}", 1..4)
            ) {
                let dir = TempDir::new().unwrap();
                let base = dir.path().to_str().unwrap().to_string();
                let env = EnvSnapshot::from_vars([("SAVEROOT".to_string(), base.clone())]);

                let sep = MAIN_SEPARATOR.to_string();
                let original = format!("{}{}{}", base, sep, segments.join(&sep));

                let contracted = env.contract(&original);
                prop_assert_ne!(&contracted, &original, "variable should have matched");
                prop_assert_eq!(env.expand(&contracted), PathBuf::from(original));
            }
        }
    }
}
