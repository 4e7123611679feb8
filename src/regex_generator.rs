use crate::constants::{META_STARTERS, WILDCARD};
use crate::error::Error;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Mutex;

lazy_static! {
    /// The placeholder grammar: an optional literal prefix character, a
    /// bracket block `[type:name]` (either part may be empty), and an
    /// optional trailing `?` marking the whole block optional.
    static ref BLOCK_RE: Regex =
        Regex::new(r"([/.])?\[([^:\]]*)(?::([^:\]]*))?\](\?)?").expect("BLOCK_RE must compile");

    /// Advisory compile cache keyed by the generated regex source. Purely
    /// an optimization; every entry re-compiles identically on a miss.
    static ref COMPILE_CACHE: Mutex<HashMap<String, Regex>> = Mutex::new(HashMap::new());
}

/// The matcher artifact a route pattern compiles to.
#[derive(Debug, Clone)]
pub(crate) enum CompiledPattern {
    /// The wildcard sentinel: matches every request path.
    Wildcard,

    /// An anchored (or, for custom regex patterns, user-anchored) regex.
    Regex(Regex),

    /// A namespaced negated custom regex. The engine has no lookahead, so
    /// `^<ns>(?!<body>)` is evaluated as: `base` matches and `full` does
    /// not.
    NegatedCustom { base: Regex, full: Regex },
}

/// A compiled route pattern together with the flags derived from its
/// markers.
#[derive(Debug)]
pub(crate) struct CompiledRoute {
    /// The normalized pattern: namespace-prefixed, `!`/`@` markers
    /// stripped.
    pub(crate) path: String,
    pub(crate) pattern: CompiledPattern,
    pub(crate) is_custom_regex: bool,
    pub(crate) is_negated: bool,
    pub(crate) is_negated_custom_regex: bool,
    pub(crate) is_dynamic: bool,
}

/// Compiles a user-written route pattern under a namespace prefix.
///
/// The first one or two characters select the pattern kind: `@` introduces
/// a raw regex, `!` inverts the match outcome, `!@` combines the two, and a
/// bare `*` matches any path. Everything else goes through placeholder
/// expansion.
pub(crate) fn compile_route(namespace: &str, path: &str) -> crate::Result<CompiledRoute> {
    let is_negated = path.starts_with('!');
    let body = if is_negated { &path[1..] } else { path };
    let is_custom_regex = body.starts_with('@');
    let body = if is_custom_regex { &body[1..] } else { body };
    let is_negated_custom_regex = is_negated && is_custom_regex;
    let is_dynamic = !is_custom_regex && (body.contains('[') || body.contains('?'));

    if is_custom_regex {
        return compile_custom(namespace, path, body, is_negated).map(|(normalized, pattern)| {
            CompiledRoute {
                path: normalized,
                pattern,
                is_custom_regex,
                is_negated,
                is_negated_custom_regex,
                is_dynamic,
            }
        });
    }

    let (normalized, pattern) = if body == WILDCARD || body.is_empty() {
        if namespace.is_empty() {
            (body.to_string(), CompiledPattern::Wildcard)
        } else {
            // A wildcard under a namespace matches the namespace itself and
            // everything below it.
            let source = format!("^{}(?:/|$)", namespace);
            let re = cached_compile(&source, path)?;
            (source, CompiledPattern::Regex(re))
        }
    } else {
        let joined = format!("{}{}", namespace, body);
        let source = expand_placeholders(&joined);
        let re = cached_compile(&source, path)?;
        (joined, CompiledPattern::Regex(re))
    };

    Ok(CompiledRoute {
        path: normalized,
        pattern,
        is_custom_regex,
        is_negated,
        is_negated_custom_regex,
        is_dynamic,
    })
}

fn compile_custom(
    namespace: &str,
    original: &str,
    body: &str,
    is_negated: bool,
) -> crate::Result<(String, CompiledPattern)> {
    if namespace.is_empty() {
        let re = cached_compile(body, original)?;
        return Ok((body.to_string(), CompiledPattern::Regex(re)));
    }

    // Anchor the body under the namespace: a `^`-anchored body continues
    // right after the prefix, anything else may start at any depth below
    // it.
    let tail = match body.strip_prefix('^') {
        Some(stripped) => stripped.to_string(),
        None => format!(".*{}", body),
    };

    if is_negated {
        let base = cached_compile(&format!("^{}", namespace), original)?;
        let full = cached_compile(&format!("^{}(?:{})", namespace, tail), original)?;
        Ok((
            format!("^{}(?!{})", namespace, tail),
            CompiledPattern::NegatedCustom { base, full },
        ))
    } else {
        let source = format!("^{}{}", namespace, tail);
        let re = cached_compile(&source, original)?;
        Ok((source, CompiledPattern::Regex(re)))
    }
}

/// Expands placeholder blocks into capture groups and quotes the literal
/// regions in between. The result is anchored on both ends; a pattern
/// ending in a literal `/` accepts the path with or without its trailing
/// slash.
fn expand_placeholders(path: &str) -> String {
    let mut out = String::from("^");
    let mut last = 0;

    for caps in BLOCK_RE.captures_iter(path) {
        let whole = caps.get(0).expect("capture 0 always exists");
        out.push_str(&regex::escape(&path[last..whole.start()]));

        let pre = caps.get(1).map_or("", |m| m.as_str());
        let type_token = caps.get(2).map_or("", |m| m.as_str());
        let name = caps.get(3).map_or("", |m| m.as_str());
        let optional = caps.get(4).is_some();

        out.push_str("(?:");
        if pre == "." {
            out.push_str(r"\.");
        } else {
            out.push_str(pre);
        }
        if name.is_empty() {
            out.push('(');
        } else {
            out.push_str("(?P<");
            out.push_str(name);
            out.push('>');
        }
        out.push_str(expand_type(type_token));
        out.push_str("))");
        if optional {
            out.push('?');
        }

        last = whole.end();
    }

    let mut tail = &path[last..];
    let mut optional_slash = false;
    if tail.ends_with('/') && (last > 0 || tail.len() > 1) {
        tail = &tail[..tail.len() - 1];
        optional_slash = true;
    }
    out.push_str(&regex::escape(tail));
    if optional_slash {
        out.push_str("/?");
    }
    out.push('$');
    out
}

/// The placeholder type-alias table. An unrecognized token is passed
/// through as a raw sub-regex.
fn expand_type(token: &str) -> &str {
    match token {
        "i" => "[0-9]+",
        "a" => "[0-9A-Za-z]+",
        "h" => "[0-9A-Fa-f]+",
        "s" => r"[0-9A-Za-z_\-]+",
        // The engine has no possessive quantifiers; plain greedy and lazy
        // forms carry the same match semantics for these alternations.
        "*" => ".+?",
        "**" => ".+",
        "" => "[^/]+?",
        other => other,
    }
}

fn cached_compile(source: &str, route_path: &str) -> crate::Result<Regex> {
    {
        let cache = COMPILE_CACHE
            .lock()
            .expect("compile cache lock is poisoned");
        if let Some(re) = cache.get(source) {
            return Ok(re.clone());
        }
    }
    let re = Regex::new(source).map_err(|e| Error::PatternCompilation {
        path: route_path.to_string(),
        message: e.to_string(),
    })?;
    COMPILE_CACHE
        .lock()
        .expect("compile cache lock is poisoned")
        .insert(source.to_string(), re.clone());
    Ok(re)
}

/// The longest prefix of `path` free of placeholder openers and regex
/// metacharacters.
pub(crate) fn literal_prefix(path: &str) -> &str {
    match path.find(|c| META_STARTERS.contains(&c)) {
        Some(i) => &path[..i],
        None => path,
    }
}

/// Substitutes placeholder blocks in a route pattern for reverse routing.
///
/// Blocks with a matching entry in `params` are replaced by the entry's
/// value, keeping the block's literal prefix character. A block with no
/// entry is erased entirely when optional and kept as literal text when
/// required. When nothing was substituted and the pattern is a custom
/// regex, the result collapses to `/` unless `flatten_regex` is off.
pub(crate) fn substitute_params(
    pattern: &str,
    params: &[(&str, &str)],
    is_custom_regex: bool,
    flatten_regex: bool,
) -> String {
    let mut out = String::new();
    let mut last = 0;
    let mut substituted = false;

    for caps in BLOCK_RE.captures_iter(pattern) {
        let whole = caps.get(0).expect("capture 0 always exists");
        out.push_str(&pattern[last..whole.start()]);

        let pre = caps.get(1).map_or("", |m| m.as_str());
        let name = caps.get(3).map_or("", |m| m.as_str());
        let optional = caps.get(4).is_some();

        let value = if name.is_empty() {
            None
        } else {
            params.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
        };

        match value {
            Some(v) => {
                out.push_str(pre);
                out.push_str(v);
                substituted = true;
            }
            None if optional => {}
            None => out.push_str(whole.as_str()),
        }

        last = whole.end();
    }
    out.push_str(&pattern[last..]);

    if !substituted && is_custom_regex {
        if flatten_regex {
            return "/".to_string();
        }
        return pattern.to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled_source(namespace: &str, path: &str) -> String {
        match compile_route(namespace, path).unwrap().pattern {
            CompiledPattern::Regex(re) => re.as_str().to_string(),
            other => panic!("expected a plain regex, got {:?}", other),
        }
    }

    #[test]
    fn should_expand_typed_placeholders() {
        assert_eq!(compiled_source("", "/[i:id]"), "^(?:/(?P<id>[0-9]+))$");
        assert_eq!(compiled_source("", "/[a:slug]"), "^(?:/(?P<slug>[0-9A-Za-z]+))$");
        assert_eq!(compiled_source("", "/[h:hex]"), "^(?:/(?P<hex>[0-9A-Fa-f]+))$");
        assert_eq!(compiled_source("", "/[:rest]"), "^(?:/(?P<rest>[^/]+?))$");
    }

    #[test]
    fn should_mark_optional_blocks() {
        assert_eq!(
            compiled_source("", "/users/[i:id]?"),
            "^/users(?:/(?P<id>[0-9]+))?$"
        );
    }

    #[test]
    fn should_support_unnamed_and_raw_types() {
        assert_eq!(compiled_source("", "/[i]"), "^(?:/([0-9]+))$");
        assert_eq!(compiled_source("", "/[a-z]"), "^(?:/(a-z))$");
    }

    #[test]
    fn should_quote_literal_regions() {
        let source = compiled_source("", "/file.txt/[i:v]");
        assert!(source.starts_with(r"^/file\.txt"));
    }

    #[test]
    fn should_compose_namespace_by_concatenation() {
        assert_eq!(compiled_source("/api", "/[i:id]"), "^/api(?:/(?P<id>[0-9]+))$");
    }

    #[test]
    fn trailing_literal_slash_is_optional() {
        let route = compile_route("/u", "/").unwrap();
        assert_eq!(route.path, "/u/");
        match route.pattern {
            CompiledPattern::Regex(re) => {
                assert!(re.is_match("/u"));
                assert!(re.is_match("/u/"));
                assert!(!re.is_match("/u/x"));
            }
            other => panic!("expected a plain regex, got {:?}", other),
        }
    }

    #[test]
    fn wildcard_without_namespace_matches_everything() {
        let route = compile_route("", "*").unwrap();
        assert!(matches!(route.pattern, CompiledPattern::Wildcard));
        assert!(!route.is_dynamic);
    }

    #[test]
    fn wildcard_under_namespace_covers_subtree() {
        let route = compile_route("/u", "*").unwrap();
        match route.pattern {
            CompiledPattern::Regex(re) => {
                assert!(re.is_match("/u"));
                assert!(re.is_match("/u/anything/below"));
                assert!(!re.is_match("/users"));
            }
            other => panic!("expected a plain regex, got {:?}", other),
        }
    }

    #[test]
    fn custom_regex_is_kept_verbatim() {
        let route = compile_route("", "@\\.(json|csv)$").unwrap();
        assert!(route.is_custom_regex);
        assert!(!route.is_dynamic);
        match route.pattern {
            CompiledPattern::Regex(re) => {
                assert!(re.is_match("/export/data.json"));
                assert!(!re.is_match("/export/data.xml"));
            }
            other => panic!("expected a plain regex, got {:?}", other),
        }
    }

    #[test]
    fn anchored_custom_regex_under_namespace_continues_after_prefix() {
        let route = compile_route("/api", "@^/foo$").unwrap();
        match route.pattern {
            CompiledPattern::Regex(re) => {
                assert!(re.is_match("/api/foo"));
                assert!(!re.is_match("/foo"));
            }
            other => panic!("expected a plain regex, got {:?}", other),
        }
    }

    #[test]
    fn negated_custom_regex_under_namespace_splits_into_two_regexes() {
        let route = compile_route("/u", "!@^/admin").unwrap();
        assert!(route.is_negated_custom_regex);
        match route.pattern {
            CompiledPattern::NegatedCustom { base, full } => {
                assert!(base.is_match("/u/profile"));
                assert!(full.is_match("/u/admin"));
                assert!(!full.is_match("/u/profile"));
            }
            other => panic!("expected a negated custom pattern, got {:?}", other),
        }
    }

    #[test]
    fn compiling_twice_yields_equal_artifacts() {
        let first = compile_route("/v1", "/posts/[s:slug]").unwrap();
        let second = compile_route("/v1", "/posts/[s:slug]").unwrap();
        assert_eq!(first.path, second.path);
        match (first.pattern, second.pattern) {
            (CompiledPattern::Regex(a), CompiledPattern::Regex(b)) => {
                assert_eq!(a.as_str(), b.as_str())
            }
            _ => panic!("expected plain regexes"),
        }
    }

    #[test]
    fn broken_pattern_fails_compilation() {
        let err = compile_route("", "/[(:oops]").unwrap_err();
        assert!(err.to_string().contains("Could not compile"));
    }

    #[test]
    fn should_extract_literal_prefix() {
        assert_eq!(literal_prefix("/users/[i:id]"), "/users/");
        assert_eq!(literal_prefix("/users/profile"), "/users/profile");
        assert_eq!(literal_prefix("*"), "");
        assert_eq!(literal_prefix("/file.txt"), "/file");
    }

    #[test]
    fn substitute_fills_named_blocks_and_keeps_prefix_chars() {
        let path = substitute_params(
            "/dogs/[i:dog_id]/collars/[a:collar_slug]/?",
            &[("dog_id", "idnumberandstuff"), ("collar_slug", "d12f3d1f2d3")],
            false,
            true,
        );
        assert_eq!(path, "/dogs/idnumberandstuff/collars/d12f3d1f2d3/?");
    }

    #[test]
    fn substitute_erases_optional_blocks_and_keeps_required_ones() {
        let path = substitute_params("/users/[i:id]/[:tab]?", &[("id", "7")], false, true);
        assert_eq!(path, "/users/7");
        let path = substitute_params("/users/[i:id]", &[], false, true);
        assert_eq!(path, "/users/[i:id]");
    }

    #[test]
    fn substitute_flattens_untouched_custom_regex() {
        assert_eq!(substitute_params("@^/foo/bar$", &[], true, true), "/");
        assert_eq!(substitute_params("@^/foo/bar$", &[], true, false), "@^/foo/bar$");
    }
}
