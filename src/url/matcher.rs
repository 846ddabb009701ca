use url::Url;

/// Checks if a candidate string matches a glob pattern
///
/// Only `*` is special: it matches any run of characters, `/` included.
/// Every other character, `?` among them, matches itself. Matching is
/// case-sensitive.
///
/// # Examples
///
/// ```
/// use sumi_lens::url::glob_match;
///
/// assert!(glob_match("/admin/*", "/admin/login"));
/// assert!(glob_match("*.json", "/data/feed.json"));
/// assert!(glob_match("?s=*", "?s=shoes"));
/// assert!(!glob_match("/admin/*", "/Admin/login"));
/// ```
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let p = pattern.as_bytes();
    let c = candidate.as_bytes();

    let (mut pi, mut ci) = (0, 0);
    // Position of the last `*` seen and the candidate index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while ci < c.len() {
        if pi < p.len() && p[pi] == b'*' {
            backtrack = Some((pi, ci));
            pi += 1;
        } else if pi < p.len() && p[pi] == c[ci] {
            pi += 1;
            ci += 1;
        } else if let Some((star, tried)) = backtrack {
            pi = star + 1;
            ci = tried + 1;
            backtrack = Some((star, tried + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&b| b == b'*')
}

/// Returns the patterns that take part in matching
///
/// Blank lines and lines starting with `#` are skipped.
pub fn active_patterns(patterns: &[String]) -> impl Iterator<Item = &str> {
    patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty() && !p.starts_with('#'))
}

/// Checks a single pattern against a URL's path and query
///
/// - Patterns starting with `?` are matched against `?` + query.
/// - Patterns containing `*` are globbed against the path, and against
///   path + query when the URL has one.
/// - Other patterns match when path + query starts with them, which covers
///   exact matches.
pub fn matches_pattern(pattern: &str, url: &Url) -> bool {
    let path = url.path();
    let query = url.query();

    if pattern.starts_with('?') {
        let Some(query) = query else {
            return false;
        };
        let target = format!("?{}", query);
        return if pattern.contains('*') {
            glob_match(pattern, &target)
        } else {
            target.starts_with(pattern)
        };
    }

    let with_query = match query {
        Some(q) => format!("{}?{}", path, q),
        None => path.to_string(),
    };

    if pattern.contains('*') {
        glob_match(pattern, path) || glob_match(pattern, &with_query)
    } else {
        with_query.starts_with(pattern)
    }
}

/// Checks whether any active pattern in the list matches the URL
pub fn matches_any(patterns: &[String], url: &Url) -> bool {
    active_patterns(patterns).any(|pattern| matches_pattern(pattern, url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path_and_query: &str) -> Url {
        Url::parse(&format!("https://example.com{}", path_and_query)).unwrap()
    }

    #[test]
    fn test_glob_exact() {
        assert!(glob_match("/about", "/about"));
        assert!(!glob_match("/about", "/about-us"));
    }

    #[test]
    fn test_glob_trailing_star() {
        assert!(glob_match("/admin/*", "/admin/login"));
        assert!(glob_match("/admin/*", "/admin/users/42"));
        assert!(glob_match("/admin/*", "/admin/"));
        assert!(!glob_match("/admin/*", "/admin"));
    }

    #[test]
    fn test_glob_leading_and_inner_star() {
        assert!(glob_match("*/search/*", "/shop/search/shoes"));
        assert!(glob_match("/a*c", "/abbbc"));
        assert!(glob_match("/a*b*c", "/axxbyyc"));
        assert!(!glob_match("/a*b*c", "/axxbyy"));
    }

    #[test]
    fn test_glob_question_mark_is_literal() {
        assert!(glob_match("?s=*", "?s=term"));
        assert!(!glob_match("?s=*", "xs=term"));
    }

    #[test]
    fn test_glob_case_sensitive() {
        assert!(!glob_match("/Admin/*", "/admin/login"));
    }

    #[test]
    fn test_glob_only_stars() {
        assert!(glob_match("*", ""));
        assert!(glob_match("**", "/anything"));
        assert!(!glob_match("", "/x"));
    }

    #[test]
    fn test_active_patterns_skip_comments() {
        let patterns = vec![
            "# comment".to_string(),
            "".to_string(),
            "  /admin/*  ".to_string(),
        ];
        let active: Vec<&str> = active_patterns(&patterns).collect();
        assert_eq!(active, vec!["/admin/*"]);
    }

    #[test]
    fn test_prefix_pattern() {
        assert!(matches_pattern("/login", &url("/login")));
        assert!(matches_pattern("/login", &url("/login-help")));
        assert!(!matches_pattern("/login", &url("/user/login")));
    }

    #[test]
    fn test_query_pattern() {
        assert!(matches_pattern("?s=*", &url("/?s=shoes")));
        assert!(!matches_pattern("?s=*", &url("/page")));
        assert!(!matches_pattern("?s=*", &url("/page?sort=asc")));
    }

    #[test]
    fn test_extension_pattern_with_query() {
        assert!(matches_pattern("*.json", &url("/data.json")));
        assert!(matches_pattern("*.json", &url("/data.json?v=2")));
    }

    #[test]
    fn test_pattern_sees_query() {
        assert!(matches_pattern("/list?page=*", &url("/list?page=2")));
    }

    #[test]
    fn test_matches_any_ignores_comment_lines() {
        let patterns = vec!["#/blog/*".to_string()];
        assert!(!matches_any(&patterns, &url("/blog/post")));

        let patterns = vec!["# blog".to_string(), "/blog/*".to_string()];
        assert!(matches_any(&patterns, &url("/blog/post")));
    }
}
