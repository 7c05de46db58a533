//! Subsequence scoring for file-name lookup.
//!
//! Every query character must appear in the candidate in order (case-insensitively). Each matched
//! character that directly follows the previous match earns [`CONSECUTIVE_BONUS`], a match at the
//! start of a word (string start, or after `/`, `_`, `-`) earns [`BOUNDARY_BONUS`], and every
//! directory level of the candidate costs [`DEPTH_PENALTY`].

use crate::path_utils::{file_name, virtual_depth};

pub const CONSECUTIVE_BONUS: i64 = 10;
pub const BOUNDARY_BONUS: i64 = 5;
pub const DEPTH_PENALTY: i64 = 2;

/// Directory names never descended into by fuzzy lookups, regardless of ignore rules.
pub const ALWAYS_EXCLUDED: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".cache",
    ".next",
    ".venv",
    "venv",
];

fn fold(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

fn normalize_query(query: &str) -> Vec<char> {
    query
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .map(fold)
        .collect()
}

fn score_chars(query: &[char], candidate: &str) -> Option<i64> {
    if query.is_empty() {
        return Some(0);
    }
    let mut score = 0i64;
    let mut next = 0usize;
    let mut last_match: Option<usize> = None;
    let mut prev: Option<char> = None;

    for (idx, ch) in candidate.chars().enumerate() {
        if next < query.len() && fold(ch) == query[next] {
            if last_match.is_some_and(|last| last + 1 == idx) {
                score += CONSECUTIVE_BONUS;
            }
            if prev.is_none_or(|prev| matches!(prev, '/' | '_' | '-')) {
                score += BOUNDARY_BONUS;
            }
            last_match = Some(idx);
            next += 1;
        }
        prev = Some(ch);
    }

    if next < query.len() {
        return None;
    }
    let depth = candidate.matches('/').count() as i64;
    Some(score - depth * DEPTH_PENALTY)
}

/// Score of `query` against `candidate`, or `None` when it is not a subsequence.
pub fn score(query: &str, candidate: &str) -> Option<i64> {
    score_chars(&normalize_query(query), candidate)
}

/// Combined file-name and full-path score for a virtual path.
pub fn path_score(query: &str, path: &str) -> Option<i64> {
    let query = normalize_query(query);
    let name = score_chars(&query, file_name(path));
    let full = score_chars(&query, path);
    match (name, full) {
        (Some(name), Some(full)) => Some(2 * name + full),
        (Some(name), None) => Some(2 * name),
        (None, Some(full)) => Some(full),
        (None, None) => None,
    }
}

/// Ranks `items` against `query`, best first, keeping at most `limit`.
///
/// An empty query keeps every item and orders it shallowest first.
pub fn rank<T>(
    query: &str,
    items: Vec<T>,
    path_of: impl Fn(&T) -> &str,
    limit: usize,
) -> Vec<(T, i64)> {
    let empty = normalize_query(query).is_empty();
    let mut scored: Vec<(T, i64)> = items
        .into_iter()
        .filter_map(|item| {
            let score = if empty {
                Some(0)
            } else {
                path_score(query, path_of(&item))
            };
            score.map(|score| (item, score))
        })
        .collect();

    scored.sort_by(|(a, a_score), (b, b_score)| {
        let (a, b) = (path_of(a), path_of(b));
        b_score
            .cmp(a_score)
            .then_with(|| virtual_depth(a).cmp(&virtual_depth(b)))
            .then_with(|| a.cmp(b))
    });
    scored.truncate(limit);
    scored
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoResolve {
    NotFound,
    Resolved(String),
    Ambiguous(Vec<String>),
}

/// Finds the files whose name equals the file name of `requested`, case-insensitively.
pub fn auto_resolve<'a>(
    requested: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> AutoResolve {
    let wanted = file_name(requested).to_lowercase();
    if wanted.is_empty() || wanted == "." {
        return AutoResolve::NotFound;
    }
    let mut hits: Vec<String> = candidates
        .into_iter()
        .filter(|path| file_name(path).to_lowercase() == wanted)
        .map(str::to_string)
        .collect();
    hits.sort();
    hits.dedup();

    match hits.len() {
        0 => AutoResolve::NotFound,
        1 => AutoResolve::Resolved(hits.remove(0)),
        _ => AutoResolve::Ambiguous(hits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsequence_is_required() {
        assert!(score("cfg", "config.toml").is_some());
        assert!(score("gfc", "config.toml").is_none());
        assert!(score("xyz", "config.toml").is_none());
    }

    #[test]
    fn consecutive_and_boundary_bonuses() {
        // c(start +5) o(+10) n(+10)
        assert_eq!(score("con", "config"), Some(25));
        // m(start +5) t(boundary after '_' +5)
        assert_eq!(score("mt", "my_tool"), Some(10));
        assert_eq!(score("CON", "Config"), Some(25));
    }

    #[test]
    fn depth_costs_points() {
        let shallow = score("readme", "readme.md").expect("match");
        let deep = score("readme", "a/b/readme.md").expect("match");
        assert_eq!(shallow - deep, 2 * DEPTH_PENALTY);
    }

    #[test]
    fn name_matches_outrank_path_only_matches() {
        let name_hit = path_score("notes", "docs/notes.md").expect("match");
        let path_only = path_score("docs", "docs/notes.md").expect("match");
        assert!(name_hit > path_only, "{name_hit} vs {path_only}");
    }

    #[test]
    fn rank_orders_by_score_then_depth_then_path() {
        let items = vec![
            "deep/dir/config.js".to_string(),
            "config.js".to_string(),
            "b/config.js".to_string(),
            "a/config.js".to_string(),
            "unrelated.txt".to_string(),
        ];
        let ranked = rank("config", items, |item| item.as_str(), 10);
        let paths: Vec<&str> = ranked.iter().map(|(path, _)| path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["config.js", "a/config.js", "b/config.js", "deep/dir/config.js"]
        );
    }

    #[test]
    fn empty_query_lists_shallowest_first() {
        let items = vec!["a/b/c.md", "z.md", "a/y.md"];
        let ranked = rank("  ", items, |item| *item, 2);
        let paths: Vec<&str> = ranked.iter().map(|(path, _)| *path).collect();
        assert_eq!(paths, vec!["z.md", "a/y.md"]);
    }

    #[test]
    fn auto_resolve_outcomes() {
        let files = ["a/config.js", "b/config.js", "notes/Notes.md", "x.txt"];
        assert_eq!(
            auto_resolve("config.js", files),
            AutoResolve::Ambiguous(vec!["a/config.js".to_string(), "b/config.js".to_string()])
        );
        assert_eq!(
            auto_resolve("wrong/dir/notes.md", files),
            AutoResolve::Resolved("notes/Notes.md".to_string())
        );
        assert_eq!(auto_resolve("missing.md", files), AutoResolve::NotFound);
    }

    #[test]
    fn always_excluded_names() {
        assert!(ALWAYS_EXCLUDED.contains(&"node_modules"));
        assert!(ALWAYS_EXCLUDED.contains(&".git"));
        assert!(!ALWAYS_EXCLUDED.contains(&"src"));
    }
}
