//! Workspace naming
//!
//! Date-prefixed directory names for new workspaces, clones and worktrees.

use std::path::{Path, PathBuf};

use chrono::Local;

/// Today's local date as `YYYY-MM-DD`
pub fn date_prefix() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Replace each run of whitespace with a single `-`
pub fn dashify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Components of a git remote URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitUri {
    pub host: String,
    pub user: String,
    pub repo: String,
}

/// Whether an argument looks like a git remote
pub fn is_git_uri(arg: &str) -> bool {
    arg.starts_with("http://")
        || arg.starts_with("https://")
        || arg.starts_with("git@")
        || arg.contains("github.com")
        || arg.contains("gitlab.com")
        || arg.ends_with(".git")
}

/// Parse `https://host/user/repo(.git)` or `git@host:user/repo(.git)`
pub fn parse_git_uri(uri: &str) -> Option<GitUri> {
    let uri = uri.strip_suffix(".git").unwrap_or(uri);

    let (host, path) = if let Some(rest) = uri.strip_prefix("https://").or_else(|| uri.strip_prefix("http://")) {
        rest.split_once('/')?
    } else if let Some(rest) = uri.strip_prefix("git@") {
        rest.split_once(':')?
    } else {
        return None;
    };

    let mut parts = path.split('/');
    let user = parts.next().filter(|s| !s.is_empty())?;
    let repo = parts.next().filter(|s| !s.is_empty())?;
    if host.is_empty() || (uri.starts_with("git@") && host.contains('/')) {
        return None;
    }

    Some(GitUri {
        host: host.to_string(),
        user: user.to_string(),
        repo: repo.to_string(),
    })
}

/// `<date>-<user>-<repo>`, or the custom name when given
pub fn clone_dir_name(uri: &str, custom: Option<&str>) -> Option<String> {
    if let Some(name) = custom.filter(|n| !n.is_empty()) {
        return Some(name.to_string());
    }
    let parsed = parse_git_uri(uri)?;
    Some(format!("{}-{}-{}", date_prefix(), parsed.user, parsed.repo))
}

/// `name`, or `name-2`, `name-3`, ... whichever is free under `base`
pub fn unique_dir_name(base: &Path, name: &str) -> String {
    let mut candidate = name.to_string();
    let mut i = 2;
    while base.join(&candidate).exists() {
        candidate = format!("{}-{}", name, i);
        i += 1;
    }
    candidate
}

/// Pick a name so that `<date>-<name>` is free under `base`.
///
/// A name ending in digits is bumped (`v2` → `v3`); otherwise `-2`, `-3`, ...
/// is appended.
pub fn resolve_unique_name(base: &Path, date: &str, name: &str) -> String {
    if !base.join(format!("{}-{}", date, name)).exists() {
        return name.to_string();
    }

    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &name[stem.len()..];
    if let Ok(n) = digits.parse::<u64>() {
        let mut next = n + 1;
        loop {
            let candidate = format!("{}{}", stem, next);
            if !base.join(format!("{}-{}", date, candidate)).exists() {
                return candidate;
            }
            next += 1;
        }
    }

    let full = unique_dir_name(base, &format!("{}-{}", date, name));
    full.strip_prefix(&format!("{}-", date)).unwrap_or(&full).to_string()
}

/// Path for a new dated workspace derived from a repository directory or a
/// custom name
pub fn worktree_path(tries: &Path, repo_dir: &Path, custom: Option<&str>) -> PathBuf {
    let name = match custom.filter(|c| !c.trim().is_empty()) {
        Some(c) => dashify(c),
        None => {
            let resolved = repo_dir.canonicalize().unwrap_or_else(|_| repo_dir.to_path_buf());
            resolved
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        }
    };
    let date = date_prefix();
    let name = resolve_unique_name(tries, &date, &name);
    tries.join(format!("{}-{}", date, name))
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), crate::config::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_date_prefix_shape() {
        let d = date_prefix();
        assert_eq!(d.len(), 10);
        assert!(crate::core::fuzzy::has_date_prefix(&format!("{}-x", d)));
    }

    #[test]
    fn test_dashify() {
        assert_eq!(dashify("new thing"), "new-thing");
        assert_eq!(dashify("a  \t b"), "a-b");
        assert_eq!(dashify(" lead"), "-lead");
        assert_eq!(dashify("plain"), "plain");
    }

    #[test]
    fn test_is_git_uri() {
        assert!(is_git_uri("https://github.com/user/repo"));
        assert!(is_git_uri("git@github.com:user/repo.git"));
        assert!(is_git_uri("github.com/user/repo"));
        assert!(is_git_uri("/local/mirror.git"));
        assert!(!is_git_uri("beta"));
        assert!(!is_git_uri(""));
    }

    #[test]
    fn test_parse_git_uri() {
        let expect = |host: &str, user: &str, repo: &str| GitUri {
            host: host.into(),
            user: user.into(),
            repo: repo.into(),
        };
        assert_eq!(
            parse_git_uri("https://github.com/tobi/try.git"),
            Some(expect("github.com", "tobi", "try"))
        );
        assert_eq!(
            parse_git_uri("git@github.com:tobi/try"),
            Some(expect("github.com", "tobi", "try"))
        );
        assert_eq!(
            parse_git_uri("https://gitlab.example.com/group/proj/extra"),
            Some(expect("gitlab.example.com", "group", "proj"))
        );
        assert_eq!(
            parse_git_uri("git@git.example.com:team/tool.git"),
            Some(expect("git.example.com", "team", "tool"))
        );
        assert_eq!(parse_git_uri("https://github.com/onlyuser"), None);
        assert_eq!(parse_git_uri("github.com/user/repo"), None);
    }

    #[test]
    fn test_clone_dir_name() {
        assert_eq!(
            clone_dir_name("https://github.com/tobi/try", None),
            Some(format!("{}-tobi-try", date_prefix()))
        );
        assert_eq!(clone_dir_name("https://github.com/tobi/try", Some("mine")), Some("mine".into()));
        assert_eq!(clone_dir_name("nonsense", None), None);
    }

    #[test]
    fn test_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let date = "2025-11-25";
        assert_eq!(resolve_unique_name(dir.path(), date, "proj"), "proj");

        fs::create_dir(dir.path().join("2025-11-25-proj")).unwrap();
        assert_eq!(resolve_unique_name(dir.path(), date, "proj"), "proj-2");
        fs::create_dir(dir.path().join("2025-11-25-proj-2")).unwrap();
        assert_eq!(resolve_unique_name(dir.path(), date, "proj"), "proj-3");

        fs::create_dir(dir.path().join("2025-11-25-v2")).unwrap();
        fs::create_dir(dir.path().join("2025-11-25-v3")).unwrap();
        assert_eq!(resolve_unique_name(dir.path(), date, "v2"), "v4");
    }

    #[test]
    fn test_worktree_path() {
        let tries = tempfile::tempdir().unwrap();
        let repo = tempfile::tempdir().unwrap();
        let date = date_prefix();

        let p = worktree_path(tries.path(), repo.path(), Some("my feature"));
        assert_eq!(p, tries.path().join(format!("{}-my-feature", date)));

        let p = worktree_path(tries.path(), repo.path(), None);
        let repo_name = repo.path().canonicalize().unwrap();
        let repo_name = repo_name.file_name().unwrap().to_string_lossy();
        assert_eq!(p, tries.path().join(format!("{}-{}", date, repo_name)));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel"), PathBuf::from("rel"));
        if let Some(home) = crate::config::home_dir() {
            assert_eq!(expand_home("~/src/tries"), home.join("src/tries"));
            assert_eq!(expand_home("~"), home);
        }
    }
}
