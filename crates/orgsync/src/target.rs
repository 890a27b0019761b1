//! Target-URL to group-path resolution.
//!
//! A target URL names either a whole instance (`https://gitlab.com/`) or a
//! group namespace within it. GitLab uses a literal `-` path component to
//! delimit sub-pages (`/gitlab-org/-/settings`), and serves group pages
//! under a reserved `/groups/` prefix; both are stripped here.

use url::Url;

use crate::config::ConfigError;

/// Parse a target URL into its canonical group path.
///
/// Returns `Ok(None)` for a root-level target with no group path (sync the
/// whole instance). When `base_url` is given, its path components must be
/// a strict prefix of the target's; they are stripped before resolution.
pub fn parse_group_path(url: &str, base_url: Option<&str>) -> Result<Option<String>, ConfigError> {
    let mut path = group_path_components(url, base_url)?;

    // A "/" pathname yields no components: a root-level target.
    if path.is_empty() {
        return Ok(None);
    }

    // Reserved keyword GitLab serves group pages under.
    if path[0] == "groups" {
        path.remove(0);
        if path.is_empty() {
            return Err(ConfigError::EmptyGroupPath {
                url: url.to_string(),
            });
        }
    }

    // Consume components until the `-` sub-page delimiter.
    let mut components = Vec::new();
    for component in path {
        if component == "-" {
            break;
        }
        components.push(component);
    }
    Ok(Some(components.join("/")))
}

/// Split a target URL's path into components, stripping the base URL's
/// path prefix when one is configured.
pub fn group_path_components(
    url: &str,
    base_url: Option<&str>,
) -> Result<Vec<String>, ConfigError> {
    let target = Url::parse(url).map_err(|e| ConfigError::invalid_url(url, e))?;
    let mut path = split_path(&target);

    if let Some(base_url) = base_url {
        let base = Url::parse(base_url).map_err(|e| ConfigError::invalid_url(base_url, e))?;
        let base_path = split_path(&base);

        let is_prefix = base_path.len() <= path.len()
            && base_path.iter().zip(path.iter()).all(|(b, t)| b == t);
        if !is_prefix {
            return Err(ConfigError::BaseUrlMismatch {
                base: base_url.to_string(),
                target: url.to_string(),
            });
        }
        path.drain(..base_path.len());
    }

    Ok(path)
}

fn split_path(url: &Url) -> Vec<String> {
    let trimmed = url.path().trim_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_url_has_no_group_path() {
        assert_eq!(parse_group_path("https://gitlab.com", None).unwrap(), None);
        assert_eq!(parse_group_path("https://gitlab.com/", None).unwrap(), None);
    }

    #[test]
    fn plain_namespace_resolves_as_is() {
        assert_eq!(
            parse_group_path("https://gitlab.com/gitlab-org/delivery", None).unwrap(),
            Some("gitlab-org/delivery".to_string())
        );
    }

    #[test]
    fn reserved_groups_prefix_is_dropped() {
        assert_eq!(
            parse_group_path("https://gitlab.com/groups/x/y", None).unwrap(),
            Some("x/y".to_string())
        );
    }

    #[test]
    fn bare_groups_prefix_is_an_error() {
        let err = parse_group_path("https://gitlab.com/groups", None).expect_err("empty path");
        assert!(matches!(err, ConfigError::EmptyGroupPath { .. }));
    }

    #[test]
    fn sub_page_suffix_after_dash_is_discarded() {
        assert_eq!(
            parse_group_path("https://gitlab.com/gitlab-org/-/settings", None).unwrap(),
            Some("gitlab-org".to_string())
        );
    }

    #[test]
    fn base_url_path_prefix_is_stripped_before_resolution() {
        assert_eq!(
            parse_group_path("https://h/a/b/c/-/settings", Some("https://h/a/b")).unwrap(),
            Some("c".to_string())
        );
    }

    #[test]
    fn base_url_equal_to_target_is_a_root_target() {
        assert_eq!(
            parse_group_path("https://h/a/b", Some("https://h/a/b")).unwrap(),
            None
        );
    }

    #[test]
    fn base_url_that_is_not_a_prefix_fails() {
        let err = parse_group_path("https://h/x/c", Some("https://h/a/b")).expect_err("mismatch");
        assert!(matches!(err, ConfigError::BaseUrlMismatch { .. }));

        // Base longer than the target cannot be a prefix either.
        let err = parse_group_path("https://h/a", Some("https://h/a/b")).expect_err("mismatch");
        assert!(matches!(err, ConfigError::BaseUrlMismatch { .. }));
    }

    #[test]
    fn invalid_target_url_is_a_configuration_error() {
        let err = parse_group_path("not a url", None).expect_err("invalid url");
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }
}
