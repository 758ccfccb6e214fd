//! Repository URL parsing

const GITHUB_PREFIX: &str = "https://github.com/";

/// A repository URL that does not match the expected host/path shape.
#[derive(Debug, PartialEq, Eq)]
pub struct MalformedRepoUrl(pub String);

impl std::fmt::Display for MalformedRepoUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed repository url: {}", self.0)
    }
}

impl std::error::Error for MalformedRepoUrl {}

/// Split `https://github.com/{owner}/{name}[/...]` into `(owner, name)`.
pub fn parse_repo_url(url: &str) -> Result<(String, String), MalformedRepoUrl> {
    let rest = url
        .strip_prefix(GITHUB_PREFIX)
        .ok_or_else(|| MalformedRepoUrl(url.to_string()))?;

    let mut parts = rest.split('/');
    let owner = parts.next().unwrap_or("");
    let name = parts.next().unwrap_or("");
    if owner.is_empty() || name.is_empty() {
        return Err(MalformedRepoUrl(url.to_string()));
    }
    Ok((owner.to_string(), name.to_string()))
}
