//! Dependency manifest parsing
//!
//! Pure text-in, names-out parsers plus the ordered list of manifest files
//! tried per repository. No I/O here.

/// A manifest that could not be parsed at all.
#[derive(Debug)]
pub struct ManifestParseError(pub String);

impl std::fmt::Display for ManifestParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "manifest parse failure: {}", self.0)
    }
}

impl std::error::Error for ManifestParseError {}

pub type ManifestParser = fn(&str) -> Result<Vec<String>, ManifestParseError>;

/// Manifest files tried in order per repository; first file that fetches and
/// parses wins.
pub const MANIFEST_SOURCES: &[(&str, ManifestParser)] = &[
    ("requirements.txt", parse_requirements),
    ("pyproject.toml", parse_pyproject),
];

/// Bare package name from one requirement line: strips comments, version
/// pins (`<`, `>`, `=`, `~`), extras (`[...]`), environment markers (`;`)
/// and surrounding whitespace. `None` if nothing is left.
fn requirement_name(line: &str) -> Option<String> {
    let name = line
        .split(['#', '<', '>', '=', '~', ';', '['])
        .next()
        .unwrap_or("")
        .trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Parse a requirements list: one dependency per line, blank and
/// comment-only lines ignored. Never fails; unusable lines are dropped.
pub fn parse_requirements(content: &str) -> Result<Vec<String>, ManifestParseError> {
    Ok(content.lines().filter_map(requirement_name).collect())
}

/// Parse a pyproject manifest: PEP 621 `project.dependencies` entries plus
/// poetry `tool.poetry.dependencies` table keys (`python` excluded).
pub fn parse_pyproject(content: &str) -> Result<Vec<String>, ManifestParseError> {
    let doc: toml::Value = content
        .parse()
        .map_err(|e: toml::de::Error| ManifestParseError(e.to_string()))?;

    let mut deps = Vec::new();

    if let Some(list) = doc
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array())
    {
        deps.extend(
            list.iter()
                .filter_map(|v| v.as_str())
                .filter_map(requirement_name),
        );
    }

    if let Some(table) = doc
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_table())
    {
        deps.extend(table.keys().filter(|k| *k != "python").cloned());
    }

    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_strips_pins_and_comments() {
        let deps = parse_requirements("flask==2.0\n# comment\nrequests>=2\n\nclick\n").unwrap();
        assert_eq!(deps, vec!["flask", "requests", "click"]);
    }

    #[test]
    fn requirements_strips_extras_and_markers() {
        let deps =
            parse_requirements("requests[socks]>=2\nuvloop; sys_platform != 'win32'\n").unwrap();
        assert_eq!(deps, vec!["requests", "uvloop"]);
    }

    #[test]
    fn requirements_tilde_pin() {
        let deps = parse_requirements("django~=4.2\n").unwrap();
        assert_eq!(deps, vec!["django"]);
    }

    #[test]
    fn requirements_empty_input() {
        assert!(parse_requirements("").unwrap().is_empty());
        assert!(parse_requirements("# only comments\n\n").unwrap().is_empty());
    }

    #[test]
    fn requirements_inner_whitespace_trimmed() {
        let deps = parse_requirements("flask == 2.0\n  numpy\n").unwrap();
        assert_eq!(deps, vec!["flask", "numpy"]);
    }

    #[test]
    fn pyproject_pep621_dependencies() {
        let content = r#"
[project]
name = "demo"
dependencies = ["flask>=2.0", "requests[security]==2.28", "click"]
"#;
        let deps = parse_pyproject(content).unwrap();
        assert_eq!(deps, vec!["flask", "requests", "click"]);
    }

    #[test]
    fn pyproject_poetry_dependencies() {
        let content = r#"
[tool.poetry.dependencies]
python = "^3.10"
numpy = "^1.24"
pandas = { version = "^2.0", optional = true }
"#;
        let deps = parse_pyproject(content).unwrap();
        assert_eq!(deps, vec!["numpy", "pandas"]);
    }

    #[test]
    fn pyproject_both_styles_combined() {
        let content = r#"
[project]
dependencies = ["flask"]

[tool.poetry.dependencies]
python = "^3.10"
numpy = "*"
"#;
        let deps = parse_pyproject(content).unwrap();
        assert_eq!(deps, vec!["flask", "numpy"]);
    }

    #[test]
    fn pyproject_invalid_toml_is_parse_failure() {
        assert!(parse_pyproject("not [ valid toml").is_err());
    }

    #[test]
    fn pyproject_without_dependencies_is_empty() {
        let deps = parse_pyproject("[build-system]\nrequires = []\n").unwrap();
        assert!(deps.is_empty());
    }

    #[test]
    fn source_order_tries_requirements_first() {
        assert_eq!(MANIFEST_SOURCES[0].0, "requirements.txt");
        assert_eq!(MANIFEST_SOURCES[1].0, "pyproject.toml");
    }
}
