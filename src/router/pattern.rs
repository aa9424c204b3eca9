//! Path template compilation.
//!
//! A template such as `/api/v1/users/{id}` becomes an anchored regular
//! expression `^/api/v1/users/([^/]+)/?$`. Literal text is escaped, each
//! `{name}` placeholder matches exactly one non-empty segment, and a single
//! trailing slash on the request path is tolerated.

use crate::error::ConfigurationError;
use crate::request::MAX_INLINE_PARAMS;
use regex::Regex;
use smallvec::SmallVec;

const SEGMENT_CAPTURE: &str = "([^/]+)";

/// Compiled matcher for one route template.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    regex: Regex,
    template: String,
}

impl PathMatcher {
    #[inline]
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Captured segment values in placeholder order, or `None` if `path`
    /// does not match.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<SmallVec<[String; MAX_INLINE_PARAMS]>> {
        let caps = self.regex.captures(path)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect(),
        )
    }

    /// The regular expression source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }
}

/// Compile `template` into a matcher and its ordered placeholder names.
///
/// # Errors
///
/// Returns [`ConfigurationError::InvalidTemplate`] for an unclosed `{` or an
/// empty `{}` placeholder.
pub fn compile_template(template: &str) -> Result<(PathMatcher, Vec<String>), ConfigurationError> {
    let invalid = |reason| ConfigurationError::InvalidTemplate {
        template: template.to_string(),
        reason,
    };

    let mut pattern = String::with_capacity(template.len() + 16);
    let mut names = Vec::new();
    pattern.push('^');

    let mut rest = template;
    while let Some(open) = rest.find('{') {
        pattern.push_str(&regex::escape(&rest[..open]));
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
        let name = &after[..close];
        if name.is_empty() {
            return Err(invalid("empty placeholder"));
        }
        names.push(name.to_string());
        pattern.push_str(SEGMENT_CAPTURE);
        rest = &after[close + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push_str("/?$");

    let regex = Regex::new(&pattern).map_err(|source| ConfigurationError::Pattern {
        template: template.to_string(),
        source,
    })?;

    Ok((
        PathMatcher {
            regex,
            template: template.to_string(),
        },
        names,
    ))
}
