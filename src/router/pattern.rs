use std::collections::HashMap;
use std::fmt;

use crate::pipeline::PipelineError;

/// One segment of a parsed path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Must match the path segment exactly
    Literal(String),
    /// Matches any single segment, captured under the name
    Param(String),
    /// Matches the remainder of the path, captured under the name;
    /// only valid in last position
    Rest(String),
}

/// A parsed URL path pattern
///
/// Supported syntax, matching the route table in the application:
/// - literal segments: `/about`, `/snippet/create`
/// - named parameters: `/snippet/view/{id}`
/// - rest parameters: `/static/{path...}` (must be the final segment)
/// - the exact-root pattern `/{$}`, which matches only `/`
///
/// Patterns are parsed once at registration; matching captures parameter
/// values as strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern string
    pub fn parse(pattern: &str) -> Result<Self, PipelineError> {
        if !pattern.starts_with('/') {
            return Err(PipelineError::invalid_pattern(
                pattern,
                "pattern must start with '/'",
            ));
        }

        // The exact-root pattern has no segments; a bare "/" is treated the
        // same way (it matches only the root path, never as a prefix).
        if pattern == "/" || pattern == "/{$}" {
            return Ok(Self {
                raw: pattern.to_string(),
                segments: Vec::new(),
            });
        }

        let parts: Vec<&str> = pattern[1..].split('/').collect();
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(PipelineError::invalid_pattern(pattern, "empty segment"));
            }

            let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some("$") => {
                    return Err(PipelineError::invalid_pattern(
                        pattern,
                        "'{$}' is only valid as the whole pattern '/{$}'",
                    ));
                }
                Some(name) => {
                    if let Some(name) = name.strip_suffix("...") {
                        if i != parts.len() - 1 {
                            return Err(PipelineError::invalid_pattern(
                                pattern,
                                "rest parameter must be the final segment",
                            ));
                        }
                        Segment::Rest(name.to_string())
                    } else if name.is_empty() {
                        return Err(PipelineError::invalid_pattern(
                            pattern,
                            "parameter name cannot be empty",
                        ));
                    } else {
                        Segment::Param(name.to_string())
                    }
                }
                None => Segment::Literal(part.to_string()),
            };

            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The pattern string as registered
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Number of literal segments, used to rank competing matches
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Match a request path, capturing named parameters
    ///
    /// Returns None if the path does not match.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        // Exact root.
        if self.segments.is_empty() {
            return if path == "/" {
                Some(HashMap::new())
            } else {
                None
            };
        }

        let path = path.strip_prefix('/')?;
        let mut parts = path.split('/');
        let mut params = HashMap::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Rest(name) => {
                    // The remainder, including any further slashes.
                    let rest: Vec<&str> = parts.collect();
                    if rest.is_empty() || rest.iter().all(|p| p.is_empty()) {
                        return None;
                    }
                    params.insert(name.clone(), rest.join("/"));
                    return Some(params);
                }
                Segment::Literal(literal) => {
                    let part = parts.next()?;
                    if part != literal {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let part = parts.next()?;
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), part.to_string());
                }
            }

            // All non-rest segments consumed but path continues: no match.
            if i == self.segments.len() - 1 && parts.next().is_some() {
                return None;
            }
        }

        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
