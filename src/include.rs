//! Include Directives
//!
//! Declarative eager-load specifications. A directive is an ordered set of
//! dotted navigation paths (`author`, `author.profile`); it is plain data and
//! never depends on a store's query builder. A path that is a prefix of
//! another path in the same directive is absorbed by the longer one, since
//! loading `author.profile` loads `author` on the way.

use crate::error::IncludeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One navigation path, e.g. `author.profile`.
///
/// Serialized as its dotted form and validated on the way back in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NavigationPath {
    segments: Vec<String>,
}

impl NavigationPath {
    pub fn parse(path: &str) -> Result<Self, IncludeError> {
        let mut segments = Vec::new();
        for segment in path.split('.') {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(IncludeError::EmptySegment(path.to_string()));
            }
            if !is_identifier(segment) {
                return Err(IncludeError::InvalidSegment {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// First segment: the navigation on the entity being loaded
    pub fn head(&self) -> &str {
        self.segments.first().map_or("", String::as_str)
    }

    /// Remaining segments, to be loaded on the related entity
    pub fn rest(&self) -> Option<NavigationPath> {
        if self.segments.len() > 1 {
            Some(Self {
                segments: self.segments[1..].to_vec(),
            })
        } else {
            None
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// True if `self` is `other` or one of its ancestors
    pub fn is_prefix_of(&self, other: &NavigationPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    fn child(&self, segment: &str) -> Result<Self, IncludeError> {
        let mut child = NavigationPath::parse(segment)?;
        let mut segments = self.segments.clone();
        segments.append(&mut child.segments);
        Ok(Self { segments })
    }
}

impl fmt::Display for NavigationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for NavigationPath {
    type Err = IncludeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NavigationPath {
    type Error = IncludeError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Self::parse(&path)
    }
}

impl From<NavigationPath> for String {
    fn from(path: NavigationPath) -> Self {
        path.to_string()
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Ordered, de-duplicated set of navigation paths to load with each entity.
///
/// Serialized as a list of dotted paths; deserializing rebuilds the set
/// through [`Include::of`], so prefixes are absorbed again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Include {
    paths: Vec<NavigationPath>,
    last: Option<NavigationPath>,
}

impl Include {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directive from a list of dotted paths
    pub fn of<I, S>(paths: I) -> Result<Self, IncludeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut include = Self::new();
        for path in paths {
            include = include.include(path.as_ref())?;
        }
        Ok(include)
    }

    /// Add a path rooted at the queried entity
    pub fn include(mut self, path: &str) -> Result<Self, IncludeError> {
        let path = NavigationPath::parse(path)?;
        self.insert(path.clone());
        self.last = Some(path);
        Ok(self)
    }

    /// Extend the most recently added path by one more navigation
    pub fn then_include(mut self, segment: &str) -> Result<Self, IncludeError> {
        let parent = self
            .last
            .take()
            .ok_or_else(|| IncludeError::NoParent(segment.to_string()))?;
        let path = parent.child(segment)?;
        self.insert(path.clone());
        self.last = Some(path);
        Ok(self)
    }

    /// Union of two directives, keeping `self`'s order first
    pub fn merge(mut self, other: &Include) -> Self {
        for path in &other.paths {
            self.insert(path.clone());
        }
        self
    }

    pub fn paths(&self) -> &[NavigationPath] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn insert(&mut self, path: NavigationPath) {
        if self.paths.iter().any(|existing| path.is_prefix_of(existing)) {
            return;
        }
        if let Some(pos) = self.paths.iter().position(|existing| existing.is_prefix_of(&path)) {
            self.paths[pos] = path.clone();
            self.paths
                .retain(|existing| existing == &path || !existing.is_prefix_of(&path));
            return;
        }
        self.paths.push(path);
    }
}

impl TryFrom<Vec<String>> for Include {
    type Error = IncludeError;

    fn try_from(paths: Vec<String>) -> Result<Self, Self::Error> {
        Self::of(paths)
    }
}

impl From<Include> for Vec<String> {
    fn from(include: Include) -> Self {
        include.paths.iter().map(ToString::to_string).collect()
    }
}

impl PartialEq for Include {
    fn eq(&self, other: &Self) -> bool {
        self.paths == other.paths
    }
}

impl Eq for Include {}
