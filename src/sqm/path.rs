//! Navigable paths: the identity of from elements and resolved domain paths.

use std::fmt;

/// One dereference step, optionally aliased by an explicit join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathSegment {
    pub name: String,
    pub alias: Option<String>,
}

/// A root label plus attribute segments, e.g. `Person(p).department(d).name`.
///
/// Each root carries an id unique within one compilation, so two roots of the
/// same entity never share paths. Paths key join reuse, fetch deduplication and
/// the resolver cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavigablePath {
    root_id: u32,
    entity: String,
    alias: Option<String>,
    segments: Vec<PathSegment>,
}

impl NavigablePath {
    pub fn root(root_id: u32, entity: impl Into<String>, alias: Option<&str>) -> Self {
        Self {
            root_id,
            entity: entity.into(),
            alias: alias.map(str::to_string),
            segments: Vec::new(),
        }
    }

    pub fn append(&self, name: &str, alias: Option<&str>) -> Self {
        let mut path = self.clone();
        path.segments.push(PathSegment {
            name: name.to_string(),
            alias: alias.map(str::to_string),
        });
        path
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut path = self.clone();
        path.segments.pop();
        Some(path)
    }

    pub fn root_id(&self) -> u32 {
        self.root_id
    }

    pub fn entity_name(&self) -> &str {
        &self.entity
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(|s| s.name.as_str())
    }

    /// Alias of the element this path denotes, if it was explicitly aliased.
    pub fn alias(&self) -> Option<&str> {
        match self.segments.last() {
            Some(segment) => segment.alias.as_deref(),
            None => self.alias.as_deref(),
        }
    }

    /// Alias-free navigable role, e.g. `Person.department.name`.
    pub fn role(&self) -> String {
        let mut role = self.entity.clone();
        for segment in &self.segments {
            role.push('.');
            role.push_str(&segment.name);
        }
        role
    }

    /// Number of segments from the root.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for NavigablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entity)?;
        if let Some(alias) = &self.alias {
            write!(f, "({})", alias)?;
        }
        for segment in &self.segments {
            write!(f, ".{}", segment.name)?;
            if let Some(alias) = &segment.alias {
                write!(f, "({})", alias)?;
            }
        }
        Ok(())
    }
}
