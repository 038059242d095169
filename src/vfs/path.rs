/// Represents a path inside one mount of the virtual filesystem
///
/// Caches key on the segments; the string form (`/a/b/c`) is for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VirtualPath {
    /// Path segments (e.g., ["Biology", "worksheets", "cells.pdf"])
    segments: Vec<String>,
}

impl VirtualPath {
    /// Parse a path string into a VirtualPath
    ///
    /// Empty segments and `.` are dropped, `..` pops the previous segment.
    pub fn parse(path: &str) -> Self {
        VirtualPath::root().join(path)
    }

    /// The mount root
    pub fn root() -> Self {
        VirtualPath {
            segments: Vec::new(),
        }
    }

    /// Create a path from segments
    pub fn from_segments(segments: Vec<String>) -> Self {
        VirtualPath { segments }
    }

    /// Get the path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments (0 for the root)
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Check if this path is the mount root
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check if this path has a parent
    pub fn has_parent(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Get the parent path
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut parent_segments = self.segments.clone();
            parent_segments.pop();
            Some(VirtualPath {
                segments: parent_segments,
            })
        }
    }

    /// Get the last segment (filename)
    pub fn filename(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    /// Append a single name
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        VirtualPath { segments }
    }

    /// Path of the first segment, i.e. the mount-level entry this path lives under
    pub fn top_level(&self) -> Option<Self> {
        self.segments
            .first()
            .map(|first| VirtualPath::from_segments(vec![first.clone()]))
    }

    /// The first `depth` segments of this path
    pub fn truncate(&self, depth: usize) -> Self {
        VirtualPath {
            segments: self.segments[..depth.min(self.segments.len())].to_vec(),
        }
    }

    /// Check whether `self` equals `ancestor` or lies beneath it
    pub fn starts_with(&self, ancestor: &VirtualPath) -> bool {
        self.segments.len() >= ancestor.segments.len()
            && self.segments[..ancestor.segments.len()] == ancestor.segments[..]
    }

    /// Replace the `from` prefix of this path with `to`
    pub fn rebase(&self, from: &VirtualPath, to: &VirtualPath) -> Option<Self> {
        if !self.starts_with(from) {
            return None;
        }
        let mut segments = to.segments.clone();
        segments.extend_from_slice(&self.segments[from.segments.len()..]);
        Some(VirtualPath { segments })
    }

    /// Join this path with another
    pub fn join(&self, other: &str) -> Self {
        let mut new_segments = self.segments.clone();

        for segment in other.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            } else if segment == ".." {
                new_segments.pop();
            } else {
                new_segments.push(segment.to_string());
            }
        }

        VirtualPath {
            segments: new_segments,
        }
    }

    /// Cache key / display form
    pub fn as_key(&self) -> String {
        if self.segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.segments.join("/"))
        }
    }
}

impl std::fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let path = VirtualPath::parse("/Biology/worksheets/cells.pdf");
        assert_eq!(path.segments(), &["Biology", "worksheets", "cells.pdf"]);
        assert_eq!(path.as_key(), "/Biology/worksheets/cells.pdf");
    }

    #[test]
    fn test_parse_root() {
        assert!(VirtualPath::parse("/").is_root());
        assert!(VirtualPath::parse("").is_root());
        assert!(!VirtualPath::parse("/").has_parent());
        assert_eq!(VirtualPath::root().as_key(), "/");
    }

    #[test]
    fn test_parent() {
        let path = VirtualPath::parse("/a/b/c.txt");
        let parent = path.parent().unwrap();
        assert_eq!(parent.segments(), &["a", "b"]);
        assert!(VirtualPath::root().parent().is_none());
    }

    #[test]
    fn test_join_with_dotdot() {
        let path = VirtualPath::parse("/a/b/c");
        let joined = path.join("../d.txt");
        assert_eq!(joined.segments(), &["a", "b", "d.txt"]);
    }

    #[test]
    fn test_top_level_and_truncate() {
        let path = VirtualPath::parse("/course/sub/doc.txt");
        assert_eq!(path.top_level().unwrap().as_key(), "/course");
        assert_eq!(path.truncate(2).as_key(), "/course/sub");
        assert!(VirtualPath::root().top_level().is_none());
    }

    #[test]
    fn test_rebase() {
        let path = VirtualPath::parse("/a/old/x/y");
        let rebased = path
            .rebase(&VirtualPath::parse("/a/old"), &VirtualPath::parse("/b/new"))
            .unwrap();
        assert_eq!(rebased.as_key(), "/b/new/x/y");
        assert!(path
            .rebase(&VirtualPath::parse("/a/other"), &VirtualPath::root())
            .is_none());
    }

    #[test]
    fn test_starts_with_is_segment_aware() {
        let path = VirtualPath::parse("/ab/c");
        assert!(path.starts_with(&VirtualPath::parse("/ab")));
        assert!(!path.starts_with(&VirtualPath::parse("/a")));
        assert!(path.starts_with(&VirtualPath::root()));
    }
}
