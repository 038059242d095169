use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::{Resource, VirtualPath};

/// One user's view of a mount
///
/// Keyed by segments rather than the joined string: backend names may
/// contain `/` or be `..`.
type Segment = HashMap<VirtualPath, Resource>;

/// Per-user resource cache owned by one mount
///
/// Each user gets an independently locked segment, so requests from
/// different users never contend. Locks are never held across an await.
///
/// Every mutation keeps the ancestor-before-descendant invariant: an entry
/// is only inserted under a cached parent, and removing or rekeying a
/// directory carries its whole cached subtree along.
pub struct ResourceCache {
    segments: Arc<DashMap<String, Arc<RwLock<Segment>>>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        ResourceCache {
            segments: Arc::new(DashMap::new()),
        }
    }

    fn segment(&self, user: &str) -> Arc<RwLock<Segment>> {
        self.segments
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(HashMap::new())))
            .clone()
    }

    /// Get a resource from the cache
    pub fn get(&self, user: &str, path: &VirtualPath) -> Option<Resource> {
        let segment = self.segments.get(user)?.clone();
        let entries = segment.read();
        entries.get(path).cloned()
    }

    /// Check whether a path is cached
    pub fn contains(&self, user: &str, path: &VirtualPath) -> bool {
        self.segments
            .get(user)
            .map(|segment| segment.read().contains_key(path))
            .unwrap_or(false)
    }

    /// Put a resource into the cache
    ///
    /// Returns `false` (and stores nothing) when the parent is not cached.
    pub fn put(&self, user: &str, path: &VirtualPath, resource: Resource) -> bool {
        let segment = self.segment(user);
        let mut entries = segment.write();
        if let Some(parent) = path.parent() {
            if !entries.contains_key(&parent) {
                return false;
            }
        }
        entries.insert(path.clone(), resource);
        true
    }

    /// Mutate a cached resource in place; returns `false` if absent
    pub fn update<F>(&self, user: &str, path: &VirtualPath, f: F) -> bool
    where
        F: FnOnce(&mut Resource),
    {
        let Some(segment) = self.segments.get(user).map(|s| s.clone()) else {
            return false;
        };
        let mut entries = segment.write();
        match entries.get_mut(path) {
            Some(resource) => {
                f(resource);
                true
            }
            None => false,
        }
    }

    /// Remove a resource and everything cached beneath it
    ///
    /// Returns the number of removed entries.
    pub fn delete(&self, user: &str, path: &VirtualPath) -> usize {
        let Some(segment) = self.segments.get(user).map(|s| s.clone()) else {
            return 0;
        };
        let mut entries = segment.write();
        remove_subtree(&mut entries, path)
    }

    /// Atomically rekey a resource (and its subtree) from `from` to `to`
    ///
    /// Fails without touching the cache when `from` is absent or the
    /// parent of `to` is not cached. An existing entry at `to` is replaced.
    pub fn move_key(&self, user: &str, from: &VirtualPath, to: &VirtualPath) -> bool {
        let Some(segment) = self.segments.get(user).map(|s| s.clone()) else {
            return false;
        };
        let mut entries = segment.write();
        if !entries.contains_key(from) {
            return false;
        }
        if from == to {
            return true;
        }
        if let Some(parent) = to.parent() {
            if !entries.contains_key(&parent) || parent.starts_with(from) {
                return false;
            }
        }

        remove_subtree(&mut entries, to);
        let keys: Vec<VirtualPath> = entries
            .keys()
            .filter(|key| key.starts_with(from))
            .cloned()
            .collect();
        let moved: Vec<(VirtualPath, Resource)> = keys
            .into_iter()
            .filter_map(|key| entries.remove(&key).map(|res| (key, res)))
            .collect();

        for (key, resource) in moved {
            if let Some(new_path) = key.rebase(from, to) {
                entries.insert(new_path, resource);
            }
        }
        true
    }

    /// Cached direct children of a directory, sorted by name
    pub fn children(&self, user: &str, dir: &VirtualPath) -> Vec<(String, Resource)> {
        let Some(segment) = self.segments.get(user).map(|s| s.clone()) else {
            return Vec::new();
        };
        let entries = segment.read();
        let mut children: Vec<(String, Resource)> = entries
            .iter()
            .filter(|(path, _)| path.parent().as_ref() == Some(dir))
            .filter_map(|(path, res)| path.filename().map(|name| (name.to_string(), res.clone())))
            .collect();
        children.sort_by(|a, b| a.0.cmp(&b.0));
        children
    }

    /// Replace the cached children of `dir` with a fresh listing
    ///
    /// Children missing from the listing are evicted with their subtrees.
    /// Surviving directories keep their cached descendants. Returns `false`
    /// when `dir` itself is no longer cached (e.g. invalidated concurrently).
    pub fn replace_children(
        &self,
        user: &str,
        dir: &VirtualPath,
        listing: Vec<(String, Resource)>,
    ) -> bool {
        let segment = self.segment(user);
        let mut entries = segment.write();
        if !entries.contains_key(dir) {
            return false;
        }

        let fresh: HashMap<VirtualPath, Resource> = listing
            .into_iter()
            .map(|(name, res)| (dir.child(&name), res))
            .collect();

        let stale: Vec<VirtualPath> = entries
            .keys()
            .filter(|path| path.parent().as_ref() == Some(dir))
            .filter(|path| !fresh.contains_key(*path))
            .cloned()
            .collect();
        for path in &stale {
            remove_subtree(&mut entries, path);
        }

        for (key, resource) in fresh {
            // A kind change invalidates whatever was cached beneath the old entry
            if let Some(old) = entries.get(&key) {
                if old.kind != resource.kind {
                    remove_subtree(&mut entries, &key);
                }
            }
            entries.insert(key, resource);
        }
        true
    }

    /// Snapshot of every path cached for a user
    pub fn paths(&self, user: &str) -> Vec<VirtualPath> {
        self.segments
            .get(user)
            .map(|segment| segment.read().keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of entries cached for a user
    pub fn len(&self, user: &str) -> usize {
        self.segments
            .get(user)
            .map(|segment| segment.read().len())
            .unwrap_or(0)
    }

    /// Drop a user's whole segment
    pub fn clear_user(&self, user: &str) {
        self.segments.remove(user);
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ResourceCache {
    fn clone(&self) -> Self {
        ResourceCache {
            segments: Arc::clone(&self.segments),
        }
    }
}

fn remove_subtree(entries: &mut Segment, root: &VirtualPath) -> usize {
    let doomed: Vec<VirtualPath> = entries
        .keys()
        .filter(|key| key.starts_with(root))
        .cloned()
        .collect();
    for key in &doomed {
        entries.remove(key);
    }
    doomed.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::ResourceKind;

    fn dir(id: &str) -> Resource {
        Resource::directory(id)
    }

    fn file(id: &str) -> Resource {
        let mut res = Resource::directory(id);
        res.kind = ResourceKind::File;
        res
    }

    fn seeded() -> ResourceCache {
        let cache = ResourceCache::new();
        assert!(cache.put("u1", &VirtualPath::root(), dir("root")));
        assert!(cache.put("u1", &VirtualPath::parse("/a"), dir("a")));
        assert!(cache.put("u1", &VirtualPath::parse("/a/b"), dir("b")));
        assert!(cache.put("u1", &VirtualPath::parse("/a/b/c.txt"), file("c")));
        cache
    }

    #[test]
    fn test_put_requires_cached_parent() {
        let cache = ResourceCache::new();
        assert!(!cache.put("u1", &VirtualPath::parse("/a/b"), dir("b")));
        assert!(cache.get("u1", &VirtualPath::parse("/a/b")).is_none());
    }

    #[test]
    fn test_users_are_isolated() {
        let cache = seeded();
        assert!(cache.contains("u1", &VirtualPath::parse("/a")));
        assert!(!cache.contains("u2", &VirtualPath::parse("/a")));
        assert_eq!(cache.len("u2"), 0);
    }

    #[test]
    fn test_delete_removes_subtree() {
        let cache = seeded();
        assert_eq!(cache.delete("u1", &VirtualPath::parse("/a/b")), 2);
        assert!(cache.contains("u1", &VirtualPath::parse("/a")));
        assert!(!cache.contains("u1", &VirtualPath::parse("/a/b/c.txt")));
    }

    #[test]
    fn test_move_key_rekeys_subtree() {
        let cache = seeded();
        assert!(cache.move_key(
            "u1",
            &VirtualPath::parse("/a/b"),
            &VirtualPath::parse("/a/renamed")
        ));
        assert!(!cache.contains("u1", &VirtualPath::parse("/a/b")));
        let moved = cache.get("u1", &VirtualPath::parse("/a/renamed/c.txt")).unwrap();
        assert_eq!(moved.id, "c");
        assert_eq!(cache.get("u1", &VirtualPath::parse("/a/renamed")).unwrap().id, "b");
    }

    #[test]
    fn test_move_key_requires_destination_parent() {
        let cache = seeded();
        assert!(!cache.move_key(
            "u1",
            &VirtualPath::parse("/a/b"),
            &VirtualPath::parse("/missing/b")
        ));
        assert!(cache.contains("u1", &VirtualPath::parse("/a/b/c.txt")));
    }

    #[test]
    fn test_move_key_into_own_subtree_is_rejected() {
        let cache = seeded();
        assert!(!cache.move_key(
            "u1",
            &VirtualPath::parse("/a"),
            &VirtualPath::parse("/a/b/a")
        ));
    }

    #[test]
    fn test_replace_children_evicts_missing() {
        let cache = seeded();
        cache.put("u1", &VirtualPath::parse("/a/old.txt"), file("old"));
        let ok = cache.replace_children(
            "u1",
            &VirtualPath::parse("/a"),
            vec![("b".to_string(), dir("b")), ("new.txt".to_string(), file("new"))],
        );
        assert!(ok);
        assert!(!cache.contains("u1", &VirtualPath::parse("/a/old.txt")));
        assert!(cache.contains("u1", &VirtualPath::parse("/a/new.txt")));
        // surviving directory keeps its cached contents
        assert!(cache.contains("u1", &VirtualPath::parse("/a/b/c.txt")));

        let names: Vec<String> = cache
            .children("u1", &VirtualPath::parse("/a"))
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["b", "new.txt"]);
    }

    #[test]
    fn test_replace_children_of_uncached_dir_fails() {
        let cache = ResourceCache::new();
        assert!(!cache.replace_children(
            "u1",
            &VirtualPath::parse("/nowhere"),
            vec![("x".to_string(), dir("x"))]
        ));
        assert!(!cache.contains("u1", &VirtualPath::parse("/nowhere/x")));
    }

    #[test]
    fn test_names_with_separators_stay_one_segment() {
        let cache = ResourceCache::new();
        cache.put("u1", &VirtualPath::root(), dir("root"));
        let odd = VirtualPath::root().child("5a/5b");
        let dots = VirtualPath::root().child("..");
        assert!(cache.put("u1", &odd, dir("odd")));
        assert!(cache.put("u1", &odd.child("sub"), dir("sub")));
        assert!(cache.put("u1", &dots, dir("dots")));

        let names: Vec<String> = cache
            .children("u1", &VirtualPath::root())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["..", "5a/5b"]);

        // /5a is not an ancestor of the entry named "5a/5b"
        assert_eq!(cache.delete("u1", &VirtualPath::parse("/5a")), 0);
        assert_eq!(cache.delete("u1", &odd), 2);
        assert!(!cache.contains("u1", &odd.child("sub")));
        assert!(cache.contains("u1", &dots));
    }

    #[test]
    fn test_update_in_place() {
        let cache = seeded();
        assert!(cache.update("u1", &VirtualPath::parse("/a/b/c.txt"), |res| {
            res.size = Some(42)
        }));
        assert_eq!(
            cache.get("u1", &VirtualPath::parse("/a/b/c.txt")).unwrap().size,
            Some(42)
        );
        assert!(!cache.update("u1", &VirtualPath::parse("/zzz"), |_| {}));
    }
}
