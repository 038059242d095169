use async_trait::async_trait;

use super::RootView;
use crate::backend::types::{COURSE_STUDENT, COURSE_SUBSTITUTE, COURSE_TEACHER};
use crate::backend::{Backend, BackendResult, ListScope};
use crate::session::Session;
use crate::vfs::{Permissions, Resource, VirtualPath};

/// Files of the courses the user attends, teaches or substitutes in
///
/// Each course is a synthesized directory whose id doubles as the owner id
/// of everything below it.
pub struct CoursesView;

impl CoursesView {
    pub fn new() -> Self {
        CoursesView
    }
}

impl Default for CoursesView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RootView for CoursesView {
    fn name(&self) -> &str {
        "courses"
    }

    fn description(&self) -> &str {
        "Course files"
    }

    async fn list_top_level(
        &self,
        backend: &dyn Backend,
        session: &Session,
    ) -> BackendResult<Vec<(String, Resource)>> {
        let courses = backend.list_courses(session).await?;
        Ok(courses
            .into_iter()
            .map(|course| {
                let mut entry = Resource::directory(course.id.clone());
                entry.scope_role = course.role_of(&session.uid).map(str::to_string);
                entry.pending = true;
                (course.name, entry)
            })
            .collect())
    }

    fn listing_scope(
        &self,
        _session: &Session,
        dir: &VirtualPath,
        dir_res: &Resource,
        top: Option<&Resource>,
    ) -> Option<ListScope> {
        if dir.is_root() {
            return None;
        }
        let top = top?;
        let parent = (dir.depth() > 1).then(|| dir_res.id.clone());
        Some(ListScope::new(top.id.clone(), parent))
    }

    fn descend(&self, entry: &Resource) -> Permissions {
        match entry.scope_role.as_deref() {
            Some(COURSE_TEACHER) | Some(COURSE_SUBSTITUTE) => Permissions::all(),
            Some(COURSE_STUDENT) => Permissions::read_only(),
            _ => Permissions::none(),
        }
    }

    fn is_virtual(&self, path: &VirtualPath) -> bool {
        path.depth() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_uses_course_id_as_owner() {
        let view = CoursesView::new();
        let session = Session::new("u1", "ada", "t");
        let course = Resource::directory("c1");

        assert!(
            view.listing_scope(&session, &VirtualPath::root(), &course, None)
                .is_none()
        );

        let at_course = view
            .listing_scope(&session, &VirtualPath::parse("/Bio"), &course, Some(&course))
            .unwrap();
        assert_eq!(at_course, ListScope::new("c1", None));

        let below = view
            .listing_scope(
                &session,
                &VirtualPath::parse("/Bio/labs"),
                &Resource::directory("d9"),
                Some(&course),
            )
            .unwrap();
        assert_eq!(below, ListScope::new("c1", Some("d9".into())));
    }

    #[test]
    fn test_descend_by_course_role() {
        let view = CoursesView::new();
        let mut entry = Resource::directory("c1");
        entry.scope_role = Some(COURSE_TEACHER.into());
        assert_eq!(view.descend(&entry), Permissions::all());
        entry.scope_role = Some(COURSE_STUDENT.into());
        assert_eq!(view.descend(&entry), Permissions::read_only());
        entry.scope_role = None;
        assert_eq!(view.descend(&entry), Permissions::none());
    }
}
