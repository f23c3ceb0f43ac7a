//! Named collections of services.

/// A named, possibly nested, collection of service names.
///
/// Members may themselves be group names; nesting is resolved depth-first
/// by the group resolver, which detects self-reference cycles.
#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    members: Vec<String>,
}

impl Group {
    /// Creates a group with the given member tokens in order.
    #[must_use]
    pub fn new(name: impl Into<String>, members: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            members: members.into_iter().collect(),
        }
    }

    /// Group name, unique within a project.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member tokens in declaration order; each is a service or group name.
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }
}
