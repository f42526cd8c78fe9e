//! Multi-body description handed to a backend.

use std::collections::HashMap;

use animat_core::convention::joint_name;
use animat_core::error::BackendError;
use animat_core::types::{BASE_LINK, LinkIndex};

use crate::link::Link;

/// A base link plus an ordered list of child links.
///
/// Child link `i` is attached to its parent by joint `i`, so link and joint
/// identities coincide and the base is [`BASE_LINK`]. Parents must appear
/// before their children.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiBodyModel {
    pub name: String,
    pub base: Link,
    pub links: Vec<Link>,
}

impl MultiBodyModel {
    pub fn new(name: impl Into<String>, base: Link) -> Self {
        Self {
            name: name.into(),
            base,
            links: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn push(&mut self, link: Link) {
        self.links.push(link);
    }

    /// Number of joints (one per child link).
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.links.len()
    }

    /// Check names are unique and every parent is the base or an earlier link.
    pub fn validate(&self) -> Result<(), BackendError> {
        self.parent_indices().map(|_| ())
    }

    /// Parent link identity of every child link, in link order.
    pub fn parent_indices(&self) -> Result<Vec<LinkIndex>, BackendError> {
        let mut seen: HashMap<&str, LinkIndex> = HashMap::new();
        seen.insert(self.base.name.as_str(), BASE_LINK);
        let mut parents = Vec::with_capacity(self.links.len());
        for (i, link) in self.links.iter().enumerate() {
            let parent = match link.parent.as_deref() {
                None => BASE_LINK,
                Some(name) => *seen
                    .get(name)
                    .ok_or_else(|| BackendError::UnknownParent(name.to_owned()))?,
            };
            let index = LinkIndex::try_from(i).map_err(|_| {
                BackendError::Unsupported(format!("too many links in {}", self.name))
            })?;
            if seen.insert(link.name.as_str(), index).is_some() {
                return Err(BackendError::Unsupported(format!(
                    "duplicate link name {}",
                    link.name
                )));
            }
            parents.push(parent);
        }
        Ok(parents)
    }

    /// Joint names in joint order.
    #[must_use]
    pub fn joint_names(&self) -> Vec<String> {
        self.links.iter().map(|l| joint_name(&l.name)).collect()
    }

    /// Sum of link masses, base included.
    #[must_use]
    pub fn total_mass(&self) -> f32 {
        self.base.mass() + self.links.iter().map(Link::mass).sum::<f32>()
    }

    /// Link by backend identity (`-1` is the base).
    #[must_use]
    pub fn link(&self, index: LinkIndex) -> Option<&Link> {
        if index == BASE_LINK {
            return Some(&self.base);
        }
        usize::try_from(index).ok().and_then(|i| self.links.get(i))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
