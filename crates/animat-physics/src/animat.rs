//! Name-keyed registry of one simulated body.
//!
//! [`Animat`] owns the mapping from canonical link and joint names to the
//! integer identities the backend assigned when the body was created. It is
//! built once and never changes afterwards. Dynamics queries and mutations go
//! through it so callers never handle raw indices.

use std::collections::HashMap;

use animat_core::error::{AnimatError, BackendError, RegistryError};
use animat_core::types::{BASE_LINK, BodyId, JointIndex, LinkIndex};
use tracing::debug;

use crate::backend::{DynamicsInfo, DynamicsUpdate, PhysicsBackend, joint_range};
use crate::model::MultiBodyModel;

/// Link and joint registry of one simulated body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animat {
    identity: BodyId,
    base_link: String,
    links: HashMap<String, LinkIndex>,
    joints: HashMap<String, JointIndex>,
}

impl Animat {
    /// Instantiate `model` in `backend` and register its links and joints.
    pub fn spawn<B>(backend: &mut B, model: &MultiBodyModel) -> Result<Self, BackendError>
    where
        B: PhysicsBackend + ?Sized,
    {
        let identity = backend.create_multi_body(model)?;
        let animat = Self::from_backend(backend, identity, &model.base.name)?;
        debug!(
            body = %identity,
            model = %model.name,
            joints = animat.joints.len(),
            "Spawned animat"
        );
        Ok(animat)
    }

    /// Build the registry of an existing backend body.
    pub fn from_backend<B>(
        backend: &B,
        identity: BodyId,
        base_link: &str,
    ) -> Result<Self, BackendError>
    where
        B: PhysicsBackend + ?Sized,
    {
        let mut links = HashMap::from([(base_link.to_owned(), BASE_LINK)]);
        links.extend(Self::links_info(backend, identity)?);
        Ok(Self {
            identity,
            base_link: base_link.to_owned(),
            links,
            joints: Self::joints_info(backend, identity)?,
        })
    }

    // -----------------------------------------------------------------------
    // Backend introspection
    // -----------------------------------------------------------------------

    /// `{joint name -> joint identity}` as reported by the backend.
    pub fn joints_info<B>(
        backend: &B,
        identity: BodyId,
    ) -> Result<HashMap<String, JointIndex>, BackendError>
    where
        B: PhysicsBackend + ?Sized,
    {
        joint_range(identity, backend.joint_count(identity)?)?
            .map(|j| backend.joint_info(identity, j).map(|info| (info.name, info.index)))
            .collect()
    }

    /// `{child link name -> link identity}`, base excluded.
    ///
    /// The child of joint `j` has identity `j`, which holds for any tree.
    pub fn links_info<B>(
        backend: &B,
        identity: BodyId,
    ) -> Result<HashMap<String, LinkIndex>, BackendError>
    where
        B: PhysicsBackend + ?Sized,
    {
        joint_range(identity, backend.joint_count(identity)?)?
            .map(|j| {
                backend
                    .joint_info(identity, j)
                    .map(|info| (info.link_name, info.index))
            })
            .collect()
    }

    /// `{base_link: -1}` merged with `{child link name -> parent index + 1}`.
    ///
    /// On a serial chain this is each link's own identity. On branching
    /// trees it is not, which is why the registry uses
    /// [`links_info`](Self::links_info) instead.
    pub fn parent_links_info<B>(
        backend: &B,
        identity: BodyId,
        base_link: &str,
    ) -> Result<HashMap<String, LinkIndex>, BackendError>
    where
        B: PhysicsBackend + ?Sized,
    {
        let mut links = HashMap::from([(base_link.to_owned(), BASE_LINK)]);
        for j in joint_range(identity, backend.joint_count(identity)?)? {
            let info = backend.joint_info(identity, j)?;
            links.insert(info.link_name, info.parent_index + 1);
        }
        Ok(links)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub const fn identity(&self) -> BodyId {
        self.identity
    }

    #[must_use]
    pub fn base_link(&self) -> &str {
        &self.base_link
    }

    #[must_use]
    pub const fn links(&self) -> &HashMap<String, LinkIndex> {
        &self.links
    }

    #[must_use]
    pub const fn joints(&self) -> &HashMap<String, JointIndex> {
        &self.joints
    }

    /// Identity of link `name`.
    pub fn link(&self, name: &str) -> Result<LinkIndex, RegistryError> {
        self.links
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownLink(name.to_owned()))
    }

    /// Identity of joint `name`.
    pub fn joint(&self, name: &str) -> Result<JointIndex, RegistryError> {
        self.joints
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownJoint(name.to_owned()))
    }

    /// Link names sorted by identity, base first.
    #[must_use]
    pub fn link_names(&self) -> Vec<&str> {
        sorted_by_identity(&self.links)
    }

    /// Joint names sorted by identity.
    #[must_use]
    pub fn joint_names(&self) -> Vec<&str> {
        sorted_by_identity(&self.joints)
    }

    /// Number of joints, as the backend reports it.
    pub fn joint_count<B>(&self, backend: &B) -> Result<usize, BackendError>
    where
        B: PhysicsBackend + ?Sized,
    {
        backend.joint_count(self.identity)
    }

    /// `[-1, 0, 1, .., joint_count - 1]`.
    pub fn link_identities<B>(&self, backend: &B) -> Result<Vec<LinkIndex>, BackendError>
    where
        B: PhysicsBackend + ?Sized,
    {
        let count = self.joint_count(backend)?;
        Ok(std::iter::once(BASE_LINK)
            .chain(joint_range(self.identity, count)?)
            .collect())
    }

    /// `[0, 1, .., joint_count - 1]`.
    pub fn joint_identities<B>(&self, backend: &B) -> Result<Vec<JointIndex>, BackendError>
    where
        B: PhysicsBackend + ?Sized,
    {
        Ok(joint_range(self.identity, self.joint_count(backend)?)?.collect())
    }

    // -----------------------------------------------------------------------
    // Dynamics queries
    // -----------------------------------------------------------------------

    /// Dynamics record of link `name`.
    pub fn dynamics_info<B>(&self, backend: &B, name: &str) -> Result<DynamicsInfo, AnimatError>
    where
        B: PhysicsBackend + ?Sized,
    {
        let link = self.link(name)?;
        Ok(backend.dynamics_info(self.identity, link)?)
    }

    /// Sum of the backend mass of every registered link.
    pub fn total_mass<B>(&self, backend: &B) -> Result<f32, BackendError>
    where
        B: PhysicsBackend + ?Sized,
    {
        self.links.values().try_fold(0.0_f32, |total, &link| {
            let info = backend.dynamics_info(self.identity, link)?;
            Ok::<_, BackendError>(total + info.mass)
        })
    }

    /// Debug-log the link and joint tables.
    pub fn log_information<B>(&self, backend: &B) -> Result<(), BackendError>
    where
        B: PhysicsBackend + ?Sized,
    {
        let links: Vec<String> = self
            .link_names()
            .into_iter()
            .map(|name| format!("  {name}: {}", self.links[name]))
            .collect();
        debug!("Links ids:\n{}", links.join("\n"));

        let mut joints = Vec::with_capacity(self.joints.len());
        for name in self.joint_names() {
            let index = self.joints[name];
            let kind = backend.joint_info(self.identity, index)?.kind;
            joints.push(format!("  {name}: {index} (type: {kind})"));
        }
        debug!("Joints ids:\n{}", joints.join("\n"));
        Ok(())
    }

    /// Debug-log dynamics of `links` (every link when `None`) and the total mass.
    pub fn log_dynamics_info<B>(&self, backend: &B, links: Option<&[&str]>) -> Result<(), AnimatError>
    where
        B: PhysicsBackend + ?Sized,
    {
        let names = links.map_or_else(|| self.link_names(), <[&str]>::to_vec);
        debug!("Dynamics:");
        for name in names {
            let info = self.dynamics_info(backend, name)?;
            debug!("  - {name}:\n{info}");
        }
        debug!("Model mass: {} [kg]", self.total_mass(backend)?);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Set the collision filter of every link in `links`.
    ///
    /// All names are resolved before the backend is touched.
    pub fn set_collisions<B>(
        &self,
        backend: &mut B,
        links: &[&str],
        group: u32,
        mask: u32,
    ) -> Result<(), AnimatError>
    where
        B: PhysicsBackend + ?Sized,
    {
        let indices = links
            .iter()
            .map(|name| self.link(name))
            .collect::<Result<Vec<_>, _>>()?;
        for link in indices {
            backend.set_collision_filter(self.identity, link, group, mask)?;
        }
        Ok(())
    }

    /// Override dynamics of link `link`.
    pub fn set_link_dynamics<B>(
        &self,
        backend: &mut B,
        link: &str,
        update: &DynamicsUpdate,
    ) -> Result<(), AnimatError>
    where
        B: PhysicsBackend + ?Sized,
    {
        let index = self.link(link)?;
        backend.set_dynamics(self.identity, index, update)?;
        Ok(())
    }

    /// Override dynamics of the child link of joint `joint`.
    pub fn set_joint_dynamics<B>(
        &self,
        backend: &mut B,
        joint: &str,
        update: &DynamicsUpdate,
    ) -> Result<(), AnimatError>
    where
        B: PhysicsBackend + ?Sized,
    {
        let index = self.joint(joint)?;
        backend.set_dynamics(self.identity, index, update)?;
        Ok(())
    }
}

fn sorted_by_identity(map: &HashMap<String, i32>) -> Vec<&str> {
    let mut entries: Vec<(&str, i32)> = map.iter().map(|(k, &v)| (k.as_str(), v)).collect();
    entries.sort_by_key(|&(name, index)| (index, name));
    entries.into_iter().map(|(name, _)| name).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_by_identity_puts_base_first() {
        let map = HashMap::from([
            ("link_body_1".to_owned(), 0),
            ("link_body_0".to_owned(), -1),
            ("link_body_2".to_owned(), 1),
        ]);
        assert_eq!(
            sorted_by_identity(&map),
            vec!["link_body_0", "link_body_1", "link_body_2"]
        );
    }
}
