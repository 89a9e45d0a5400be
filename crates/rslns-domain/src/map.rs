//! The per-request rights map.

use std::collections::HashMap;

use crate::identifiers::{EntityId, EntityKind};
use crate::rights::Rights;

/// Rights of the caller over the entities named in one request.
///
/// One map per rights-bearing entity kind, keyed by
/// [`EntityId::unique_id`]. An absent key means the rights were not
/// fetched or the caller is not authorized on that entity; the assertion
/// layer treats both the same as an empty set. The map is built by the
/// preload hook and immutable for the rest of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRights {
    pub application: HashMap<String, Rights>,
    pub client: HashMap<String, Rights>,
    pub gateway: HashMap<String, Rights>,
    pub organization: HashMap<String, Rights>,
    pub user: HashMap<String, Rights>,
}

impl EntityRights {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_for(&self, kind: EntityKind) -> Option<&HashMap<String, Rights>> {
        match kind {
            EntityKind::Application => Some(&self.application),
            EntityKind::Client => Some(&self.client),
            EntityKind::Gateway => Some(&self.gateway),
            EntityKind::Organization => Some(&self.organization),
            EntityKind::User => Some(&self.user),
            EntityKind::EndDevice => None,
        }
    }

    /// The rights held on `id`, or `None` if the entity was never fetched.
    ///
    /// End-device identifiers are looked up under their canonical
    /// application.
    pub fn get(&self, id: &EntityId) -> Option<&Rights> {
        let canonical = id.canonical();
        self.map_for(canonical.kind())?.get(&canonical.unique_id())
    }

    /// Stores `rights` under the canonical form of `id`.
    pub fn insert(&mut self, id: &EntityId, rights: Rights) {
        let canonical = id.canonical();
        let unique_id = canonical.unique_id();
        let map = match canonical.kind() {
            EntityKind::Application => &mut self.application,
            EntityKind::Client => &mut self.client,
            EntityKind::Gateway => &mut self.gateway,
            EntityKind::Organization => &mut self.organization,
            EntityKind::User => &mut self.user,
            // canonical() never yields an end device
            EntityKind::EndDevice => unreachable!("end device is never canonical"),
        };
        map.insert(unique_id, rights);
    }

    pub fn is_empty(&self) -> bool {
        self.application.is_empty()
            && self.client.is_empty()
            && self.gateway.is_empty()
            && self.organization.is_empty()
            && self.user.is_empty()
    }
}
