//! Entity identifiers for the rights system.
//!
//! Every rights-bearing object in the platform is addressed by an
//! [`EntityId`]: applications, OAuth clients, gateways, organizations and
//! users. End devices are addressable too, but they do not carry rights of
//! their own; an end-device identifier canonicalizes to its parent
//! application (see [`EntityId::canonical`]).

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a rights-bearing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Application,
    Client,
    Gateway,
    Organization,
    User,
    EndDevice,
}

impl EntityKind {
    /// Stable label used in unique ids and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Application => "application",
            EntityKind::Client => "client",
            EntityKind::Gateway => "gateway",
            EntityKind::Organization => "organization",
            EntityKind::User => "user",
            EntityKind::EndDevice => "end_device",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a single entity.
///
/// The human-readable ids are opaque to this subsystem; uniqueness is
/// scoped per kind, so `application "foo"` and `gateway "foo"` are
/// distinct (see [`EntityId::unique_id`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityId {
    Application { application_id: String },
    Client { client_id: String },
    Gateway { gateway_id: String },
    Organization { organization_id: String },
    User { user_id: String },
    EndDevice {
        application_id: String,
        device_id: String,
    },
}

impl EntityId {
    pub fn application(id: impl Into<String>) -> Self {
        EntityId::Application {
            application_id: id.into(),
        }
    }

    pub fn client(id: impl Into<String>) -> Self {
        EntityId::Client {
            client_id: id.into(),
        }
    }

    pub fn gateway(id: impl Into<String>) -> Self {
        EntityId::Gateway {
            gateway_id: id.into(),
        }
    }

    pub fn organization(id: impl Into<String>) -> Self {
        EntityId::Organization {
            organization_id: id.into(),
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        EntityId::User {
            user_id: id.into(),
        }
    }

    pub fn end_device(application_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        EntityId::EndDevice {
            application_id: application_id.into(),
            device_id: device_id.into(),
        }
    }

    /// The kind of this identifier.
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityId::Application { .. } => EntityKind::Application,
            EntityId::Client { .. } => EntityKind::Client,
            EntityId::Gateway { .. } => EntityKind::Gateway,
            EntityId::Organization { .. } => EntityKind::Organization,
            EntityId::User { .. } => EntityKind::User,
            EntityId::EndDevice { .. } => EntityKind::EndDevice,
        }
    }

    /// The human-readable id of the rights-bearing entity.
    ///
    /// For end devices this is the parent application id, since that is
    /// where rights are held.
    pub fn id_str(&self) -> &str {
        match self {
            EntityId::Application { application_id } => application_id,
            EntityId::Client { client_id } => client_id,
            EntityId::Gateway { gateway_id } => gateway_id,
            EntityId::Organization { organization_id } => organization_id,
            EntityId::User { user_id } => user_id,
            EntityId::EndDevice { application_id, .. } => application_id,
        }
    }

    /// Whether the rights-bearing id is empty.
    ///
    /// Identifiers with empty ids are dropped during rights preloading;
    /// there is nothing to fetch rights for.
    pub fn is_empty(&self) -> bool {
        self.id_str().is_empty()
    }

    /// Maps this identifier to its underlying rights-bearing entity.
    ///
    /// End devices canonicalize to their parent application; every other
    /// kind is its own canonical form. The returned identifier is never an
    /// `EndDevice`.
    pub fn canonical(&self) -> EntityId {
        match self {
            EntityId::EndDevice { application_id, .. } => EntityId::Application {
                application_id: application_id.clone(),
            },
            other => other.clone(),
        }
    }

    /// A stable, collision-free string key for use in maps.
    ///
    /// Uniqueness is scoped per kind: `application:foo` and `gateway:foo`
    /// differ. End devices key under their canonical application.
    pub fn unique_id(&self) -> String {
        let canonical = self.canonical();
        format!("{}:{}", canonical.kind(), canonical.id_str())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::EndDevice {
                application_id,
                device_id,
            } => write!(f, "end_device:{application_id}/{device_id}"),
            other => write!(f, "{}:{}", other.kind(), other.id_str()),
        }
    }
}
