//! Rights, rights sets and authentication info.
//!
//! A [`Right`] is one atomic capability over an entity (or, for a few
//! rights, over the whole platform). Handlers never compare rights
//! directly; they go through [`Rights`] set algebra so that checks are
//! order-independent.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One atomic capability.
///
/// Wire names follow the identity registry's protobuf enum
/// (`APPLICATION_INFO`, `GATEWAY_SETTINGS_BASIC`, ...). The set is grouped
/// per entity kind, with a handful of universal rights granted to service
/// operators (`SEND_INVITES` and friends).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Right {
    // Application rights.
    ApplicationInfo,
    ApplicationSettingsBasic,
    ApplicationSettingsApiKeys,
    ApplicationSettingsCollaborators,
    ApplicationDelete,
    ApplicationDevicesRead,
    ApplicationDevicesWrite,
    ApplicationDevicesReadKeys,
    ApplicationDevicesWriteKeys,
    ApplicationLink,
    ApplicationTrafficRead,
    ApplicationTrafficUpWrite,
    ApplicationTrafficDownWrite,

    // OAuth client rights.
    ClientInfo,
    ClientSettingsBasic,
    ClientDelete,

    // Gateway rights.
    GatewayInfo,
    GatewaySettingsBasic,
    GatewaySettingsApiKeys,
    GatewaySettingsCollaborators,
    GatewayDelete,
    GatewayTrafficRead,
    GatewayTrafficDownWrite,
    GatewayLink,
    GatewayStatusRead,
    GatewayLocationRead,

    // Organization rights.
    OrganizationInfo,
    OrganizationSettingsBasic,
    OrganizationSettingsApiKeys,
    OrganizationSettingsMembers,
    OrganizationDelete,
    OrganizationApplicationsList,
    OrganizationApplicationsCreate,
    OrganizationGatewaysList,
    OrganizationGatewaysCreate,
    OrganizationClientsList,
    OrganizationClientsCreate,
    OrganizationAddAsCollaborator,

    // User rights.
    UserInfo,
    UserSettingsBasic,
    UserSettingsApiKeys,
    UserDelete,
    UserAuthorizedClients,
    UserApplicationsList,
    UserApplicationsCreate,
    UserGatewaysList,
    UserGatewaysCreate,
    UserClientsList,
    UserClientsCreate,
    UserOrganizationsList,
    UserOrganizationsCreate,
    UserNotificationsRead,

    // Universal rights.
    SendInvites,
}

impl Right {
    /// All defined rights, in declaration order.
    pub const ALL: &'static [Right] = &[
        Right::ApplicationInfo,
        Right::ApplicationSettingsBasic,
        Right::ApplicationSettingsApiKeys,
        Right::ApplicationSettingsCollaborators,
        Right::ApplicationDelete,
        Right::ApplicationDevicesRead,
        Right::ApplicationDevicesWrite,
        Right::ApplicationDevicesReadKeys,
        Right::ApplicationDevicesWriteKeys,
        Right::ApplicationLink,
        Right::ApplicationTrafficRead,
        Right::ApplicationTrafficUpWrite,
        Right::ApplicationTrafficDownWrite,
        Right::ClientInfo,
        Right::ClientSettingsBasic,
        Right::ClientDelete,
        Right::GatewayInfo,
        Right::GatewaySettingsBasic,
        Right::GatewaySettingsApiKeys,
        Right::GatewaySettingsCollaborators,
        Right::GatewayDelete,
        Right::GatewayTrafficRead,
        Right::GatewayTrafficDownWrite,
        Right::GatewayLink,
        Right::GatewayStatusRead,
        Right::GatewayLocationRead,
        Right::OrganizationInfo,
        Right::OrganizationSettingsBasic,
        Right::OrganizationSettingsApiKeys,
        Right::OrganizationSettingsMembers,
        Right::OrganizationDelete,
        Right::OrganizationApplicationsList,
        Right::OrganizationApplicationsCreate,
        Right::OrganizationGatewaysList,
        Right::OrganizationGatewaysCreate,
        Right::OrganizationClientsList,
        Right::OrganizationClientsCreate,
        Right::OrganizationAddAsCollaborator,
        Right::UserInfo,
        Right::UserSettingsBasic,
        Right::UserSettingsApiKeys,
        Right::UserDelete,
        Right::UserAuthorizedClients,
        Right::UserApplicationsList,
        Right::UserApplicationsCreate,
        Right::UserGatewaysList,
        Right::UserGatewaysCreate,
        Right::UserClientsList,
        Right::UserClientsCreate,
        Right::UserOrganizationsList,
        Right::UserOrganizationsCreate,
        Right::UserNotificationsRead,
        Right::SendInvites,
    ];

    /// The wire name of this right.
    pub fn as_str(self) -> &'static str {
        match self {
            Right::ApplicationInfo => "APPLICATION_INFO",
            Right::ApplicationSettingsBasic => "APPLICATION_SETTINGS_BASIC",
            Right::ApplicationSettingsApiKeys => "APPLICATION_SETTINGS_API_KEYS",
            Right::ApplicationSettingsCollaborators => "APPLICATION_SETTINGS_COLLABORATORS",
            Right::ApplicationDelete => "APPLICATION_DELETE",
            Right::ApplicationDevicesRead => "APPLICATION_DEVICES_READ",
            Right::ApplicationDevicesWrite => "APPLICATION_DEVICES_WRITE",
            Right::ApplicationDevicesReadKeys => "APPLICATION_DEVICES_READ_KEYS",
            Right::ApplicationDevicesWriteKeys => "APPLICATION_DEVICES_WRITE_KEYS",
            Right::ApplicationLink => "APPLICATION_LINK",
            Right::ApplicationTrafficRead => "APPLICATION_TRAFFIC_READ",
            Right::ApplicationTrafficUpWrite => "APPLICATION_TRAFFIC_UP_WRITE",
            Right::ApplicationTrafficDownWrite => "APPLICATION_TRAFFIC_DOWN_WRITE",
            Right::ClientInfo => "CLIENT_INFO",
            Right::ClientSettingsBasic => "CLIENT_SETTINGS_BASIC",
            Right::ClientDelete => "CLIENT_DELETE",
            Right::GatewayInfo => "GATEWAY_INFO",
            Right::GatewaySettingsBasic => "GATEWAY_SETTINGS_BASIC",
            Right::GatewaySettingsApiKeys => "GATEWAY_SETTINGS_API_KEYS",
            Right::GatewaySettingsCollaborators => "GATEWAY_SETTINGS_COLLABORATORS",
            Right::GatewayDelete => "GATEWAY_DELETE",
            Right::GatewayTrafficRead => "GATEWAY_TRAFFIC_READ",
            Right::GatewayTrafficDownWrite => "GATEWAY_TRAFFIC_DOWN_WRITE",
            Right::GatewayLink => "GATEWAY_LINK",
            Right::GatewayStatusRead => "GATEWAY_STATUS_READ",
            Right::GatewayLocationRead => "GATEWAY_LOCATION_READ",
            Right::OrganizationInfo => "ORGANIZATION_INFO",
            Right::OrganizationSettingsBasic => "ORGANIZATION_SETTINGS_BASIC",
            Right::OrganizationSettingsApiKeys => "ORGANIZATION_SETTINGS_API_KEYS",
            Right::OrganizationSettingsMembers => "ORGANIZATION_SETTINGS_MEMBERS",
            Right::OrganizationDelete => "ORGANIZATION_DELETE",
            Right::OrganizationApplicationsList => "ORGANIZATION_APPLICATIONS_LIST",
            Right::OrganizationApplicationsCreate => "ORGANIZATION_APPLICATIONS_CREATE",
            Right::OrganizationGatewaysList => "ORGANIZATION_GATEWAYS_LIST",
            Right::OrganizationGatewaysCreate => "ORGANIZATION_GATEWAYS_CREATE",
            Right::OrganizationClientsList => "ORGANIZATION_CLIENTS_LIST",
            Right::OrganizationClientsCreate => "ORGANIZATION_CLIENTS_CREATE",
            Right::OrganizationAddAsCollaborator => "ORGANIZATION_ADD_AS_COLLABORATOR",
            Right::UserInfo => "USER_INFO",
            Right::UserSettingsBasic => "USER_SETTINGS_BASIC",
            Right::UserSettingsApiKeys => "USER_SETTINGS_API_KEYS",
            Right::UserDelete => "USER_DELETE",
            Right::UserAuthorizedClients => "USER_AUTHORIZED_CLIENTS",
            Right::UserApplicationsList => "USER_APPLICATIONS_LIST",
            Right::UserApplicationsCreate => "USER_APPLICATIONS_CREATE",
            Right::UserGatewaysList => "USER_GATEWAYS_LIST",
            Right::UserGatewaysCreate => "USER_GATEWAYS_CREATE",
            Right::UserClientsList => "USER_CLIENTS_LIST",
            Right::UserClientsCreate => "USER_CLIENTS_CREATE",
            Right::UserOrganizationsList => "USER_ORGANIZATIONS_LIST",
            Right::UserOrganizationsCreate => "USER_ORGANIZATIONS_CREATE",
            Right::UserNotificationsRead => "USER_NOTIFICATIONS_READ",
            Right::SendInvites => "SEND_INVITES",
        }
    }
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Right {
    type Err = UnknownRight;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Right::ALL
            .iter()
            .copied()
            .find(|right| right.as_str() == value)
            .ok_or_else(|| UnknownRight(value.to_string()))
    }
}

/// Error returned when parsing an unknown right name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown right: {0}")]
pub struct UnknownRight(pub String);

/// An unordered set of rights with set algebra.
///
/// The empty set is a meaningful value ("the caller holds no rights on
/// this entity"); absence of a set entirely is represented one level up,
/// in [`EntityRights`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rights(BTreeSet<Right>);

impl Rights {
    pub fn new() -> Self {
        Rights(BTreeSet::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, right: Right) -> bool {
        self.0.contains(&right)
    }

    /// Whether this set holds every one of `required`.
    pub fn includes(&self, required: &[Right]) -> bool {
        required.iter().all(|right| self.0.contains(right))
    }

    /// The required rights not held by this set, in `required` order
    /// (duplicates removed).
    pub fn missing(&self, required: &[Right]) -> Vec<Right> {
        let mut seen = BTreeSet::new();
        required
            .iter()
            .copied()
            .filter(|right| !self.0.contains(right) && seen.insert(*right))
            .collect()
    }

    /// The union of this set and `other`.
    pub fn union(&self, other: &Rights) -> Rights {
        Rights(self.0.union(&other.0).copied().collect())
    }

    /// This set with every right in `other` removed.
    pub fn sub(&self, other: &Rights) -> Rights {
        Rights(self.0.difference(&other.0).copied().collect())
    }

    pub fn insert(&mut self, right: Right) {
        self.0.insert(right);
    }

    pub fn iter(&self) -> impl Iterator<Item = Right> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Right> for Rights {
    fn from_iter<I: IntoIterator<Item = Right>>(iter: I) -> Self {
        Rights(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Right; N]> for Rights {
    fn from(rights: [Right; N]) -> Self {
        rights.into_iter().collect()
    }
}

impl From<&[Right]> for Rights {
    fn from(rights: &[Right]) -> Self {
        rights.iter().copied().collect()
    }
}

/// Authentication metadata of the calling credentials.
///
/// Universal rights apply regardless of entity; the admin flag marks
/// operator credentials that bypass per-entity membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    #[serde(default)]
    pub universal_rights: Rights,
    #[serde(default)]
    pub is_admin: bool,
}
