use async_trait::async_trait;
use axum::extract::{FromRequest, RequestParts};
use axum::http::HeaderMap;
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{forbidden_error, Error};

/// Organization type is the sole input to role resolution: a user's
/// effective access is derived from their organization, never stored
/// redundantly on the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationType {
    Shipper,
    Carrier,
    Both,
}

impl OrganizationType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "shipper" => Some(Self::Shipper),
            "carrier" => Some(Self::Carrier),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

/// The resolved identity of an authenticated caller. Credential handling
/// happens upstream; the engine only ever sees this resolved form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub org_type: OrganizationType,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new_system() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            org_id: Uuid::nil(),
            org_type: OrganizationType::Both,
            roles: vec!["system".into()],
        }
    }

    pub fn can_act_as_shipper(&self) -> bool {
        matches!(
            self.org_type,
            OrganizationType::Shipper | OrganizationType::Both
        )
    }

    pub fn can_act_as_carrier(&self) -> bool {
        matches!(
            self.org_type,
            OrganizationType::Carrier | OrganizationType::Both
        )
    }

    fn has_role(&self, role: String) -> bool {
        self.roles.iter().find(|&x| x == &role).is_some()
    }

    fn org_equals(&self, other: Uuid) -> bool {
        self.org_id == other
    }
}

impl PolarClass for Principal {
    fn get_polar_class_builder() -> oso::ClassBuilder<Principal> {
        oso::Class::builder()
            .name("Principal")
            .add_attribute_getter("user_id", |recv: &Principal| recv.user_id.clone())
            .add_attribute_getter("org_id", |recv: &Principal| recv.org_id.clone())
            .add_attribute_getter("is_shipper", |recv: &Principal| recv.can_act_as_shipper())
            .add_attribute_getter("is_carrier", |recv: &Principal| recv.can_act_as_carrier())
            .add_method("has_role", Principal::has_role)
            .add_method("org_equals", Principal::org_equals)
    }

    fn get_polar_class() -> oso::Class {
        let builder = Principal::get_polar_class_builder();
        builder.build()
    }
}

/// The upstream gateway resolves credentials and forwards the principal as
/// headers; this is the only place they are read.
#[async_trait]
impl<B> FromRequest<B> for Principal
where
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let headers = req.headers();

        let user_id = header_uuid(headers, "x-user-id")?;
        let org_id = header_uuid(headers, "x-organization-id")?;

        let org_type = headers
            .get("x-organization-type")
            .and_then(|value| value.to_str().ok())
            .and_then(OrganizationType::from_name)
            .ok_or_else(forbidden_error)?;

        let roles = headers
            .get("x-roles")
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                value
                    .split(',')
                    .map(|role| role.trim().to_string())
                    .filter(|role| !role.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            user_id,
            org_id,
            org_type,
            roles,
        })
    }
}

fn header_uuid(headers: &HeaderMap, name: &str) -> Result<Uuid, Error> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(forbidden_error)
}
