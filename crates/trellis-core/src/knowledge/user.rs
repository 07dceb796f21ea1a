//! The user system entity and its account-field validation rules.

use serde_json::Value;
use trellis_graph::filter::{Filter, QueryTemporalAxes};
use trellis_graph::client::QueryEntitiesParams;
use trellis_graph::types::{ActorId, Entity};

use crate::context::{Authentication, GraphContext};
use crate::error::{DomainError, DomainResult};

/// Base URL of the user system entity type.
pub const USER_ENTITY_TYPE_BASE_URL: &str =
    "https://app.trellis.dev/@trellis/types/entity-type/user/";

/// Property base URLs of the user system type.
pub const SHORTNAME_PROPERTY: &str =
    "https://app.trellis.dev/@trellis/types/property-type/shortname/";
pub const EMAIL_PROPERTY: &str = "https://app.trellis.dev/@trellis/types/property-type/email/";
pub const DISPLAY_NAME_PROPERTY: &str =
    "https://app.trellis.dev/@trellis/types/property-type/display-name/";
pub const KRATOS_IDENTITY_ID_PROPERTY: &str =
    "https://app.trellis.dev/@trellis/types/property-type/kratos-identity-id/";

pub const SHORTNAME_MINIMUM_LENGTH: usize = 4;
pub const SHORTNAME_MAXIMUM_LENGTH: usize = 24;

/// Shortnames reserved for the instance and its routes.
const RESTRICTED_SHORTNAMES: &[&str] = &[
    "about", "account", "admin", "api", "app", "auth", "graphql", "health-check", "help",
    "invite", "login", "logout", "oauth2", "root", "settings", "signin", "signup", "static",
    "support", "system", "trellis", "types", "webhooks", "www",
];

pub fn shortname_contains_invalid_character(shortname: &str) -> bool {
    !shortname
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

pub fn shortname_is_restricted(shortname: &str) -> bool {
    RESTRICTED_SHORTNAMES.contains(&shortname)
}

/// Whether any web (user or organization) already uses the shortname.
pub async fn shortname_is_taken(
    ctx: &GraphContext,
    authentication: Authentication,
    shortname: &str,
) -> DomainResult<bool> {
    let entities = ctx
        .graph
        .query_entities(
            authentication.actor_id,
            &QueryEntitiesParams {
                filter: Filter::equal(["properties", SHORTNAME_PROPERTY], shortname),
                temporal_axes: QueryTemporalAxes::current_time_instant(),
                include_drafts: false,
            },
        )
        .await?;
    Ok(!entities.is_empty())
}

/// Validate a shortname a user wants to claim.
///
/// Rules, in order: allowed charset, no leading `-`, neither reserved nor
/// taken, then length bounds.
pub async fn validate_account_shortname(
    ctx: &GraphContext,
    authentication: Authentication,
    shortname: &str,
) -> DomainResult<()> {
    if shortname_contains_invalid_character(shortname) {
        return Err(DomainError::invalid_input(
            "Shortname may only contain letters, numbers, - or _",
        ));
    }
    if shortname.starts_with('-') {
        return Err(DomainError::invalid_input("Shortname cannot start with '-'"));
    }

    if shortname_is_restricted(shortname)
        || shortname_is_taken(ctx, authentication, shortname).await?
    {
        return Err(DomainError::NameTaken(shortname.to_string()));
    }

    if shortname.len() < SHORTNAME_MINIMUM_LENGTH {
        return Err(DomainError::invalid_input(
            "Shortname must be at least 4 characters long.",
        ));
    }
    if shortname.len() > SHORTNAME_MAXIMUM_LENGTH {
        return Err(DomainError::invalid_input(
            "Shortname cannot be longer than 24 characters",
        ));
    }
    Ok(())
}

/// A user as seen by the front door, re-shaped from its graph entity.
#[derive(Debug, Clone)]
pub struct User {
    pub entity: Entity,
    /// The user's account id doubles as the id of their web.
    pub account_id: ActorId,
    pub shortname: Option<String>,
    pub display_name: Option<String>,
    pub emails: Vec<String>,
    /// Both shortname and display name are set.
    pub is_account_signup_complete: bool,
}

impl User {
    pub fn from_entity(entity: Entity) -> Self {
        let string_property = |base_url: &str| {
            entity
                .property(base_url)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let shortname = string_property(SHORTNAME_PROPERTY);
        let display_name = string_property(DISPLAY_NAME_PROPERTY);
        let emails = entity
            .property(EMAIL_PROPERTY)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            account_id: ActorId(entity.entity_id.entity_uuid),
            is_account_signup_complete: shortname.is_some() && display_name.is_some(),
            shortname,
            display_name,
            emails,
            entity,
        }
    }
}

/// Load the user entity linked to a Kratos identity, `None` when the
/// identity has no graph entity yet.
pub async fn get_user_by_kratos_identity_id(
    ctx: &GraphContext,
    authentication: Authentication,
    kratos_identity_id: &str,
) -> DomainResult<Option<User>> {
    let mut entities = ctx
        .graph
        .query_entities(
            authentication.actor_id,
            &QueryEntitiesParams {
                filter: Filter::equal(
                    ["properties", KRATOS_IDENTITY_ID_PROPERTY],
                    kratos_identity_id,
                ),
                temporal_axes: QueryTemporalAxes::current_time_instant(),
                include_drafts: false,
            },
        )
        .await?;

    Ok(if entities.is_empty() {
        None
    } else {
        Some(User::from_entity(entities.swap_remove(0)))
    })
}

/// Whether the user is allowed onto this instance. Self-hosted instances
/// admit everyone; hosted ones check emails against the allowlist.
pub fn user_has_instance_access(ctx: &GraphContext, user: &User) -> bool {
    if ctx.instance.self_hosted {
        return true;
    }
    let Some(allowlist) = &ctx.instance.email_allowlist else {
        return false;
    };
    user.emails.iter().any(|email| {
        allowlist.iter().any(|entry| {
            if let Some(domain) = entry.strip_prefix('@') {
                email
                    .rsplit_once('@')
                    .is_some_and(|(_, email_domain)| email_domain.eq_ignore_ascii_case(domain))
            } else {
                email.eq_ignore_ascii_case(entry)
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trellis_graph::types::{EntityId, WebId};
    use uuid::Uuid;

    fn user_entity(properties: Value) -> Entity {
        serde_json::from_value(json!({
            "entityId": {
                "webId": WebId(Uuid::new_v4()),
                "entityUuid": Uuid::new_v4(),
            },
            "properties": properties,
        }))
        .unwrap()
    }

    #[test]
    fn invalid_characters_are_rejected() {
        assert!(shortname_contains_invalid_character("with space"));
        assert!(shortname_contains_invalid_character("émile"));
        assert!(shortname_contains_invalid_character("semi;colon"));
        assert!(!shortname_contains_invalid_character("ada-lovelace_1815"));
    }

    #[test]
    fn reserved_words_are_restricted() {
        assert!(shortname_is_restricted("admin"));
        assert!(shortname_is_restricted("api"));
        assert!(!shortname_is_restricted("ada"));
    }

    #[test]
    fn user_signup_completeness_requires_both_names() {
        let complete = User::from_entity(user_entity(json!({
            SHORTNAME_PROPERTY: "ada",
            DISPLAY_NAME_PROPERTY: "Ada Lovelace",
            EMAIL_PROPERTY: ["ada@example.com"],
        })));
        assert!(complete.is_account_signup_complete);
        assert_eq!(complete.emails, vec!["ada@example.com"]);

        let incomplete = User::from_entity(user_entity(json!({
            EMAIL_PROPERTY: ["ada@example.com"],
        })));
        assert!(!incomplete.is_account_signup_complete);
        assert_eq!(incomplete.shortname, None);
    }
}
