//! Before-update entity hooks.
//!
//! Hooks run between loading the previous entity edition and forwarding the
//! patch to the Graph API, and may veto the update. They are keyed by the
//! base URL of the entity's type.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;
use trellis_graph::patches::{
    get_defined_property_from_patches, is_value_removed_by_patches, PropertyPatch,
};
use trellis_graph::types::{BaseUrl, Entity};

use super::user::{
    user_has_instance_access, validate_account_shortname, User, DISPLAY_NAME_PROPERTY,
    EMAIL_PROPERTY, SHORTNAME_PROPERTY, USER_ENTITY_TYPE_BASE_URL,
};
use crate::context::{Authentication, GraphContext};
use crate::error::{DomainError, DomainResult};

#[async_trait]
pub trait BeforeUpdateEntityHook: Send + Sync {
    async fn on_before_update(
        &self,
        ctx: &GraphContext,
        authentication: Authentication,
        previous_entity: &Entity,
        property_patches: &[PropertyPatch],
    ) -> DomainResult<()>;
}

/// Registry of before-update hooks, keyed by entity type base URL.
#[derive(Default)]
pub struct UpdateHookRegistry {
    before_update: HashMap<String, Box<dyn BeforeUpdateEntityHook>>,
}

impl UpdateHookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks for all system types guarded by the front door.
    pub fn with_system_hooks() -> Self {
        let mut registry = Self::new();
        registry.register(
            BaseUrl::new(USER_ENTITY_TYPE_BASE_URL),
            UserBeforeUpdateHook,
        );
        registry
    }

    pub fn register(
        &mut self,
        entity_type_base_url: BaseUrl,
        hook: impl BeforeUpdateEntityHook + 'static,
    ) {
        self.before_update
            .insert(entity_type_base_url.0, Box::new(hook));
    }

    /// Run the before-update hook registered for the entity's type, if any.
    pub async fn run_before_update(
        &self,
        ctx: &GraphContext,
        authentication: Authentication,
        entity_type_base_url: &BaseUrl,
        previous_entity: &Entity,
        property_patches: &[PropertyPatch],
    ) -> DomainResult<()> {
        if let Some(hook) = self.before_update.get(entity_type_base_url.as_str()) {
            hook.on_before_update(ctx, authentication, previous_entity, property_patches)
                .await?;
        }
        Ok(())
    }
}

/// Guards shortname/email immutability on user entities and finalizes
/// account signup.
pub struct UserBeforeUpdateHook;

#[async_trait]
impl BeforeUpdateEntityHook for UserBeforeUpdateHook {
    async fn on_before_update(
        &self,
        ctx: &GraphContext,
        _authentication: Authentication,
        previous_entity: &Entity,
        property_patches: &[PropertyPatch],
    ) -> DomainResult<()> {
        let user = User::from_entity(previous_entity.clone());

        if is_value_removed_by_patches(SHORTNAME_PROPERTY, property_patches) {
            return Err(DomainError::invalid_input("Cannot unset shortname"));
        }
        if is_value_removed_by_patches(EMAIL_PROPERTY, property_patches) {
            return Err(DomainError::invalid_input("Cannot unset email"));
        }

        if let Some(updated_emails) =
            get_defined_property_from_patches(property_patches, EMAIL_PROPERTY)
        {
            let mut updated: Vec<&str> = updated_emails
                .as_array()
                .map(|values| values.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let mut current: Vec<&str> = user.emails.iter().map(String::as_str).collect();
            updated.sort_unstable();
            current.sort_unstable();
            if updated != current {
                return Err(DomainError::invalid_input("Cannot change email"));
            }
        }

        let updated_shortname =
            get_defined_property_from_patches(property_patches, SHORTNAME_PROPERTY)
                .and_then(Value::as_str);

        if let Some(updated_shortname) = updated_shortname {
            match &user.shortname {
                Some(current) => {
                    if current != updated_shortname {
                        return Err(DomainError::invalid_input("Cannot change shortname"));
                    }
                }
                // Only a first-time shortname is validated; re-submitting the
                // existing one would otherwise fail the taken check.
                None => {
                    validate_account_shortname(
                        ctx,
                        Authentication {
                            actor_id: user.account_id,
                        },
                        updated_shortname,
                    )
                    .await?;
                }
            }
        }

        // A defined display name must be a non-empty string; `null`, `""`
        // and non-string values all amount to unsetting it.
        let updated_display_name =
            get_defined_property_from_patches(property_patches, DISPLAY_NAME_PROPERTY);
        let display_name_unset = updated_display_name
            .is_some_and(|value| !matches!(value, Value::String(name) if !name.is_empty()));
        if display_name_unset
            || is_value_removed_by_patches(DISPLAY_NAME_PROPERTY, property_patches)
        {
            return Err(DomainError::invalid_input("Cannot unset display name"));
        }

        let completes_signup = !user.is_account_signup_complete
            && updated_shortname.is_some()
            && updated_display_name.is_some();

        if completes_signup {
            if !user_has_instance_access(ctx, &user) {
                return Err(DomainError::Forbidden(
                    "The user does not have access to this instance, and therefore cannot \
                     complete account signup."
                        .to_string(),
                ));
            }

            // Signup is complete: hand the user administration of their own
            // web so they can create entities and types. Issued as the
            // system account, the user cannot grant this to themselves.
            ctx.graph
                .add_actor_group_administrator(
                    ctx.system_account,
                    user.account_id,
                    user.account_id,
                )
                .await?;

            info!(account_id = %user.account_id, "Account signup completed");
        }

        Ok(())
    }
}
