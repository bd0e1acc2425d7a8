//! Listener default-action chains.
//!
//! With an authentication strategy the chain is authenticate (order 1)
//! then forward (order 2); without one it is forward (order 1) alone.

use mbdeploy_common::constants::HTTPS_PORT;
use mbdeploy_common::error::Result;
use mbdeploy_common::types::Secret;
use serde::Serialize;
use serde_json::Value;

use crate::resolver::{AuthStrategy, OidcEndpoints};

/// One listener default action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ListenerAction {
    /// Authenticate the caller against an OpenID Connect provider.
    #[serde(rename_all = "camelCase")]
    AuthenticateOidc {
        /// Position in the chain.
        order: u32,
        /// Provider parameters.
        authenticate_oidc: OidcAction,
    },
    /// Forward to a target group.
    #[serde(rename_all = "camelCase")]
    Forward {
        /// Position in the chain.
        order: u32,
        /// Target group ARN.
        target_group_arn: String,
    },
    /// Redirect to another port and protocol.
    Redirect {
        /// Redirect parameters.
        redirect: Redirect,
    },
}

impl ListenerAction {
    /// Returns the position of the action in its chain.
    #[must_use]
    pub const fn order(&self) -> Option<u32> {
        match self {
            Self::AuthenticateOidc { order, .. } | Self::Forward { order, .. } => Some(*order),
            Self::Redirect { .. } => None,
        }
    }
}

/// Parameters of an OIDC authenticate action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcAction {
    /// Behaviour on unauthenticated requests.
    pub on_unauthenticated_request: String,
    /// Token issuer.
    pub issuer: String,
    /// Authorization endpoint.
    pub authorization_endpoint: String,
    /// Token endpoint.
    pub token_endpoint: String,
    /// User info endpoint.
    pub user_info_endpoint: String,
    /// Client ID.
    pub client_id: String,
    /// Client secret, redacted when serialized.
    pub client_secret: Secret,
}

/// Parameters of a redirect action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    /// Target protocol.
    pub protocol: String,
    /// Target port.
    pub port: String,
    /// HTTP status code token.
    pub status_code: String,
}

/// Builds the default-action chain of the public listener.
#[must_use]
pub fn default_actions(auth: Option<&AuthStrategy>, target_group_arn: &str) -> Vec<ListenerAction> {
    let mut actions = Vec::with_capacity(2);
    if let Some(strategy) = auth {
        let OidcEndpoints {
            issuer,
            authorization_endpoint,
            token_endpoint,
            user_info_endpoint,
        } = strategy.endpoints();
        actions.push(ListenerAction::AuthenticateOidc {
            order: 1,
            authenticate_oidc: OidcAction {
                on_unauthenticated_request: "authenticate".to_string(),
                issuer,
                authorization_endpoint,
                token_endpoint,
                user_info_endpoint,
                client_id: strategy.client().client_id.clone(),
                client_secret: strategy.client().client_secret.clone(),
            },
        });
    }
    actions.push(ListenerAction::Forward {
        order: if auth.is_some() { 2 } else { 1 },
        target_group_arn: target_group_arn.to_string(),
    });
    actions
}

/// Renders an action chain with real client secrets in place of the
/// redacted ones.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_exposed_json(actions: &[ListenerAction]) -> Result<Secret> {
    let mut document = serde_json::to_value(actions)?;
    if let Some(entries) = document.as_array_mut() {
        for (entry, action) in entries.iter_mut().zip(actions) {
            let ListenerAction::AuthenticateOidc {
                authenticate_oidc, ..
            } = action
            else {
                continue;
            };
            if let Some(params) = entry
                .get_mut("authenticateOidc")
                .and_then(Value::as_object_mut)
            {
                let _ = params.insert(
                    "clientSecret".to_string(),
                    Value::String(authenticate_oidc.client_secret.expose().to_string()),
                );
            }
        }
    }
    Ok(Secret::new(serde_json::to_string(&document)?))
}

/// Builds the permanent HTTP to HTTPS redirect action.
#[must_use]
pub fn https_redirect() -> ListenerAction {
    ListenerAction::Redirect {
        redirect: Redirect {
            protocol: "HTTPS".to_string(),
            port: HTTPS_PORT.to_string(),
            status_code: "HTTP_301".to_string(),
        },
    }
}
