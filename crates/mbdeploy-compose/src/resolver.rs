//! Configuration resolution.
//!
//! Normalizes a sparse [`StackConfig`] into a [`ResolvedConfig`] with every
//! default applied and every mutually-dependent field validated. Nothing
//! is declared until this step has succeeded.

use std::collections::BTreeMap;

use mbdeploy_common::config::{
    AuthenticationConfig, Defaults, DomainConfig, EmailConfig, NetworkOverrides, StackConfig,
};
use mbdeploy_common::constants::{
    DEFAULT_SMTP_PORT, DEFAULT_SMTP_SECURITY, IMAGE_NAME, SMTP_SECURITY_MODES, google,
};
use mbdeploy_common::error::{Result, StackError};
use mbdeploy_common::types::{Secret, SubnetId, SubnetRole};
use serde::Serialize;

/// A fully-defaulted, validated stack configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    /// Existing VPC, or `None` to use the default VPC.
    pub vpc_id: Option<String>,
    /// Explicit subnet sets; every present list is non-empty.
    pub networking: NetworkOverrides,
    /// Custom domain, fully populated.
    pub domain: Option<DomainSettings>,
    /// Database engine version.
    pub engine_version: String,
    /// Authentication strategy in front of the listener.
    pub authentication: Option<AuthStrategy>,
    /// Outbound email, present only with a non-empty host.
    pub email: Option<EmailSettings>,
    /// Application image tag.
    pub image_version: String,
}

impl ResolvedConfig {
    /// Returns the full container image reference.
    #[must_use]
    pub fn image(&self) -> String {
        format!("{IMAGE_NAME}:{}", self.image_version)
    }
}

/// A custom domain with both of its fields set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSettings {
    /// Hosted zone the records live in.
    pub hosted_zone_name: String,
    /// Domain the application is served on.
    pub domain_name: String,
}

/// Endpoints of an OpenID Connect identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcEndpoints {
    /// Token issuer.
    pub issuer: String,
    /// Authorization endpoint.
    pub authorization_endpoint: String,
    /// Token endpoint.
    pub token_endpoint: String,
    /// User info endpoint.
    pub user_info_endpoint: String,
}

/// Client credentials registered with an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcClient {
    /// Client ID.
    pub client_id: String,
    /// Client secret.
    pub client_secret: Secret,
}

/// Pre-authentication strategy for the public listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum AuthStrategy {
    /// Google accounts through OpenID Connect.
    Google {
        /// Client credentials.
        client: OidcClient,
    },
    /// Any OpenID Connect provider.
    Oidc {
        /// Provider endpoints.
        endpoints: OidcEndpoints,
        /// Client credentials.
        client: OidcClient,
    },
}

impl AuthStrategy {
    /// Returns the provider endpoints the strategy authenticates against.
    #[must_use]
    pub fn endpoints(&self) -> OidcEndpoints {
        match self {
            Self::Google { .. } => OidcEndpoints {
                issuer: google::ISSUER.to_string(),
                authorization_endpoint: google::AUTHORIZATION_ENDPOINT.to_string(),
                token_endpoint: google::TOKEN_ENDPOINT.to_string(),
                user_info_endpoint: google::USER_INFO_ENDPOINT.to_string(),
            },
            Self::Oidc { endpoints, .. } => endpoints.clone(),
        }
    }

    /// Returns the client credentials.
    #[must_use]
    pub const fn client(&self) -> &OidcClient {
        match self {
            Self::Google { client } | Self::Oidc { client, .. } => client,
        }
    }

    /// Returns the configuration name of the strategy.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Google { .. } => "google",
            Self::Oidc { .. } => "oidc",
        }
    }
}

/// Outbound SMTP settings with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
    /// SMTP host, never empty after resolution.
    pub host: String,
    /// SMTP port.
    pub port: u16,
    /// SMTP security mode.
    pub security: String,
    /// SMTP user.
    pub username: Option<String>,
    /// SMTP password.
    pub password: Option<Secret>,
}

/// Resolves an input configuration against the given defaults.
///
/// # Errors
///
/// Returns [`StackError::InvalidConfiguration`] if the domain is only
/// partially specified, a subnet override is empty, the authentication
/// strategy is unknown or incomplete, or the email settings are invalid.
pub fn resolve(config: &StackConfig, defaults: &Defaults) -> Result<ResolvedConfig> {
    tracing::debug!("resolving stack configuration");

    let networking = config.networking.clone().unwrap_or_default();
    check_override(SubnetRole::Ecs, networking.ecs_subnet_ids.as_deref())?;
    check_override(SubnetRole::Db, networking.db_subnet_ids.as_deref())?;
    check_override(SubnetRole::Lb, networking.lb_subnet_ids.as_deref())?;

    let resolved = ResolvedConfig {
        vpc_id: non_empty(config.vpc_id.as_deref()).map(str::to_string),
        networking,
        domain: config.domain.as_ref().map(resolve_domain).transpose()?.flatten(),
        engine_version: non_empty(config.database.engine_version.as_deref())
            .unwrap_or(defaults.engine_version.as_str())
            .to_string(),
        authentication: config
            .authentication
            .as_ref()
            .map(resolve_authentication)
            .transpose()?,
        email: config.email.as_ref().map(resolve_email).transpose()?.flatten(),
        image_version: non_empty(config.metabase_version.as_deref())
            .unwrap_or(defaults.image_version.as_str())
            .to_string(),
    };

    if let (Some(auth), None) = (&resolved.authentication, &resolved.domain) {
        tracing::warn!(
            strategy = auth.name(),
            "authentication without a custom domain puts an authenticate action on a plain HTTP \
             listener, which load balancers reject; configure a domain to serve HTTPS"
        );
    }

    tracing::info!(
        custom_domain = resolved.domain.is_some(),
        authentication = resolved.authentication.as_ref().map(AuthStrategy::name),
        email = resolved.email.is_some(),
        image = %resolved.image(),
        "stack configuration resolved"
    );
    Ok(resolved)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn check_override(role: SubnetRole, ids: Option<&[SubnetId]>) -> Result<()> {
    match ids {
        Some(ids) if ids.is_empty() || ids.iter().any(|id| id.as_str().trim().is_empty()) => {
            Err(StackError::invalid_config(format!(
                "{role} subnet override must list at least one non-empty subnet id"
            )))
        }
        _ => Ok(()),
    }
}

fn resolve_domain(domain: &DomainConfig) -> Result<Option<DomainSettings>> {
    let zone = non_empty(domain.hosted_zone_name.as_deref());
    let name = non_empty(domain.domain_name.as_deref());
    match (zone, name) {
        (Some(zone), Some(name)) => Ok(Some(DomainSettings {
            hosted_zone_name: zone.to_string(),
            domain_name: name.to_string(),
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(StackError::invalid_config(
            "domain.hostedZoneName is set but domain.domainName is not; set both or neither",
        )),
        (None, Some(_)) => Err(StackError::invalid_config(
            "domain.domainName is set but domain.hostedZoneName is not; set both or neither",
        )),
    }
}

fn resolve_authentication(auth: &AuthenticationConfig) -> Result<AuthStrategy> {
    let args = &auth.strategy_args;
    match auth.strategy.trim().to_ascii_lowercase().as_str() {
        "google" => Ok(AuthStrategy::Google {
            client: oidc_client(args, "google")?,
        }),
        "oidc" => Ok(AuthStrategy::Oidc {
            endpoints: OidcEndpoints {
                issuer: required_arg(args, "oidc", "issuer")?,
                authorization_endpoint: required_arg(args, "oidc", "authorizationEndpoint")?,
                token_endpoint: required_arg(args, "oidc", "tokenEndpoint")?,
                user_info_endpoint: required_arg(args, "oidc", "userInfoEndpoint")?,
            },
            client: oidc_client(args, "oidc")?,
        }),
        other => Err(StackError::invalid_config(format!(
            "unrecognized authentication strategy \"{other}\" (expected \"google\" or \"oidc\")"
        ))),
    }
}

fn oidc_client(args: &BTreeMap<String, Secret>, strategy: &str) -> Result<OidcClient> {
    Ok(OidcClient {
        client_id: required_arg(args, strategy, "clientId")?,
        client_secret: required_secret(args, strategy, "clientSecret")?.clone(),
    })
}

fn required_arg(args: &BTreeMap<String, Secret>, strategy: &str, key: &str) -> Result<String> {
    Ok(required_secret(args, strategy, key)?.expose().trim().to_string())
}

/// Returns the argument exactly as given, rejecting a blank one.
fn required_secret<'a>(
    args: &'a BTreeMap<String, Secret>,
    strategy: &str,
    key: &str,
) -> Result<&'a Secret> {
    args.get(key)
        .filter(|v| !v.expose().trim().is_empty())
        .ok_or_else(|| {
            StackError::invalid_config(format!(
                "authentication strategy \"{strategy}\" requires strategyArgs.{key}"
            ))
        })
}

fn resolve_email(email: &EmailConfig) -> Result<Option<EmailSettings>> {
    let Some(host) = non_empty(email.host.as_deref()) else {
        return Ok(None);
    };
    let port = email.port.unwrap_or(DEFAULT_SMTP_PORT);
    if port == 0 {
        return Err(StackError::invalid_config("email.port must be between 1 and 65535"));
    }
    let security = non_empty(email.security.as_deref())
        .unwrap_or(DEFAULT_SMTP_SECURITY)
        .to_ascii_lowercase();
    if !SMTP_SECURITY_MODES.contains(&security.as_str()) {
        return Err(StackError::invalid_config(format!(
            "email.security \"{security}\" is not one of {}",
            SMTP_SECURITY_MODES.join(", ")
        )));
    }
    Ok(Some(EmailSettings {
        host: host.to_string(),
        port,
        security,
        username: email.username.clone(),
        password: email.password.clone(),
    }))
}
