//! Container environment and container definition assembly.
//!
//! Both are pure functions of already-resolved values. Secret entries
//! render as [`REDACTED`](mbdeploy_common::types::REDACTED) through
//! `Serialize`; [`ContainerDefinition::to_exposed_json`] is the only way
//! to obtain the real document for the backend.

use mbdeploy_common::constants::{CONTAINER_NAME, DB_TYPE, JAVA_TIMEZONE, SERVICE_PORT};
use mbdeploy_common::error::Result;
use mbdeploy_common::types::Secret;
use serde::Serialize;
use serde_json::json;

use crate::descriptor::ResolvedResource;
use crate::resolver::EmailSettings;

/// Connection attributes of the provisioned database cluster.
#[derive(Debug, Clone)]
pub struct DatabaseEndpoint {
    /// Cluster endpoint hostname.
    pub host: String,
    /// Cluster port.
    pub port: u64,
    /// Database name.
    pub name: String,
    /// Master user.
    pub user: String,
    /// Master password.
    pub password: Secret,
}

impl DatabaseEndpoint {
    /// Reads the connection attributes off a resolved cluster.
    ///
    /// # Errors
    ///
    /// Returns a provisioning failure if an attribute is missing.
    pub fn from_cluster(cluster: &ResolvedResource) -> Result<Self> {
        Ok(Self {
            host: cluster.str_attribute("endpoint")?.to_string(),
            port: cluster.u64_attribute("port")?,
            name: cluster.str_attribute("databaseName")?.to_string(),
            user: cluster.str_attribute("masterUsername")?.to_string(),
            password: cluster.secret("masterPassword")?.clone(),
        })
    }
}

/// Value of one environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EnvValue {
    /// A value safe to print.
    Plain(String),
    /// A value that must never be printed.
    Secret(Secret),
}

impl EnvValue {
    fn expose(&self) -> &str {
        match self {
            Self::Plain(v) => v,
            Self::Secret(s) => s.expose(),
        }
    }
}

/// One environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: EnvValue,
}

/// Ordered environment of the application container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContainerEnvironment {
    vars: Vec<EnvVar>,
}

impl ContainerEnvironment {
    fn plain(&mut self, name: &str, value: impl Into<String>) {
        self.vars.push(EnvVar {
            name: name.to_string(),
            value: EnvValue::Plain(value.into()),
        });
    }

    fn secret(&mut self, name: &str, value: Secret) {
        self.vars.push(EnvVar {
            name: name.to_string(),
            value: EnvValue::Secret(value),
        });
    }

    /// Returns the variables in order.
    #[must_use]
    pub fn vars(&self) -> &[EnvVar] {
        &self.vars
    }

    /// Returns the variable names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.vars.iter().map(|v| v.name.as_str()).collect()
    }

    /// Returns the value of a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EnvValue> {
        self.vars.iter().find(|v| v.name == name).map(|v| &v.value)
    }

    /// Returns whether the SMTP variables are present.
    #[must_use]
    pub fn has_email(&self) -> bool {
        self.get("MB_EMAIL_SMTP_HOST").is_some()
    }
}

/// Assembles the container environment.
///
/// The seven database entries are always present. The five SMTP entries
/// are present iff an email host is configured and non-empty.
#[must_use]
pub fn assemble_environment(
    db: &DatabaseEndpoint,
    email: Option<&EmailSettings>,
) -> ContainerEnvironment {
    let mut env = ContainerEnvironment::default();
    env.plain("JAVA_TIMEZONE", JAVA_TIMEZONE);
    env.plain("MB_DB_TYPE", DB_TYPE);
    env.plain("MB_DB_DBNAME", db.name.as_str());
    env.plain("MB_DB_PORT", db.port.to_string());
    env.plain("MB_DB_USER", db.user.as_str());
    env.secret("MB_DB_PASS", db.password.clone());
    env.plain("MB_DB_HOST", db.host.as_str());

    if let Some(email) = email.filter(|e| !e.host.trim().is_empty()) {
        env.plain(
            "MB_EMAIL_SMTP_USERNAME",
            email.username.clone().unwrap_or_default(),
        );
        env.secret(
            "MB_EMAIL_SMTP_PASSWORD",
            email.password.clone().unwrap_or_else(|| Secret::new("")),
        );
        env.plain("MB_EMAIL_SMTP_HOST", email.host.as_str());
        env.plain("MB_EMAIL_SMTP_PORT", email.port.to_string());
        env.plain("MB_EMAIL_SMTP_SECURITY", email.security.as_str());
    }
    env
}

/// The single application container of the task definition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    /// Container name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Exposed ports.
    pub port_mappings: Vec<PortMapping>,
    /// Environment variables.
    pub environment: ContainerEnvironment,
}

/// A container port mapping.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Port inside the container.
    pub container_port: u16,
}

impl ContainerDefinition {
    /// Builds the application container definition.
    #[must_use]
    pub fn new(image: impl Into<String>, environment: ContainerEnvironment) -> Self {
        Self {
            name: CONTAINER_NAME.to_string(),
            image: image.into(),
            port_mappings: vec![PortMapping {
                container_port: SERVICE_PORT,
            }],
            environment,
        }
    }

    /// Renders the task's container definitions with secrets redacted.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_redacted_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&[self])?)
    }

    /// Renders the task's container definitions with real secret values.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_exposed_json(&self) -> Result<Secret> {
        let environment: Vec<_> = self
            .environment
            .vars
            .iter()
            .map(|v| json!({ "name": v.name, "value": v.value.expose() }))
            .collect();
        let document = json!([{
            "name": self.name,
            "image": self.image,
            "portMappings": self.port_mappings,
            "environment": environment,
        }]);
        Ok(Secret::new(serde_json::to_string(&document)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> DatabaseEndpoint {
        DatabaseEndpoint {
            host: "demo.cluster-abc.us-east-1.rds.amazonaws.com".into(),
            port: 3306,
            name: "metabase".into(),
            user: "admin".into(),
            password: Secret::new("Zx81kq0PLmn3Rt5Vw7Yb"),
        }
    }

    fn email(host: &str) -> EmailSettings {
        EmailSettings {
            host: host.into(),
            port: 465,
            security: "ssl".into(),
            username: Some("mailer".into()),
            password: Some(Secret::new("smtp-pass")),
        }
    }

    const DB_VARS: [&str; 7] = [
        "JAVA_TIMEZONE",
        "MB_DB_TYPE",
        "MB_DB_DBNAME",
        "MB_DB_PORT",
        "MB_DB_USER",
        "MB_DB_PASS",
        "MB_DB_HOST",
    ];

    #[test]
    fn database_entries_always_present_in_order() {
        let env = assemble_environment(&db(), None);
        assert_eq!(env.names(), DB_VARS.to_vec());
        assert_eq!(
            env.get("MB_DB_PORT"),
            Some(&EnvValue::Plain("3306".into()))
        );
        assert!(!env.has_email());
    }

    #[test]
    fn email_entries_present_iff_host_non_empty() {
        let with = assemble_environment(&db(), Some(&email("smtp.example.com")));
        assert_eq!(with.vars().len(), 12);
        assert_eq!(&with.names()[..7], &DB_VARS);
        assert_eq!(
            &with.names()[7..],
            &[
                "MB_EMAIL_SMTP_USERNAME",
                "MB_EMAIL_SMTP_PASSWORD",
                "MB_EMAIL_SMTP_HOST",
                "MB_EMAIL_SMTP_PORT",
                "MB_EMAIL_SMTP_SECURITY",
            ]
        );

        let empty_host = assemble_environment(&db(), Some(&email("")));
        assert_eq!(empty_host.names(), DB_VARS.to_vec());
    }

    #[test]
    fn redacted_json_hides_secrets() {
        let env = assemble_environment(&db(), Some(&email("smtp.example.com")));
        let def = ContainerDefinition::new("metabase/metabase:latest", env);
        let json = def.to_redacted_json().expect("json");
        assert!(!json.contains("Zx81kq0PLmn3Rt5Vw7Yb"), "got: {json}");
        assert!(!json.contains("smtp-pass"), "got: {json}");
        assert!(json.contains("metabase/metabase:latest"));
        assert!(json.contains("\"containerPort\":3000"));
    }

    #[test]
    fn exposed_json_carries_real_values() {
        let def = ContainerDefinition::new("metabase/metabase:v1", assemble_environment(&db(), None));
        let exposed = def.to_exposed_json().expect("json");
        let value: serde_json::Value = serde_json::from_str(exposed.expose()).expect("parse");
        let env = value[0]["environment"].as_array().expect("environment");
        let pass = env
            .iter()
            .find(|e| e["name"] == "MB_DB_PASS")
            .expect("MB_DB_PASS");
        assert_eq!(pass["value"], "Zx81kq0PLmn3Rt5Vw7Yb");
        assert_eq!(value[0]["name"], "metabase");
    }
}
