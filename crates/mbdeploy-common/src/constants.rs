//! Fixed values and process-wide defaults.
//!
//! Defaults are plain constants; they reach the resolver through
//! [`crate::config::Defaults`] rather than through global state.

/// Component type token under which a stack is registered.
pub const COMPONENT_TYPE: &str = "metabase:index:Metabase";

/// Port the application container serves HTTP on.
pub const SERVICE_PORT: u16 = 3000;

/// Default database engine version for the serverless cluster.
pub const DEFAULT_ENGINE_VERSION: &str = "5.7.mysql_aurora.2.08.3";

/// Default application image tag.
pub const DEFAULT_IMAGE_VERSION: &str = "latest";

/// Application image repository, tagged with the resolved version.
pub const IMAGE_NAME: &str = "metabase/metabase";

/// Name of the single container in the task definition.
pub const CONTAINER_NAME: &str = "metabase";

/// Number of subnets auto-discovery selects.
pub const DISCOVERED_SUBNET_COUNT: usize = 2;

/// CIDR block matching any IPv4 address.
pub const ANYWHERE_CIDR: &str = "0.0.0.0/0";

/// Public HTTP port on the load balancer.
pub const HTTP_PORT: u16 = 80;

/// Public HTTPS port on the load balancer.
pub const HTTPS_PORT: u16 = 443;

/// TLS policy applied to the public listener when a certificate is attached.
pub const TLS_POLICY: &str = "ELBSecurityPolicy-TLS-1-2-2017-01";

/// TTL in seconds of the certificate validation record.
pub const VALIDATION_RECORD_TTL: u32 = 60;

/// Load balancer idle timeout in seconds.
pub const LB_IDLE_TIMEOUT_SECS: u32 = 600;

/// Length of the generated database credential.
pub const DB_PASSWORD_LENGTH: usize = 20;

/// Database engine of the serverless cluster.
pub const DB_ENGINE: &str = "aurora-mysql";

/// Engine mode of the cluster.
pub const DB_ENGINE_MODE: &str = "serverless";

/// Name of the application database.
pub const DB_NAME: &str = "metabase";

/// Master user of the application database.
pub const DB_MASTER_USER: &str = "admin";

/// Value of the `MB_DB_TYPE` environment variable.
pub const DB_TYPE: &str = "mysql";

/// Timezone handed to the JVM inside the container.
pub const JAVA_TIMEZONE: &str = "US/Pacific";

/// Well-known name of the ECS task execution role.
pub const EXECUTION_ROLE_NAME: &str = "ecsTaskExecutionRole";

/// Task family name.
pub const TASK_FAMILY: &str = "metabase";

/// Task CPU units.
pub const TASK_CPU: &str = "2048";

/// Task memory in MiB.
pub const TASK_MEMORY: &str = "8192";

/// Default SMTP port when an email host is configured without one.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default SMTP security mode.
pub const DEFAULT_SMTP_SECURITY: &str = "none";

/// SMTP security modes the application understands.
pub const SMTP_SECURITY_MODES: &[&str] = &["none", "ssl", "tls", "starttls"];

/// Google identity provider endpoints.
pub mod google {
    /// Token issuer.
    pub const ISSUER: &str = "https://accounts.google.com";
    /// Authorization endpoint.
    pub const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
    /// Token endpoint.
    pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
    /// User info endpoint.
    pub const USER_INFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";
}

/// Application name used in CLI output.
pub const APP_NAME: &str = "mbdeploy";
