//! Domain primitive types used across the mbdeploy workspace.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Placeholder printed wherever a secret would otherwise appear.
pub const REDACTED: &str = "[REDACTED]";

/// A sensitive string value.
///
/// `Debug`, `Display` and `Serialize` all print [`REDACTED`]; the value is
/// only reachable through [`Secret::expose`].
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wraps a sensitive value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns whether the wrapped value is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

/// Identifier of an existing subnet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubnetId(String);

impl SubnetId {
    /// Creates a subnet ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubnetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tier a subnet set is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetRole {
    /// Compute tasks.
    Ecs,
    /// Database cluster.
    Db,
    /// Load balancer.
    Lb,
}

impl fmt::Display for SubnetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ecs => write!(f, "ecs"),
            Self::Db => write!(f, "db"),
            Self::Lb => write!(f, "lb"),
        }
    }
}

/// Kind of resource the composition can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// The logical component grouping a whole stack.
    Component,
    /// The account's default VPC.
    DefaultVpc,
    /// A VPC security group.
    SecurityGroup,
    /// A standalone ingress or egress rule on a security group.
    SecurityGroupRule,
    /// A generated random password.
    RandomPassword,
    /// A database subnet group.
    DbSubnetGroup,
    /// A managed relational database cluster.
    DbCluster,
    /// A TLS certificate.
    Certificate,
    /// A DNS record in a hosted zone.
    DnsRecord,
    /// A certificate validation waiter.
    CertificateValidation,
    /// An application load balancer.
    LoadBalancer,
    /// A load balancer target group.
    TargetGroup,
    /// A load balancer listener.
    Listener,
    /// A container cluster.
    EcsCluster,
    /// A container task definition.
    TaskDefinition,
    /// A long-running container service.
    EcsService,
}

impl ResourceKind {
    /// Returns the provider type token for this kind.
    #[must_use]
    pub const fn type_token(self) -> &'static str {
        match self {
            Self::Component => crate::constants::COMPONENT_TYPE,
            Self::DefaultVpc => "aws:ec2/defaultVpc:DefaultVpc",
            Self::SecurityGroup => "aws:ec2/securityGroup:SecurityGroup",
            Self::SecurityGroupRule => "aws:ec2/securityGroupRule:SecurityGroupRule",
            Self::RandomPassword => "random:index/randomString:RandomString",
            Self::DbSubnetGroup => "aws:rds/subnetGroup:SubnetGroup",
            Self::DbCluster => "aws:rds/cluster:Cluster",
            Self::Certificate => "aws:acm/certificate:Certificate",
            Self::DnsRecord => "aws:route53/record:Record",
            Self::CertificateValidation => "aws:acm/certificateValidation:CertificateValidation",
            Self::LoadBalancer => "aws:lb/loadBalancer:LoadBalancer",
            Self::TargetGroup => "aws:lb/targetGroup:TargetGroup",
            Self::Listener => "aws:lb/listener:Listener",
            Self::EcsCluster => "aws:ecs/cluster:Cluster",
            Self::TaskDefinition => "aws:ecs/taskDefinition:TaskDefinition",
            Self::EcsService => "aws:ecs/service:Service",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_token())
    }
}

/// Reference to a declared resource, unique within a stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Logical name the resource was declared under.
    pub name: String,
}

impl ResourceRef {
    /// Creates a reference from a kind and logical name.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.kind, self.name)
    }
}
