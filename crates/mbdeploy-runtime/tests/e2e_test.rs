//! End-to-end tests for stack deployment.
//!
//! These tests drive the full pipeline against the dry-run backend:
//! 1. Configuration resolution (defaults, fail-fast validation)
//! 2. VPC and subnet selection (discovery, per-tier overrides)
//! 3. Security, data tier, edge, compute, and DNS declarations
//! 4. Declaration ordering and failure propagation
//! 5. Secret handling in rendered plans
//! 6. Output registration

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mbdeploy_common::config::StackConfig;
use mbdeploy_common::error::{Result, StackError};
use mbdeploy_common::types::{ResourceKind, ResourceRef, SubnetId};
use mbdeploy_compose::descriptor::ResourceDescriptor;
use mbdeploy_compose::provider::{HostedZone, LookupService, RoleInfo, SubnetInfo, VpcInfo};
use mbdeploy_compose::stack::StackOptions;
use mbdeploy_runtime::backend::{DryRunBackend, digest};
use mbdeploy_runtime::engine::{Deployment, Engine};
use mbdeploy_runtime::lookup::{Inventory, InventorySubnet, StaticLookup};
use mbdeploy_runtime::plan::{render_json, render_plan};
use serde_json::Value;

const STACK: &str = "demo";

// ── Fixtures ─────────────────────────────────────────────────────────

/// Wraps a static lookup and counts subnet discoveries.
struct CountingLookup {
    inner: StaticLookup,
    subnet_calls: AtomicUsize,
}

#[async_trait::async_trait]
impl LookupService for CountingLookup {
    async fn vpc(&self, vpc_id: &str) -> Result<Option<VpcInfo>> {
        self.inner.vpc(vpc_id).await
    }

    async fn subnets(&self, vpc_id: &str) -> Result<Vec<SubnetInfo>> {
        let _ = self.subnet_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.subnets(vpc_id).await
    }

    async fn hosted_zone(&self, name: &str) -> Result<Option<HostedZone>> {
        self.inner.hosted_zone(name).await
    }

    async fn role(&self, name: &str) -> Result<Option<RoleInfo>> {
        self.inner.role(name).await
    }
}

struct Harness {
    backend: Arc<DryRunBackend>,
    lookup: Arc<CountingLookup>,
    engine: Engine,
}

impl Harness {
    fn new(inventory: Inventory) -> Self {
        Self::with_backend(inventory, DryRunBackend::new())
    }

    fn with_backend(inventory: Inventory, backend: DryRunBackend) -> Self {
        let backend = Arc::new(backend);
        let lookup = Arc::new(CountingLookup {
            inner: StaticLookup::new(inventory),
            subnet_calls: AtomicUsize::new(0),
        });
        let engine = Engine::new(backend.clone(), lookup.clone());
        Self {
            backend,
            lookup,
            engine,
        }
    }

    async fn deploy(&self, yaml: &str) -> Result<Deployment> {
        let config = StackConfig::from_yaml(yaml)?;
        self.engine
            .deploy(STACK, &config, &StackOptions::default())
            .await
    }

    fn discoveries(&self) -> usize {
        self.lookup.subnet_calls.load(Ordering::SeqCst)
    }

    fn recorded_names(&self) -> Vec<String> {
        self.backend
            .recorded()
            .into_iter()
            .map(|d| d.logical_name)
            .collect()
    }
}

fn default_vpc_id() -> String {
    let reference = ResourceRef::new(ResourceKind::DefaultVpc, STACK);
    format!("vpc-{}", digest(&reference, "", 17))
}

fn subnet(vpc_id: &str, id: &str, zone: &str, public: bool) -> InventorySubnet {
    InventorySubnet {
        vpc_id: vpc_id.to_string(),
        subnet: SubnetInfo {
            id: SubnetId::new(id),
            availability_zone: zone.to_string(),
            map_public_ip_on_launch: public,
        },
    }
}

/// Inventory with a usable default VPC, an explicit VPC, a hosted zone,
/// and the execution role.
fn inventory() -> Inventory {
    let default_vpc = default_vpc_id();
    Inventory {
        vpcs: vec![VpcInfo {
            id: "vpc-explicit".into(),
        }],
        subnets: vec![
            subnet(&default_vpc, "subnet-private", "us-east-1a", false),
            subnet(&default_vpc, "subnet-a1", "us-east-1a", true),
            subnet(&default_vpc, "subnet-a2", "us-east-1a", true),
            subnet(&default_vpc, "subnet-b1", "us-east-1b", true),
            subnet(&default_vpc, "subnet-c1", "us-east-1c", true),
        ],
        hosted_zones: vec![HostedZone {
            id: "Z0EXAMPLE".into(),
            name: "example.com".into(),
        }],
        roles: vec![RoleInfo {
            name: "ecsTaskExecutionRole".into(),
            arn: "arn:aws:iam::123456789012:role/ecsTaskExecutionRole".into(),
        }],
    }
}

fn find<'d>(deployment: &'d Deployment, kind: ResourceKind, name: &str) -> &'d ResourceDescriptor {
    deployment
        .resources
        .iter()
        .find(|d| d.kind == kind && d.logical_name == name)
        .unwrap_or_else(|| panic!("{kind} {name} was not declared"))
}

fn of_kind(deployment: &Deployment, kind: ResourceKind) -> Vec<&ResourceDescriptor> {
    deployment.resources.iter().filter(|d| d.kind == kind).collect()
}

fn position(deployment: &Deployment, kind: ResourceKind, name: &str) -> usize {
    deployment
        .resources
        .iter()
        .position(|d| d.kind == kind && d.logical_name == name)
        .unwrap_or_else(|| panic!("{kind} {name} was not declared"))
}

const DOMAIN: &str = r"
domain:
  hostedZoneName: example.com
  domainName: metabase.example.com
";

// ── Scenario A: empty configuration ──────────────────────────────────

#[tokio::test]
async fn empty_config_uses_default_vpc_and_discovered_subnets() {
    let h = Harness::new(inventory());
    let deployment = h.deploy("").await.unwrap();

    let vpcs = of_kind(&deployment, ResourceKind::DefaultVpc);
    assert_eq!(vpcs.len(), 1);
    assert_eq!(h.discoveries(), 1);

    let expected = vec![SubnetId::new("subnet-a1"), SubnetId::new("subnet-b1")];
    assert_eq!(deployment.subnets.ecs.ids, expected);
    assert_eq!(deployment.subnets.db.ids, expected);
    assert_eq!(deployment.subnets.lb.ids, expected);
    assert!(deployment.subnets.assign_public_ip());
}

#[tokio::test]
async fn empty_config_serves_plain_http_without_certificate() {
    let h = Harness::new(inventory());
    let deployment = h.deploy("").await.unwrap();

    assert!(of_kind(&deployment, ResourceKind::Certificate).is_empty());
    assert!(of_kind(&deployment, ResourceKind::CertificateValidation).is_empty());
    assert!(of_kind(&deployment, ResourceKind::DnsRecord).is_empty());

    let listener = find(&deployment, ResourceKind::Listener, "demo-metabase");
    assert_eq!(listener.get("protocol").and_then(Value::as_str), Some("HTTP"));
    assert_eq!(listener.get("port").and_then(Value::as_u64), Some(443));
    let actions = listener.get("defaultActions").unwrap().as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["type"], "forward");
    assert_eq!(actions[0]["order"], 1);
}

#[tokio::test]
async fn empty_config_exports_raw_load_balancer_name() {
    let h = Harness::new(inventory());
    let deployment = h.deploy("").await.unwrap();

    let dns_name = &deployment.outputs.dns_name;
    assert!(dns_name.starts_with("demo-metabase-"), "got: {dns_name}");
    assert!(dns_name.ends_with(".elb.amazonaws.com"), "got: {dns_name}");
    assert!(!dns_name.starts_with("https://"));

    let service = find(&deployment, ResourceKind::EcsService, "demo-metabase");
    assert_eq!(
        service.get("networkConfiguration").unwrap()["assignPublicIp"],
        true
    );
}

#[tokio::test]
async fn empty_config_applies_default_versions() {
    let h = Harness::new(inventory());
    let deployment = h.deploy("").await.unwrap();

    let cluster = find(&deployment, ResourceKind::DbCluster, "demo-metabase");
    assert_eq!(
        cluster.get("engineVersion").and_then(Value::as_str),
        Some("5.7.mysql_aurora.2.08.3")
    );
    assert_eq!(
        cluster.get("clusterIdentifier").and_then(Value::as_str),
        Some("demometabasemysql")
    );
    assert_eq!(
        cluster.get("finalSnapshotIdentifier").and_then(Value::as_str),
        Some("demometabasefinalsnapshot")
    );
    let task = find(&deployment, ResourceKind::TaskDefinition, "demo-metabase");
    let definitions = task.get("containerDefinitions").and_then(Value::as_str).unwrap();
    assert!(definitions.contains("metabase/metabase:latest"));
}

// ── Scenario B: custom domain ────────────────────────────────────────

#[tokio::test]
async fn domain_adds_validated_certificate_and_https_listener() {
    let h = Harness::new(inventory());
    let deployment = h.deploy(DOMAIN).await.unwrap();

    assert_eq!(of_kind(&deployment, ResourceKind::Certificate).len(), 1);
    assert_eq!(of_kind(&deployment, ResourceKind::CertificateValidation).len(), 1);

    let listener = find(&deployment, ResourceKind::Listener, "demo-metabase");
    assert_eq!(listener.get("protocol").and_then(Value::as_str), Some("HTTPS"));
    assert_eq!(
        listener.get("sslPolicy").and_then(Value::as_str),
        Some("ELBSecurityPolicy-TLS-1-2-2017-01")
    );
    let validation = ResourceRef::new(ResourceKind::CertificateValidation, "demo-metabase");
    assert!(listener.depends_on.contains(&validation));

    let validated_at = position(&deployment, ResourceKind::CertificateValidation, "demo-metabase");
    let record_at = position(&deployment, ResourceKind::DnsRecord, "demo-metabase-certvalidation");
    let cert_at = position(&deployment, ResourceKind::Certificate, "demo-metabase");
    let listener_at = position(&deployment, ResourceKind::Listener, "demo-metabase");
    assert!(cert_at < record_at);
    assert!(record_at < validated_at);
    assert!(validated_at < listener_at);
}

#[tokio::test]
async fn domain_exports_https_url() {
    let h = Harness::new(inventory());
    let deployment = h.deploy(DOMAIN).await.unwrap();

    assert_eq!(deployment.outputs.dns_name, "https://metabase.example.com");

    let alias = find(&deployment, ResourceKind::DnsRecord, "demo-metabase-dns");
    assert_eq!(alias.get("type").and_then(Value::as_str), Some("A"));
    assert_eq!(alias.get("zoneId").and_then(Value::as_str), Some("Z0EXAMPLE"));
    let target = &alias.get("aliases").unwrap()[0];
    assert_eq!(target["evaluateTargetHealth"], true);
    assert!(
        target["name"]
            .as_str()
            .unwrap()
            .ends_with(".elb.amazonaws.com")
    );
}

#[tokio::test]
async fn validation_record_carries_issuer_value() {
    let h = Harness::new(inventory());
    let deployment = h.deploy(DOMAIN).await.unwrap();

    let record = find(&deployment, ResourceKind::DnsRecord, "demo-metabase-certvalidation");
    assert_eq!(record.get("type").and_then(Value::as_str), Some("CNAME"));
    assert_eq!(record.get("ttl").and_then(Value::as_u64), Some(60));
    let value = record.get("records").unwrap()[0].as_str().unwrap();
    assert!(value.ends_with(".acm-validations.aws."), "got: {value}");
}

#[tokio::test]
async fn service_transitively_waits_for_certificate() {
    let h = Harness::new(inventory());
    let deployment = h.deploy(DOMAIN).await.unwrap();

    let service = ResourceRef::new(ResourceKind::EcsService, "demo-metabase");
    let certificate = ResourceRef::new(ResourceKind::Certificate, "demo-metabase");
    let listener = ResourceRef::new(ResourceKind::Listener, "demo-metabase");
    assert!(deployment.graph.depends_on(&service, &certificate));
    assert!(deployment.graph.depends_on(&service, &listener));
    assert!(!deployment.graph.depends_on(&listener, &service));
}

// ── Scenario C: explicit subnets ─────────────────────────────────────

#[tokio::test]
async fn explicit_subnets_skip_discovery_and_public_ip() {
    let h = Harness::new(inventory());
    let deployment = h
        .deploy(
            r"
vpcId: vpc-explicit
networkOverrides:
  ecsSubnets: [subnet-e1, subnet-e2]
  dbSubnets: [subnet-d1, subnet-d2]
  lbSubnets: [subnet-l1, subnet-l2]
",
        )
        .await
        .unwrap();

    assert_eq!(h.discoveries(), 0);
    assert!(of_kind(&deployment, ResourceKind::DefaultVpc).is_empty());
    assert!(of_kind(&deployment, ResourceKind::Certificate).is_empty());
    assert!(of_kind(&deployment, ResourceKind::CertificateValidation).is_empty());
    assert!(!deployment.subnets.assign_public_ip());

    let service = find(&deployment, ResourceKind::EcsService, "demo-metabase");
    let network = service.get("networkConfiguration").unwrap();
    assert_eq!(network["assignPublicIp"], false);
    assert_eq!(network["subnets"], serde_json::json!(["subnet-e1", "subnet-e2"]));

    let group = find(&deployment, ResourceKind::DbSubnetGroup, "demo-metabase");
    assert_eq!(
        group.get("subnetIds").unwrap(),
        &serde_json::json!(["subnet-d1", "subnet-d2"])
    );
    let lb = find(&deployment, ResourceKind::LoadBalancer, "demo-metabase");
    assert_eq!(
        lb.get("subnets").unwrap(),
        &serde_json::json!(["subnet-l1", "subnet-l2"])
    );
}

#[tokio::test]
async fn single_override_leaves_other_tiers_discovered() {
    let h = Harness::new(inventory());
    let deployment = h
        .deploy(
            r"
networkOverrides:
  dbSubnets: [subnet-d1, subnet-d2]
",
        )
        .await
        .unwrap();

    assert_eq!(h.discoveries(), 1);
    let discovered = vec![SubnetId::new("subnet-a1"), SubnetId::new("subnet-b1")];
    assert_eq!(deployment.subnets.ecs.ids, discovered);
    assert_eq!(deployment.subnets.lb.ids, discovered);
    assert_eq!(
        deployment.subnets.db.ids,
        vec![SubnetId::new("subnet-d1"), SubnetId::new("subnet-d2")]
    );
    assert!(deployment.subnets.assign_public_ip());
}

// ── Fail-fast validation ─────────────────────────────────────────────

#[tokio::test]
async fn partial_domain_fails_before_any_declaration() {
    for yaml in [
        "domain:\n  hostedZoneName: example.com\n",
        "domain:\n  domainName: metabase.example.com\n",
    ] {
        let h = Harness::new(inventory());
        let err = h.deploy(yaml).await.unwrap_err();
        assert!(matches!(err, StackError::InvalidConfiguration { .. }), "got: {err}");
        assert!(h.backend.recorded().is_empty());
        assert_eq!(h.discoveries(), 0);
    }
}

#[tokio::test]
async fn unknown_strategy_fails_before_any_declaration() {
    let h = Harness::new(inventory());
    let err = h
        .deploy("authentication:\n  strategy: saml\n")
        .await
        .unwrap_err();
    assert!(matches!(err, StackError::InvalidConfiguration { .. }), "got: {err}");
    assert!(h.backend.recorded().is_empty());
}

// ── Lookups ──────────────────────────────────────────────────────────

#[tokio::test]
async fn too_few_public_zones_fail_with_guidance() {
    let mut inv = inventory();
    let vpc = default_vpc_id();
    inv.subnets = vec![
        subnet(&vpc, "subnet-a1", "us-east-1a", true),
        subnet(&vpc, "subnet-a2", "us-east-1a", true),
        subnet(&vpc, "subnet-b1", "us-east-1b", false),
    ];
    let h = Harness::new(inv);
    let err = h.deploy("").await.unwrap_err();
    assert!(
        matches!(err, StackError::InsufficientSubnets { found: 1, .. }),
        "got: {err}"
    );
    let message = err.to_string();
    assert!(message.contains("two public subnets"), "got: {message}");
    assert!(message.contains("explicit subnet ids"), "got: {message}");
    assert!(of_kind_recorded(&h, ResourceKind::SecurityGroup).is_empty());
}

#[tokio::test]
async fn missing_hosted_zone_is_a_visible_error() {
    let mut inv = inventory();
    inv.hosted_zones.clear();
    let h = Harness::new(inv);
    let err = h.deploy(DOMAIN).await.unwrap_err();
    assert!(
        matches!(err, StackError::LookupFailure { kind: "hosted zone", ref key } if key == "example.com"),
        "got: {err}"
    );
    assert!(of_kind_recorded(&h, ResourceKind::DnsRecord).is_empty());
    assert!(of_kind_recorded(&h, ResourceKind::Certificate).is_empty());
}

#[tokio::test]
async fn hosted_zone_with_empty_id_is_rejected() {
    let mut inv = inventory();
    inv.hosted_zones[0].id.clear();
    let h = Harness::new(inv);
    let err = h.deploy(DOMAIN).await.unwrap_err();
    assert!(matches!(err, StackError::LookupFailure { kind: "hosted zone", .. }));
}

#[tokio::test]
async fn unknown_vpc_is_a_lookup_failure() {
    let h = Harness::new(inventory());
    let err = h.deploy("vpcId: vpc-missing\n").await.unwrap_err();
    assert!(
        matches!(err, StackError::LookupFailure { kind: "VPC", ref key } if key == "vpc-missing"),
        "got: {err}"
    );
}

#[tokio::test]
async fn missing_execution_role_stops_before_task_definition() {
    let mut inv = inventory();
    inv.roles.clear();
    let h = Harness::new(inv);
    let err = h.deploy("").await.unwrap_err();
    assert!(matches!(err, StackError::LookupFailure { kind: "IAM role", .. }));
    assert!(of_kind_recorded(&h, ResourceKind::TaskDefinition).is_empty());
    assert!(of_kind_recorded(&h, ResourceKind::EcsService).is_empty());
}

fn of_kind_recorded(h: &Harness, kind: ResourceKind) -> Vec<ResourceDescriptor> {
    h.backend
        .recorded()
        .into_iter()
        .filter(|d| d.kind == kind)
        .collect()
}

// ── Network & security ───────────────────────────────────────────────

#[tokio::test]
async fn exactly_two_groups_and_three_rules() {
    let h = Harness::new(inventory());
    let deployment = h.deploy("").await.unwrap();

    let groups = of_kind(&deployment, ResourceKind::SecurityGroup);
    let rules = of_kind(&deployment, ResourceKind::SecurityGroupRule);
    assert_eq!(groups.len(), 2);
    assert_eq!(rules.len(), 3);

    let last_group = position(&deployment, ResourceKind::SecurityGroup, "demo-metabase-lb-sg");
    for name in ["demo-metabase-segment", "demo-metabase-self", "demo-metabase-egress"] {
        assert!(position(&deployment, ResourceKind::SecurityGroupRule, name) > last_group);
    }

    let service_group = find(&deployment, ResourceKind::SecurityGroup, "demo-metabase-sg");
    assert!(service_group.get("ingress").is_none());
    assert_eq!(
        deployment.outputs.security_group_id,
        h.backend
            .recorded()
            .iter()
            .find(|d| d.logical_name == "demo-metabase-segment")
            .and_then(|d| d.get("securityGroupId"))
            .and_then(Value::as_str)
            .unwrap()
    );
}

// ── Failure propagation ──────────────────────────────────────────────

#[tokio::test]
async fn rejected_group_aborts_everything_after_it() {
    let h = Harness::with_backend(inventory(), DryRunBackend::new().fail_on("demo-metabase-sg"));
    let err = h.deploy("").await.unwrap_err();
    assert!(
        matches!(err, StackError::ProvisioningFailure { ref logical_name, .. } if logical_name == "demo-metabase-sg"),
        "got: {err}"
    );
    let names = h.recorded_names();
    assert_eq!(names.last().map(String::as_str), Some("demo-metabase-sg"));
    assert!(!names.iter().any(|n| n == "demo-metabase-lb-sg"));
    assert!(h.backend.registered_outputs().is_none());
}

#[tokio::test]
async fn rejected_listener_never_declares_service() {
    let h = Harness::with_backend(
        inventory(),
        DryRunBackend::new().fail_on("demo-metabase-redirecthttp"),
    );
    let err = h.deploy("").await.unwrap_err();
    assert!(matches!(err, StackError::ProvisioningFailure { .. }));
    assert!(of_kind_recorded(&h, ResourceKind::EcsCluster).is_empty());
    assert!(of_kind_recorded(&h, ResourceKind::EcsService).is_empty());
}

// ── Authentication ───────────────────────────────────────────────────

#[tokio::test]
async fn google_authentication_precedes_forward() {
    let h = Harness::new(inventory());
    let deployment = h
        .deploy(
            r"
authentication:
  strategy: google
  strategyArgs:
    clientId: my-client
    clientSecret: super-secret-value
",
        )
        .await
        .unwrap();

    let listener = find(&deployment, ResourceKind::Listener, "demo-metabase");
    let actions = listener.get("defaultActions").unwrap().as_array().unwrap();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0]["type"], "authenticate-oidc");
    assert_eq!(actions[0]["order"], 1);
    assert_eq!(actions[0]["authenticateOidc"]["clientId"], "my-client");
    assert_eq!(
        actions[0]["authenticateOidc"]["issuer"],
        "https://accounts.google.com"
    );
    assert_eq!(actions[1]["type"], "forward");
    assert_eq!(actions[1]["order"], 2);

    let exposed: Value = serde_json::from_str(
        listener
            .secret_properties
            .get("defaultActions")
            .unwrap()
            .expose(),
    )
    .unwrap();
    assert_eq!(
        exposed[0]["authenticateOidc"]["clientSecret"],
        "super-secret-value"
    );
    assert_eq!(exposed[1]["targetGroupArn"], actions[1]["targetGroupArn"]);

    assert!(!render_json(&deployment).unwrap().contains("super-secret-value"));
    assert!(!render_plan(&deployment).contains("super-secret-value"));
}

// ── Environment & secrets ────────────────────────────────────────────

#[tokio::test]
async fn email_host_adds_smtp_entries() {
    let h = Harness::new(inventory());
    let deployment = h
        .deploy(
            r"
email:
  host: smtp.example.com
  username: mailer
  password: smtp-password-value
",
        )
        .await
        .unwrap();

    let task = find(&deployment, ResourceKind::TaskDefinition, "demo-metabase");
    let definitions: Value =
        serde_json::from_str(task.get("containerDefinitions").and_then(Value::as_str).unwrap())
            .unwrap();
    let names: Vec<&str> = definitions[0]["environment"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["name"].as_str())
        .collect();
    assert_eq!(names.len(), 12);
    assert!(names.contains(&"MB_EMAIL_SMTP_HOST"));
    assert!(names.contains(&"MB_EMAIL_SMTP_PORT"));
    assert!(!task.get("containerDefinitions").unwrap().to_string().contains("smtp-password-value"));
}

#[tokio::test]
async fn empty_email_host_adds_nothing() {
    let h = Harness::new(inventory());
    let deployment = h.deploy("email:\n  host: \"\"\n").await.unwrap();

    let task = find(&deployment, ResourceKind::TaskDefinition, "demo-metabase");
    let definitions = task.get("containerDefinitions").and_then(Value::as_str).unwrap();
    assert!(!definitions.contains("MB_EMAIL_SMTP"));
    assert!(definitions.contains("MB_DB_HOST"));
}

#[tokio::test]
async fn database_password_never_reaches_the_plan() {
    let h = Harness::new(inventory());
    let deployment = h.deploy(DOMAIN).await.unwrap();

    let cluster = find(&deployment, ResourceKind::DbCluster, "demo-metabase");
    let password = cluster
        .secret_properties
        .get("masterPassword")
        .unwrap()
        .expose()
        .to_string();
    assert_eq!(password.len(), 20);

    let task = find(&deployment, ResourceKind::TaskDefinition, "demo-metabase");
    assert!(
        task.secret_properties
            .get("containerDefinitions")
            .unwrap()
            .expose()
            .contains(&password)
    );

    let plan = render_plan(&deployment);
    assert!(!plan.contains(&password));
    assert!(plan.contains("masterPassword: [REDACTED]"));
    assert_eq!(plan.matches("containerDefinitions:").count(), 1);
    assert!(!render_json(&deployment).unwrap().contains(&password));
    assert!(!format!("{deployment:?}").contains(&password));
}

// ── Graph & outputs ──────────────────────────────────────────────────

#[tokio::test]
async fn order_places_dependencies_first() {
    let h = Harness::new(inventory());
    let deployment = h.deploy(DOMAIN).await.unwrap();

    assert_eq!(deployment.order.len(), deployment.resources.len());
    let index = |r: &ResourceRef| deployment.order.iter().position(|o| o == r).unwrap();
    for descriptor in &deployment.resources {
        let at = index(&descriptor.reference());
        for dep in descriptor.dependencies() {
            assert!(index(dep) < at, "{dep} must precede {}", descriptor.reference());
        }
    }
}

#[tokio::test]
async fn every_resource_is_nested_under_the_component() {
    let h = Harness::new(inventory());
    let deployment = h.deploy(DOMAIN).await.unwrap();

    assert_eq!(deployment.component, ResourceRef::new(ResourceKind::Component, STACK));
    assert_eq!(deployment.resources[0].kind, ResourceKind::Component);
    for descriptor in deployment.resources.iter().skip(1) {
        assert_eq!(descriptor.parent.as_ref(), Some(&deployment.component));
    }
}

#[tokio::test]
async fn caller_parent_only_nests_the_component() {
    let h = Harness::new(inventory());
    let parent = ResourceRef::new(ResourceKind::Component, "platform");
    let options = StackOptions {
        parent: Some(parent.clone()),
    };
    let deployment = h
        .engine
        .deploy(STACK, &StackConfig::default(), &options)
        .await
        .unwrap();

    assert_eq!(deployment.resources[0].parent.as_ref(), Some(&parent));
    let baseline = Harness::new(inventory()).deploy("").await.unwrap();
    assert_eq!(deployment.resources.len(), baseline.resources.len());
    assert_eq!(deployment.outputs, baseline.outputs);
}

#[tokio::test]
async fn outputs_are_registered_on_the_component() {
    let h = Harness::new(inventory());
    let deployment = h.deploy(DOMAIN).await.unwrap();

    let (component, outputs) = h.backend.registered_outputs().unwrap();
    assert_eq!(component, deployment.component);
    assert_eq!(outputs, deployment.outputs);
}

#[tokio::test]
async fn config_file_with_aliases_deploys() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(
        br"
version: v0.47.0
database:
  engineVersion: 5.7.mysql_aurora.2.11.2
",
    )
    .unwrap();
    let config = StackConfig::from_path(file.path()).unwrap();
    let engine = Engine::dry_run(inventory());
    let deployment = engine
        .deploy(STACK, &config, &StackOptions::default())
        .await
        .unwrap();

    assert_eq!(deployment.config.image(), "metabase/metabase:v0.47.0");
    let cluster = find(&deployment, ResourceKind::DbCluster, "demo-metabase");
    assert_eq!(
        cluster.get("engineVersion").and_then(Value::as_str),
        Some("5.7.mysql_aurora.2.11.2")
    );
}

#[tokio::test]
async fn empty_stack_name_is_rejected() {
    let engine = Engine::dry_run(inventory());
    let err = engine
        .deploy("  ", &StackConfig::default(), &StackOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StackError::InvalidConfiguration { .. }));
}
