//! SDN entities. The network service translates these declarative specs into
//! northbound writer operations; the writer assigns the external IDs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Realization phase of an SDN entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkPhase {
    Pending,
    Ready,
    Error,
}

impl std::fmt::Display for NetworkPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NetworkPhase::Pending => "Pending",
            NetworkPhase::Ready => "Ready",
            NetworkPhase::Error => "Error",
        };
        write!(f, "{}", s)
    }
}

/// A virtual L2 segment realized as a logical switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetwork {
    pub id: Uuid,
    pub name: String,
    pub subnet_cidr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<u32>,
    /// Assigned by the northbound writer once realized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub phase: NetworkPhase,
    #[serde(default)]
    pub status_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

impl VirtualNetwork {
    pub fn new(name: String, subnet_cidr: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            subnet_cidr,
            gateway_ip: None,
            vlan_id: None,
            external_id: None,
            phase: NetworkPhase::Pending,
            status_message: String::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

/// A logical switch port. Port <-> VM NIC binding is 1:1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: Uuid,
    pub network_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic_id: Option<String>,
    pub mac_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub phase: NetworkPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleDirection {
    Ingress,
    Egress,
}

/// One rule of a security group. Sources/targets may be CIDRs or label tags;
/// tag-based rules are expanded through address sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupRule {
    pub direction: RuleDirection,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_min: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_max: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_cidr: Option<String>,
    /// Label tag resolved to an address set of matching VM IPs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroup {
    pub id: Uuid,
    pub name: String,
    pub network_id: Uuid,
    #[serde(default)]
    pub rules: Vec<SecurityGroupRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub phase: NetworkPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

/// A floating IP; binding to a port is exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatingIp {
    pub id: Uuid,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub phase: NetworkPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerMember {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancer {
    pub id: Uuid,
    pub name: String,
    pub network_id: Uuid,
    pub vip: String,
    pub protocol_port: u16,
    #[serde(default)]
    pub members: Vec<LoadBalancerMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub phase: NetworkPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnService {
    pub id: Uuid,
    pub name: String,
    pub network_id: Uuid,
    pub peer_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub phase: NetworkPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BgpSpeaker {
    pub id: Uuid,
    pub name: String,
    pub local_as: u32,
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub phase: NetworkPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}
