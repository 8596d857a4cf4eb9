//! Postgres-backed repositories.
//!
//! Every entity family lives in its own table with the entity serialized
//! into a `data` JSONB column next to a `version` counter; uniqueness is
//! enforced with expression indexes over the JSONB (see `migrations/`).
//! `update` is guarded by `WHERE version = $n`; status writes take a row
//! lock so concurrent heartbeats for one entity serialize.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{
    BgpSpeaker, Error, EventCategory, EventLevel, FloatingIp, Folder, HostPoolStatus, LoadBalancer,
    Node, NodeStatus, Port, Result, SecurityGroup, StoragePool, SystemEvent, VirtualMachine,
    VirtualNetwork, VmStatus, Volume, VpnService,
};

use super::{
    EventFilter, EventRepository, FolderRepository, NetworkRepository, NodeFilter, NodeRepository,
    Persistable, StoragePoolRepository, VmFilter, VmRepository, VolumeRepository,
};

/// Open a connection pool and run pending migrations.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|e| Error::Internal(format!("failed to connect to database: {}", e)))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| Error::Internal(format!("failed to run migrations: {}", e)))?;

    Ok(pool)
}

fn db_err(e: sqlx::Error, kind: &str) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return Error::already_exists(kind, "unique key");
        }
    }
    Error::Internal(format!("database error: {}", e))
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| Error::Internal(format!("failed to decode stored entity: {}", e)))
}

fn encode<T: Serialize>(entity: &T) -> Result<serde_json::Value> {
    serde_json::to_value(entity)
        .map_err(|e| Error::Internal(format!("failed to encode entity: {}", e)))
}

/// Shared CRUD over the uniform `(id, data, version)` table shape.
struct BlobTable {
    pool: PgPool,
    table: &'static str,
    kind: &'static str,
}

impl BlobTable {
    fn new(pool: PgPool, table: &'static str, kind: &'static str) -> Self {
        Self { pool, table, kind }
    }

    async fn insert<T: Persistable + Serialize>(&self, entity: &T) -> Result<T> {
        let mut stored = entity.clone();
        stored.set_version(1);
        let sql = format!(
            "INSERT INTO {} (id, data, version) VALUES ($1, $2, 1)",
            self.table
        );
        sqlx::query(&sql)
            .bind(stored.id())
            .bind(encode(&stored)?)
            .execute(&self.pool)
            .await
            .map_err(|e| db_err(e, self.kind))?;
        Ok(stored)
    }

    async fn fetch<T: DeserializeOwned>(&self, id: Uuid) -> Result<T> {
        let sql = format!("SELECT data FROM {} WHERE id = $1", self.table);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err(e, self.kind))?
            .ok_or_else(|| Error::not_found(self.kind, id))?;
        decode(row.try_get("data").map_err(|e| db_err(e, self.kind))?)
    }

    /// Look up by one JSONB text field.
    async fn find_by<T: DeserializeOwned>(&self, key: &str, value: &str) -> Result<Option<T>> {
        let sql = format!(
            "SELECT data FROM {} WHERE data->>'{}' = $1",
            self.table, key
        );
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err(e, self.kind))?;
        row.map(|r| decode(r.try_get("data").map_err(|e| db_err(e, self.kind))?))
            .transpose()
    }

    async fn list_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let sql = format!("SELECT data FROM {} ORDER BY id", self.table);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err(e, self.kind))?;
        rows.into_iter()
            .map(|r| decode(r.try_get("data").map_err(|e| db_err(e, self.kind))?))
            .collect()
    }

    async fn update<T: Persistable + Serialize>(&self, entity: &T) -> Result<T> {
        let mut next = entity.clone();
        next.set_version(entity.version() + 1);
        next.touch();
        let sql = format!(
            "UPDATE {} SET data = $2, version = version + 1 WHERE id = $1 AND version = $3",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(next.id())
            .bind(encode(&next)?)
            .bind(entity.version())
            .execute(&self.pool)
            .await
            .map_err(|e| db_err(e, self.kind))?;
        if result.rows_affected() == 0 {
            // Distinguish a lost race from a missing row.
            let exists_sql = format!("SELECT 1 AS one FROM {} WHERE id = $1", self.table);
            let exists = sqlx::query(&exists_sql)
                .bind(next.id())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_err(e, self.kind))?
                .is_some();
            return if exists {
                Err(Error::Conflict(format!(
                    "{} {} modified concurrently",
                    self.kind,
                    next.id()
                )))
            } else {
                Err(Error::not_found(self.kind, next.id()))
            };
        }
        Ok(next)
    }

    /// Read-modify-write under a row lock. Used for status writes, which are
    /// host-authoritative and must not fail on version races.
    async fn mutate<T, F>(&self, id: Uuid, f: F) -> Result<T>
    where
        T: Persistable + Serialize + DeserializeOwned,
        F: FnOnce(&mut T) + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_err(e, self.kind))?;
        let select_sql = format!("SELECT data FROM {} WHERE id = $1 FOR UPDATE", self.table);
        let row = sqlx::query(&select_sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_err(e, self.kind))?
            .ok_or_else(|| Error::not_found(self.kind, id))?;
        let mut entity: T = decode(row.try_get("data").map_err(|e| db_err(e, self.kind))?)?;
        f(&mut entity);
        entity.set_version(entity.version() + 1);
        entity.touch();
        let update_sql = format!(
            "UPDATE {} SET data = $2, version = version + 1 WHERE id = $1",
            self.table
        );
        sqlx::query(&update_sql)
            .bind(id)
            .bind(encode(&entity)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err(e, self.kind))?;
        tx.commit().await.map_err(|e| db_err(e, self.kind))?;
        Ok(entity)
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_err(e, self.kind))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(self.kind, id));
        }
        Ok(())
    }
}

// =============================================================================
// Nodes
// =============================================================================

pub struct PostgresNodeRepository {
    table: BlobTable,
}

impl PostgresNodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { table: BlobTable::new(pool, "nodes", "node") }
    }
}

#[async_trait]
impl NodeRepository for PostgresNodeRepository {
    async fn create(&self, node: &Node) -> Result<Node> {
        self.table.insert(node).await
    }

    async fn get(&self, id: Uuid) -> Result<Node> {
        self.table.fetch(id).await
    }

    async fn get_by_hostname(&self, hostname: &str) -> Result<Option<Node>> {
        self.table.find_by("hostname", hostname).await
    }

    async fn list(&self, filter: &NodeFilter) -> Result<Vec<Node>> {
        let nodes: Vec<Node> = self.table.list_all().await?;
        Ok(nodes.into_iter().filter(|n| filter.matches(n)).collect())
    }

    async fn update(&self, node: &Node) -> Result<Node> {
        self.table.update(node).await
    }

    async fn update_status(&self, id: Uuid, status: &NodeStatus) -> Result<Node> {
        let status = status.clone();
        self.table
            .mutate(id, move |node: &mut Node| node.status = status)
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.table.remove(id).await
    }
}

// =============================================================================
// Virtual machines
// =============================================================================

pub struct PostgresVmRepository {
    table: BlobTable,
}

impl PostgresVmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { table: BlobTable::new(pool, "virtual_machines", "VM") }
    }
}

#[async_trait]
impl VmRepository for PostgresVmRepository {
    async fn create(&self, vm: &VirtualMachine) -> Result<VirtualMachine> {
        self.table.insert(vm).await
    }

    async fn get(&self, id: Uuid) -> Result<VirtualMachine> {
        self.table.fetch(id).await
    }

    async fn get_by_name(&self, project_id: Uuid, name: &str) -> Result<Option<VirtualMachine>> {
        let sql = "SELECT data FROM virtual_machines \
                   WHERE data->>'projectId' = $1 AND data->>'name' = $2";
        let row = sqlx::query(sql)
            .bind(project_id.to_string())
            .bind(name)
            .fetch_optional(&self.table.pool)
            .await
            .map_err(|e| db_err(e, "VM"))?;
        row.map(|r| decode(r.try_get("data").map_err(|e| db_err(e, "VM"))?))
            .transpose()
    }

    async fn list(&self, filter: &VmFilter) -> Result<Vec<VirtualMachine>> {
        let vms: Vec<VirtualMachine> = self.table.list_all().await?;
        Ok(vms.into_iter().filter(|v| filter.matches(v)).collect())
    }

    async fn update(&self, vm: &VirtualMachine) -> Result<VirtualMachine> {
        self.table.update(vm).await
    }

    async fn update_status(&self, id: Uuid, status: &VmStatus) -> Result<VirtualMachine> {
        let status = status.clone();
        self.table
            .mutate(id, move |vm: &mut VirtualMachine| vm.status = status)
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.table.remove(id).await
    }
}

// =============================================================================
// Storage pools and volumes
// =============================================================================

pub struct PostgresStoragePoolRepository {
    table: BlobTable,
}

impl PostgresStoragePoolRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { table: BlobTable::new(pool, "storage_pools", "storage pool") }
    }
}

#[async_trait]
impl StoragePoolRepository for PostgresStoragePoolRepository {
    async fn create(&self, pool: &StoragePool) -> Result<StoragePool> {
        self.table.insert(pool).await
    }

    async fn get(&self, id: Uuid) -> Result<StoragePool> {
        self.table.fetch(id).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<StoragePool>> {
        self.table.find_by("name", name).await
    }

    async fn list(&self) -> Result<Vec<StoragePool>> {
        self.table.list_all().await
    }

    async fn update(&self, pool: &StoragePool) -> Result<StoragePool> {
        self.table.update(pool).await
    }

    async fn set_host_status(
        &self,
        id: Uuid,
        node_id: Uuid,
        status: &HostPoolStatus,
    ) -> Result<StoragePool> {
        let status = status.clone();
        self.table
            .mutate(id, move |pool: &mut StoragePool| {
                pool.host_statuses.insert(node_id, status);
            })
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.table.remove(id).await
    }
}

pub struct PostgresVolumeRepository {
    table: BlobTable,
}

impl PostgresVolumeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { table: BlobTable::new(pool, "volumes", "volume") }
    }
}

#[async_trait]
impl VolumeRepository for PostgresVolumeRepository {
    async fn create(&self, volume: &Volume) -> Result<Volume> {
        self.table.insert(volume).await
    }

    async fn get(&self, id: Uuid) -> Result<Volume> {
        self.table.fetch(id).await
    }

    async fn get_by_name(&self, pool_id: Uuid, name: &str) -> Result<Option<Volume>> {
        let sql = "SELECT data FROM volumes \
                   WHERE data->>'poolId' = $1 AND data->>'name' = $2";
        let row = sqlx::query(sql)
            .bind(pool_id.to_string())
            .bind(name)
            .fetch_optional(&self.table.pool)
            .await
            .map_err(|e| db_err(e, "volume"))?;
        row.map(|r| decode(r.try_get("data").map_err(|e| db_err(e, "volume"))?))
            .transpose()
    }

    async fn list(&self, pool_id: Option<Uuid>) -> Result<Vec<Volume>> {
        let volumes: Vec<Volume> = self.table.list_all().await?;
        Ok(volumes
            .into_iter()
            .filter(|v| pool_id.map_or(true, |id| v.pool_id == id))
            .collect())
    }

    async fn update(&self, volume: &Volume) -> Result<Volume> {
        self.table.update(volume).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.table.remove(id).await
    }
}

// =============================================================================
// Network entities
// =============================================================================

pub struct PostgresNetworkRepository {
    networks: BlobTable,
    ports: BlobTable,
    security_groups: BlobTable,
    floating_ips: BlobTable,
    load_balancers: BlobTable,
    vpn_services: BlobTable,
    bgp_speakers: BlobTable,
}

impl PostgresNetworkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            networks: BlobTable::new(pool.clone(), "virtual_networks", "network"),
            ports: BlobTable::new(pool.clone(), "ports", "port"),
            security_groups: BlobTable::new(pool.clone(), "security_groups", "security group"),
            floating_ips: BlobTable::new(pool.clone(), "floating_ips", "floating IP"),
            load_balancers: BlobTable::new(pool.clone(), "load_balancers", "load balancer"),
            vpn_services: BlobTable::new(pool.clone(), "vpn_services", "VPN service"),
            bgp_speakers: BlobTable::new(pool, "bgp_speakers", "BGP speaker"),
        }
    }
}

#[async_trait]
impl NetworkRepository for PostgresNetworkRepository {
    async fn create_network(&self, network: &VirtualNetwork) -> Result<VirtualNetwork> {
        self.networks.insert(network).await
    }

    async fn get_network(&self, id: Uuid) -> Result<VirtualNetwork> {
        self.networks.fetch(id).await
    }

    async fn get_network_by_name(&self, name: &str) -> Result<Option<VirtualNetwork>> {
        self.networks.find_by("name", name).await
    }

    async fn list_networks(&self) -> Result<Vec<VirtualNetwork>> {
        self.networks.list_all().await
    }

    async fn update_network(&self, network: &VirtualNetwork) -> Result<VirtualNetwork> {
        self.networks.update(network).await
    }

    async fn delete_network(&self, id: Uuid) -> Result<()> {
        self.networks.remove(id).await
    }

    async fn create_port(&self, port: &Port) -> Result<Port> {
        self.ports.insert(port).await
    }

    async fn get_port(&self, id: Uuid) -> Result<Port> {
        self.ports.fetch(id).await
    }

    async fn list_ports(&self, network_id: Option<Uuid>, vm_id: Option<Uuid>) -> Result<Vec<Port>> {
        let ports: Vec<Port> = self.ports.list_all().await?;
        Ok(ports
            .into_iter()
            .filter(|p| {
                network_id.map_or(true, |id| p.network_id == id)
                    && vm_id.map_or(true, |id| p.vm_id == Some(id))
            })
            .collect())
    }

    async fn update_port(&self, port: &Port) -> Result<Port> {
        self.ports.update(port).await
    }

    async fn delete_port(&self, id: Uuid) -> Result<()> {
        self.ports.remove(id).await
    }

    async fn create_security_group(&self, group: &SecurityGroup) -> Result<SecurityGroup> {
        self.security_groups.insert(group).await
    }

    async fn get_security_group(&self, id: Uuid) -> Result<SecurityGroup> {
        self.security_groups.fetch(id).await
    }

    async fn list_security_groups(&self) -> Result<Vec<SecurityGroup>> {
        self.security_groups.list_all().await
    }

    async fn update_security_group(&self, group: &SecurityGroup) -> Result<SecurityGroup> {
        self.security_groups.update(group).await
    }

    async fn delete_security_group(&self, id: Uuid) -> Result<()> {
        self.security_groups.remove(id).await
    }

    async fn create_floating_ip(&self, fip: &FloatingIp) -> Result<FloatingIp> {
        self.floating_ips.insert(fip).await
    }

    async fn get_floating_ip(&self, id: Uuid) -> Result<FloatingIp> {
        self.floating_ips.fetch(id).await
    }

    async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>> {
        self.floating_ips.list_all().await
    }

    async fn update_floating_ip(&self, fip: &FloatingIp) -> Result<FloatingIp> {
        self.floating_ips.update(fip).await
    }

    async fn delete_floating_ip(&self, id: Uuid) -> Result<()> {
        self.floating_ips.remove(id).await
    }

    async fn create_load_balancer(&self, lb: &LoadBalancer) -> Result<LoadBalancer> {
        self.load_balancers.insert(lb).await
    }

    async fn get_load_balancer(&self, id: Uuid) -> Result<LoadBalancer> {
        self.load_balancers.fetch(id).await
    }

    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>> {
        self.load_balancers.list_all().await
    }

    async fn update_load_balancer(&self, lb: &LoadBalancer) -> Result<LoadBalancer> {
        self.load_balancers.update(lb).await
    }

    async fn delete_load_balancer(&self, id: Uuid) -> Result<()> {
        self.load_balancers.remove(id).await
    }

    async fn create_vpn_service(&self, vpn: &VpnService) -> Result<VpnService> {
        self.vpn_services.insert(vpn).await
    }

    async fn get_vpn_service(&self, id: Uuid) -> Result<VpnService> {
        self.vpn_services.fetch(id).await
    }

    async fn list_vpn_services(&self) -> Result<Vec<VpnService>> {
        self.vpn_services.list_all().await
    }

    async fn update_vpn_service(&self, vpn: &VpnService) -> Result<VpnService> {
        self.vpn_services.update(vpn).await
    }

    async fn delete_vpn_service(&self, id: Uuid) -> Result<()> {
        self.vpn_services.remove(id).await
    }

    async fn create_bgp_speaker(&self, speaker: &BgpSpeaker) -> Result<BgpSpeaker> {
        self.bgp_speakers.insert(speaker).await
    }

    async fn get_bgp_speaker(&self, id: Uuid) -> Result<BgpSpeaker> {
        self.bgp_speakers.fetch(id).await
    }

    async fn list_bgp_speakers(&self) -> Result<Vec<BgpSpeaker>> {
        self.bgp_speakers.list_all().await
    }

    async fn update_bgp_speaker(&self, speaker: &BgpSpeaker) -> Result<BgpSpeaker> {
        self.bgp_speakers.update(speaker).await
    }

    async fn delete_bgp_speaker(&self, id: Uuid) -> Result<()> {
        self.bgp_speakers.remove(id).await
    }
}

// =============================================================================
// Folders
// =============================================================================

pub struct PostgresFolderRepository {
    table: BlobTable,
}

impl PostgresFolderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { table: BlobTable::new(pool, "folders", "folder") }
    }
}

#[async_trait]
impl FolderRepository for PostgresFolderRepository {
    async fn create(&self, folder: &Folder) -> Result<Folder> {
        self.table.insert(folder).await
    }

    async fn get(&self, id: Uuid) -> Result<Folder> {
        self.table.fetch(id).await
    }

    async fn list(&self, project_id: Option<Uuid>) -> Result<Vec<Folder>> {
        let folders: Vec<Folder> = self.table.list_all().await?;
        Ok(folders
            .into_iter()
            .filter(|f| project_id.map_or(true, |id| f.project_id == id))
            .collect())
    }

    async fn list_children(&self, parent_id: Option<Uuid>, project_id: Uuid) -> Result<Vec<Folder>> {
        let folders: Vec<Folder> = self.table.list_all().await?;
        Ok(folders
            .into_iter()
            .filter(|f| f.parent_id == parent_id && f.project_id == project_id)
            .collect())
    }

    async fn update(&self, folder: &Folder) -> Result<Folder> {
        self.table.update(folder).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.table.remove(id).await
    }
}

// =============================================================================
// Events
// =============================================================================

pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn append(&self, event: &SystemEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO events (id, ts, level, category, event_type, resource_id, message, data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.id)
        .bind(event.timestamp)
        .bind(event.level.to_string())
        .bind(event.category.to_string())
        .bind(&event.event_type)
        .bind(event.resource_id)
        .bind(&event.message)
        .bind(encode(event)?)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err(e, "event"))?;
        Ok(())
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<SystemEvent>> {
        let limit = filter.limit.unwrap_or(1000) as i64;
        let rows = sqlx::query(
            "SELECT data FROM events \
             WHERE ($1::text IS NULL OR level = $1) \
               AND ($2::text IS NULL OR category = $2) \
               AND ($3::uuid IS NULL OR resource_id = $3) \
             ORDER BY ts DESC LIMIT $4",
        )
        .bind(filter.level.map(|l: EventLevel| l.to_string()))
        .bind(filter.category.map(|c: EventCategory| c.to_string()))
        .bind(filter.resource_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err(e, "event"))?;
        rows.into_iter()
            .map(|r| decode(r.try_get("data").map_err(|e| db_err(e, "event"))?))
            .collect()
    }
}
