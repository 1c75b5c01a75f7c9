mod config_elements;
mod config_groups;
mod device_models;
mod devices;
mod fetch_audit;
pub(crate) mod row_helpers;
mod sites;
mod virtual_devices;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::models::*;
use crate::tree::{ElementFilter, GroupFilter, NodeStore};

/// Typed error for "resource not found", downcast by the API error handler.
#[derive(Debug)]
pub struct NotFoundError {
    pub resource: String,
    pub id: String,
}

impl NotFoundError {
    pub fn new(resource: &str, id: &str) -> Self {
        Self {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} not found: {}", self.resource, self.id)
    }
}

impl std::error::Error for NotFoundError {}

/// Store handles all database operations, delegating to per-entity repo modules.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Create a new database store with a specific pool size
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Fresh in-memory database. One connection, since every SQLite
    /// `:memory:` connection is its own database.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    // ========== Sites ==========

    pub async fn list_sites(&self) -> Result<Vec<Site>> {
        sites::SiteRepo::list(&self.pool).await
    }

    pub async fn get_site(&self, id: &str) -> Result<Option<Site>> {
        sites::SiteRepo::get(&self.pool, id).await
    }

    pub async fn create_site(&self, req: &CreateSiteRequest) -> Result<Site> {
        sites::SiteRepo::create(&self.pool, req).await
    }

    pub async fn update_site(&self, id: &str, req: &UpdateSiteRequest) -> Result<Site> {
        sites::SiteRepo::update(&self.pool, id, req).await
    }

    pub async fn set_site_enabled(&self, id: &str, enabled: bool) -> Result<Site> {
        sites::SiteRepo::set_enabled(&self.pool, id, enabled).await
    }

    pub async fn delete_site(&self, id: &str) -> Result<()> {
        sites::SiteRepo::delete(&self.pool, id).await
    }

    // ========== Device Models ==========

    pub async fn list_device_models(&self) -> Result<Vec<DeviceModel>> {
        device_models::DeviceModelRepo::list(&self.pool).await
    }

    pub async fn get_device_model(&self, id: &str) -> Result<Option<DeviceModel>> {
        device_models::DeviceModelRepo::get(&self.pool, id).await
    }

    pub async fn create_device_model(&self, id: &str, req: &CreateDeviceModelRequest) -> Result<DeviceModel> {
        device_models::DeviceModelRepo::create(&self.pool, id, req).await
    }

    pub async fn update_device_model(&self, id: &str, req: &UpdateDeviceModelRequest) -> Result<DeviceModel> {
        device_models::DeviceModelRepo::update(&self.pool, id, req).await
    }

    pub async fn delete_device_model(&self, id: &str) -> Result<()> {
        device_models::DeviceModelRepo::delete(&self.pool, id).await
    }

    // ========== Devices ==========

    pub async fn list_devices_by_site(&self, site_id: &str) -> Result<Vec<Device>> {
        devices::DeviceRepo::list_by_site(&self.pool, site_id).await
    }

    pub async fn get_device(&self, id: &str) -> Result<Option<Device>> {
        devices::DeviceRepo::get(&self.pool, id).await
    }

    pub async fn get_device_by_mac(&self, mac: &str) -> Result<Option<Device>> {
        devices::DeviceRepo::get_by_mac(&self.pool, mac).await
    }

    pub async fn create_device(
        &self,
        site_id: &str,
        mac: &str,
        password_hash: &str,
        req: &CreateDeviceRequest,
    ) -> Result<Device> {
        devices::DeviceRepo::create(&self.pool, site_id, mac, password_hash, req).await
    }

    pub async fn update_device(&self, id: &str, req: &UpdateDeviceRequest) -> Result<Device> {
        devices::DeviceRepo::update(&self.pool, id, req).await
    }

    pub async fn set_device_enabled(&self, id: &str, enabled: bool) -> Result<Device> {
        devices::DeviceRepo::set_enabled(&self.pool, id, enabled).await
    }

    pub async fn delete_device(&self, id: &str) -> Result<()> {
        devices::DeviceRepo::delete(&self.pool, id).await
    }

    // ========== Virtual Devices ==========

    pub async fn list_virtual_devices(&self, site_id: &str) -> Result<Vec<VirtualDevice>> {
        virtual_devices::VirtualDeviceRepo::list_by_site(&self.pool, site_id).await
    }

    pub async fn get_virtual_device(&self, site_id: &str, id: &str) -> Result<Option<VirtualDevice>> {
        virtual_devices::VirtualDeviceRepo::get(&self.pool, site_id, id).await
    }

    pub async fn create_virtual_device(
        &self,
        site_id: &str,
        req: &CreateVirtualDeviceRequest,
    ) -> Result<VirtualDevice> {
        virtual_devices::VirtualDeviceRepo::create(&self.pool, site_id, req).await
    }

    pub async fn update_virtual_device(
        &self,
        site_id: &str,
        id: &str,
        req: &UpdateVirtualDeviceRequest,
    ) -> Result<VirtualDevice> {
        virtual_devices::VirtualDeviceRepo::update(&self.pool, site_id, id, req).await
    }

    pub async fn delete_virtual_device(&self, site_id: &str, id: &str) -> Result<()> {
        virtual_devices::VirtualDeviceRepo::delete(&self.pool, site_id, id).await
    }

    pub async fn count_virtual_devices_by_model(&self, model_id: &str) -> Result<i64> {
        virtual_devices::VirtualDeviceRepo::count_by_model(&self.pool, model_id).await
    }

    pub async fn count_virtual_devices_by_site(&self, site_id: &str) -> Result<i64> {
        virtual_devices::VirtualDeviceRepo::count_by_site(&self.pool, site_id).await
    }

    // ========== Fetch Audit ==========

    pub async fn list_fetch_audit(&self, limit: i32) -> Result<Vec<FetchAudit>> {
        fetch_audit::FetchAuditRepo::list(&self.pool, limit).await
    }

    pub async fn list_fetch_audit_by_device(&self, device_id: &str, limit: i32) -> Result<Vec<FetchAudit>> {
        fetch_audit::FetchAuditRepo::list_by_device(&self.pool, device_id, limit).await
    }

    pub async fn create_fetch_audit(
        &self,
        device_id: &str,
        success: bool,
        state_string: &str,
        remark: &str,
    ) -> Result<FetchAudit> {
        fetch_audit::FetchAuditRepo::create(&self.pool, device_id, success, state_string, remark).await
    }

    pub async fn prune_fetch_audit(&self, keep: i64) -> Result<u64> {
        fetch_audit::FetchAuditRepo::prune(&self.pool, keep).await
    }
}

// ========== Configuration tree ==========

#[async_trait]
impl NodeStore for Store {
    async fn find_group(&self, filter: &GroupFilter) -> Result<Option<ConfigGroup>> {
        config_groups::GroupRepo::find_one(&self.pool, filter).await
    }

    async fn find_groups(&self, filter: &GroupFilter) -> Result<Vec<ConfigGroup>> {
        config_groups::GroupRepo::find(&self.pool, filter).await
    }

    async fn save_group(&self, group: &ConfigGroup) -> Result<ConfigGroup> {
        config_groups::GroupRepo::save(&self.pool, group).await
    }

    async fn delete_group(&self, id: &str) -> Result<()> {
        config_groups::GroupRepo::delete(&self.pool, id).await
    }

    async fn find_element(&self, filter: &ElementFilter) -> Result<Option<ConfigElement>> {
        config_elements::ElementRepo::find_one(&self.pool, filter).await
    }

    async fn find_elements(&self, filter: &ElementFilter) -> Result<Vec<ConfigElement>> {
        config_elements::ElementRepo::find(&self.pool, filter).await
    }

    async fn save_element(&self, element: &ConfigElement) -> Result<ConfigElement> {
        config_elements::ElementRepo::save(&self.pool, element).await
    }

    async fn delete_element(&self, id: &str) -> Result<()> {
        config_elements::ElementRepo::delete(&self.pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{render_config_file, ConfigTree, DeviceTarget, FlattenMode, TreeError};
    use tokio_test::{assert_err, assert_ok};

    async fn seeded() -> (Store, Device) {
        let store = Store::in_memory().await.unwrap();
        let site = store
            .create_site(&CreateSiteRequest { name: "HQ".to_string(), remark: None })
            .await
            .unwrap();
        store
            .create_device_model(
                "t46u",
                &CreateDeviceModelRequest {
                    id: None,
                    name: "T46U".to_string(),
                    description: None,
                    default_config_name: "y000000000108.cfg".to_string(),
                },
            )
            .await
            .unwrap();
        let device = store
            .create_device(
                &site.id,
                "001565AABBCC",
                "hash",
                &CreateDeviceRequest {
                    name: "Reception".to_string(),
                    model_id: "t46u".to_string(),
                    mac_address: "00:15:65:aa:bb:cc".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        (store, device)
    }

    #[tokio::test]
    async fn test_group_round_trip_and_filters() {
        let store = Store::in_memory().await.unwrap();
        let scope = ScopeRef::new(ScopeKind::Site, "s1");
        let root = ConfigGroup::new_root(&scope, "account", Some("lines".to_string()));
        let saved = store.save_group(&root).await.unwrap();
        assert_eq!(saved.name, "account");
        assert_eq!(saved.scope_kind, ScopeKind::Site);
        assert_eq!(saved.remark.as_deref(), Some("lines"));

        let b = store.save_group(&ConfigGroup::new_child(&root.id, "b", None)).await.unwrap();
        let a = store.save_group(&ConfigGroup::new_child(&root.id, "a", None)).await.unwrap();

        let children = store.find_groups(&GroupFilter::children_of(&root.id)).await.unwrap();
        let ids: Vec<&str> = children.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec![b.id.as_str(), a.id.as_str()]);

        let found = store.find_group(&GroupFilter::root(&scope, "account")).await.unwrap();
        assert_eq!(found.map(|g| g.id), Some(root.id.clone()));
        assert!(store
            .find_group(&GroupFilter::root(&ScopeRef::new(ScopeKind::Site, "s2"), "account"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_save_group_upserts_in_place() {
        let store = Store::in_memory().await.unwrap();
        let scope = ScopeRef::global();
        let first = store.save_group(&ConfigGroup::new_root(&scope, "one", None)).await.unwrap();
        store.save_group(&ConfigGroup::new_root(&scope, "two", None)).await.unwrap();

        let mut renamed = first.clone();
        renamed.name = "uno".to_string();
        renamed.published = true;
        store.save_group(&renamed).await.unwrap();

        let roots = store.find_groups(&GroupFilter::roots(&scope)).await.unwrap();
        let names: Vec<&str> = roots.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["uno", "two"]);
        assert!(roots[0].published);
    }

    #[tokio::test]
    async fn test_unique_indexes() {
        let store = Store::in_memory().await.unwrap();
        let scope = ScopeRef::global();
        let root = store.save_group(&ConfigGroup::new_root(&scope, "account", None)).await.unwrap();
        assert_err!(store.save_group(&ConfigGroup::new_root(&scope, "account", None)).await);

        assert_ok!(store.save_element(&ConfigElement::new(&root.id, "k", "1", None)).await);
        assert_err!(store.save_element(&ConfigElement::new(&root.id, "k", "2", None)).await);
    }

    #[tokio::test]
    async fn test_element_filters_and_delete() {
        let store = Store::in_memory().await.unwrap();
        let element = store
            .save_element(&ConfigElement::new("g1", "server", "sip", None))
            .await
            .unwrap();
        assert!(element.remark.is_none());

        let found = store.find_element(&ElementFilter::keyed("g1", "server")).await.unwrap();
        assert_eq!(found.as_ref().map(|e| e.value.as_str()), Some("sip"));

        store.delete_element(&element.id).await.unwrap();
        assert!(store.find_elements(&ElementFilter::in_group("g1")).await.unwrap().is_empty());

        let err = store.delete_element(&element.id).await.unwrap_err();
        assert!(err.downcast_ref::<NotFoundError>().is_some());
    }

    #[tokio::test]
    async fn test_engine_over_sqlite() {
        let (store, device) = seeded().await;
        let tree = ConfigTree::new(store.clone());
        let scope = ScopeRef::new(ScopeKind::Device, device.id.clone());

        for path in ["account", "account/1"] {
            tree.create_at_path(&scope, path, &CreateNodeRequest::default()).await.unwrap();
        }
        let value = CreateNodeRequest { value: Some("sip.example.com".to_string()), remark: None };
        tree.create_at_path(&scope, "account/1/sip_server", &value).await.unwrap();
        for path in ["account", "account/1", "account/1/sip_server"] {
            tree.set_published_at_path(&scope, path, true).await.unwrap();
        }

        let target = DeviceTarget {
            device_id: device.id.clone(),
            model_id: device.model_id.clone(),
            site_id: device.site_id.clone(),
        };
        let config = tree
            .build_device_configuration(&target, FlattenMode::PublishedOnly)
            .await
            .unwrap();
        assert_eq!(
            render_config_file(&config),
            "#!version:1.0.0.1\naccount.1.sip_server = sip.example.com\n"
        );

        let err = tree.delete_at_path(&scope, "account/1").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<TreeError>(), Some(TreeError::NonEmpty(_))));
    }

    #[tokio::test]
    async fn test_sites_and_devices() {
        let (store, device) = seeded().await;
        assert!(!device.enabled);
        assert_eq!(device.mac_address, "001565AABBCC");

        let by_mac = store.get_device_by_mac("001565AABBCC").await.unwrap();
        assert_eq!(by_mac.map(|d| d.id), Some(device.id.clone()));

        let sites = store.list_sites().await.unwrap();
        assert_eq!(sites[0].device_count, Some(1));
        let site = store.set_site_enabled(&sites[0].id, true).await.unwrap();
        assert!(site.enabled);

        let models = store.list_device_models().await.unwrap();
        assert_eq!(models[0].device_count, Some(1));

        let updated = store
            .update_device(&device.id, &UpdateDeviceRequest { name: Some("Lobby".to_string()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.name, "Lobby");
        assert_eq!(updated.site_id, device.site_id);

        let err = store.delete_device("missing").await.unwrap_err();
        assert!(err.downcast_ref::<NotFoundError>().is_some());
    }

    #[tokio::test]
    async fn test_virtual_devices_scoped_to_site() {
        let (store, device) = seeded().await;
        let req = CreateVirtualDeviceRequest {
            name: "Line keys".to_string(),
            model_id: "t46u".to_string(),
            description: None,
        };
        let vdev = store.create_virtual_device(&device.site_id, &req).await.unwrap();
        assert!(!vdev.enabled);
        assert_eq!(store.count_virtual_devices_by_model("t46u").await.unwrap(), 1);
        assert_eq!(store.count_virtual_devices_by_site(&device.site_id).await.unwrap(), 1);

        assert!(store.get_virtual_device("other", &vdev.id).await.unwrap().is_none());
        let err = store
            .update_virtual_device("other", &vdev.id, &UpdateVirtualDeviceRequest::default())
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<NotFoundError>().is_some());

        let update = UpdateVirtualDeviceRequest {
            name: Some("Shared keys".to_string()),
            enabled: Some(true),
            ..Default::default()
        };
        let updated = store.update_virtual_device(&device.site_id, &vdev.id, &update).await.unwrap();
        assert_eq!(updated.name, "Shared keys");
        assert!(updated.enabled);
        assert_eq!(updated.model_id, "t46u");

        assert_ok!(store.delete_virtual_device(&device.site_id, &vdev.id).await);
        assert_err!(store.delete_virtual_device(&device.site_id, &vdev.id).await);
        assert!(store.list_virtual_devices(&device.site_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_audit_prune_keeps_newest() {
        let store = Store::in_memory().await.unwrap();
        for i in 0..5 {
            store
                .create_fetch_audit("d1", i % 2 == 0, "auth_ok_config_present", &format!("attempt {}", i))
                .await
                .unwrap();
        }
        assert_eq!(store.prune_fetch_audit(3).await.unwrap(), 2);

        let rows = store.list_fetch_audit(10).await.unwrap();
        let remarks: Vec<&str> = rows.iter().map(|r| r.remark.as_str()).collect();
        assert_eq!(remarks, vec!["attempt 4", "attempt 3", "attempt 2"]);
        assert_eq!(store.list_fetch_audit_by_device("d2", 10).await.unwrap().len(), 0);
    }
}
