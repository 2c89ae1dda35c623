mod tenant;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::RwLock;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::warn;

pub use tenant::{load_tenant_dir, CompanyInfo, SupportInfo, TenantConfig, DEFAULT_CLIENT_ID};

/// Resolves tenant configuration by client id. Unknown or blank ids resolve
/// to the default tenant; resolution never fails for a missing tenant.
pub trait TenantDirectory: Send + Sync {
    async fn resolve(&self, client_id: Option<&str>) -> Result<TenantConfig>;
    async fn upsert(&self, tenant: TenantConfig) -> Result<()>;
    async fn list_client_ids(&self) -> Result<Vec<String>>;
}

fn requested_id(client_id: Option<&str>) -> &str {
    client_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_CLIENT_ID)
}

#[derive(Clone)]
pub struct MemoryTenants {
    tenants: Arc<RwLock<HashMap<String, TenantConfig>>>,
}

impl Default for MemoryTenants {
    fn default() -> Self {
        let demo = TenantConfig::demo_business();
        let tenants = HashMap::from([(demo.client_id.clone(), demo)]);
        Self {
            tenants: Arc::new(RwLock::new(tenants)),
        }
    }
}

impl MemoryTenants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self> {
        let store = Self::new();
        {
            let mut guard = store.tenants.write();
            for tenant in load_tenant_dir(root.as_ref())? {
                guard.insert(tenant.client_id.clone(), tenant);
            }
        }
        Ok(store)
    }
}

impl TenantDirectory for MemoryTenants {
    async fn resolve(&self, client_id: Option<&str>) -> Result<TenantConfig> {
        let guard = self.tenants.read();
        let tenant = guard
            .get(requested_id(client_id))
            .or_else(|| guard.get(DEFAULT_CLIENT_ID))
            .cloned()
            .unwrap_or_else(TenantConfig::demo_business);
        Ok(tenant)
    }

    async fn upsert(&self, tenant: TenantConfig) -> Result<()> {
        self.tenants
            .write()
            .insert(tenant.client_id.clone(), tenant);
        Ok(())
    }

    async fn list_client_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<_> = self.tenants.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[derive(Clone)]
pub struct SqliteTenants {
    pool: SqlitePool,
}

impl SqliteTenants {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        store.seed_default().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tenants (
              client_id TEXT PRIMARY KEY,
              config_json TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn seed_default(&self) -> Result<()> {
        let demo = TenantConfig::demo_business();
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO tenants (client_id, config_json, updated_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&demo.client_id)
        .bind(serde_json::to_string(&demo)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, client_id: &str) -> Result<Option<TenantConfig>> {
        let row = sqlx::query("SELECT config_json FROM tenants WHERE client_id = ?1")
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let config_json: String = row.get("config_json");
        let mut tenant = match serde_json::from_str::<TenantConfig>(&config_json) {
            Ok(tenant) => tenant,
            Err(err) => {
                // Unreadable rows answer with the generic apology.
                warn!(
                    client_id = %client_id,
                    error = %err,
                    "corrupt tenant config, serving without replies"
                );
                TenantConfig::without_responses(client_id)
            }
        };
        tenant.client_id = client_id.to_string();
        Ok(Some(tenant))
    }
}

impl TenantDirectory for SqliteTenants {
    async fn resolve(&self, client_id: Option<&str>) -> Result<TenantConfig> {
        let requested = requested_id(client_id);
        if let Some(tenant) = self.load(requested).await? {
            return Ok(tenant);
        }
        if requested != DEFAULT_CLIENT_ID {
            if let Some(tenant) = self.load(DEFAULT_CLIENT_ID).await? {
                return Ok(tenant);
            }
        }
        Ok(TenantConfig::demo_business())
    }

    async fn upsert(&self, tenant: TenantConfig) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tenants (client_id, config_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(client_id) DO UPDATE SET
              config_json=excluded.config_json,
              updated_at=excluded.updated_at
            "#,
        )
        .bind(&tenant.client_id)
        .bind(serde_json::to_string(&tenant)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_client_ids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT client_id FROM tenants ORDER BY client_id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.get("client_id")).collect())
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryTenants),
    Sqlite(SqliteTenants),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryTenants::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteTenants::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    /// Picks the sqlite backend when a database url is given, memory
    /// otherwise, then upserts every tenant file found in `tenants_dir`.
    pub async fn open(database_url: Option<&str>, tenants_dir: Option<&Path>) -> Result<Self> {
        let store = match database_url {
            Some(url) => Self::sqlite(url).await?,
            None => Self::memory(),
        };

        if let Some(dir) = tenants_dir {
            let tenants = load_tenant_dir(dir)?;
            tracing::info!(dir = %dir.display(), count = tenants.len(), "loading tenant files");
            for tenant in tenants {
                store.upsert(tenant).await?;
            }
        }

        Ok(store)
    }
}

impl TenantDirectory for Store {
    async fn resolve(&self, client_id: Option<&str>) -> Result<TenantConfig> {
        match self {
            Store::Memory(store) => store.resolve(client_id).await,
            Store::Sqlite(store) => store.resolve(client_id).await,
        }
    }

    async fn upsert(&self, tenant: TenantConfig) -> Result<()> {
        match self {
            Store::Memory(store) => store.upsert(tenant).await,
            Store::Sqlite(store) => store.upsert(tenant).await,
        }
    }

    async fn list_client_ids(&self) -> Result<Vec<String>> {
        match self {
            Store::Memory(store) => store.list_client_ids().await,
            Store::Sqlite(store) => store.list_client_ids().await,
        }
    }
}
