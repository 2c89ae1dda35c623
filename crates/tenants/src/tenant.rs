use std::path::Path;

use anyhow::{Context, Result};
use dinchat_core::ResponseTable;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

pub const DEFAULT_CLIENT_ID: &str = "demo_business";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub hours: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub company: CompanyInfo,
    #[serde(default)]
    pub support: SupportInfo,
    #[serde(default)]
    pub responses: ResponseTable,
}

impl TenantConfig {
    pub fn demo_business() -> Self {
        let responses = [
            ("greeting", "Hej! Hvordan kan jeg hjælpe dig i dag?"),
            ("openingHours", "Vi har åbent mandag til fredag kl. 09:00–17:00."),
            (
                "prices",
                "Priser afhænger af den konkrete ydelse. Kontakt os gerne for et konkret tilbud.",
            ),
            ("booking", "Du kan booke en tid via vores hjemmeside."),
            (
                "contact",
                "Du kan kontakte os på telefon +45 12 34 56 78 eller via e-mail kontakt@virksomhed.dk.",
            ),
            ("location", "Vi holder til på Gade 12, 1234 By."),
            (
                "shipping",
                "Vi leverer typisk inden for 1–3 hverdage. Du modtager tracking-link, når pakken er afsendt.",
            ),
            (
                "returns",
                "Du har 14 dages returret. Kontakt os, så guider vi dig igennem returnering/bytte.",
            ),
            (
                "orderStatus",
                "Send gerne dit ordrenummer, så kan vi hjælpe med status. Alternativt kan du finde status i din ordrebekræftelse/tracking.",
            ),
            (
                "payments",
                "Vi tager imod kortbetaling og MobilePay. Kontakt os ved behov for faktura.",
            ),
            (
                "humanSupport",
                "Selvfølgelig — her er de hurtigste måder at få fat i os:\n\n\
                 • E-mail: support@dinchatbot.com\n\
                 • Telefon: +45 12 34 56 78\n\
                 • Supporttid: Man–Fre 09:00–16:00\n\n\
                 Skriv gerne kort hvad det handler om + evt. ordrenummer.",
            ),
            (
                "fallback",
                "Jeg kan desværre ikke besvare det spørgsmål. Kontakt os venligst for yderligere information.",
            ),
        ]
        .into_iter()
        .map(|(key, reply)| (key.to_string(), reply.to_string()))
        .collect();

        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            company: CompanyInfo {
                name: "Demo Business".to_string(),
                website: Some("https://dinchatbot.com".to_string()),
            },
            support: SupportInfo {
                email: Some("support@dinchatbot.com".to_string()),
                phone: Some("+45 12 34 56 78".to_string()),
                hours: Some("Man–Fre 09:00–16:00".to_string()),
            },
            responses,
        }
    }

    /// Tenant with no configured replies; every chat gets the generic apology.
    pub fn without_responses(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            company: CompanyInfo::default(),
            support: SupportInfo::default(),
            responses: ResponseTable::new(),
        }
    }
}

/// Reads every `*.json` tenant file below `root`. A file without a
/// `clientId` is keyed by its file stem.
pub fn load_tenant_dir(root: &Path) -> Result<Vec<TenantConfig>> {
    let mut tenants = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("json"))
    {
        let path = entry.path();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading tenant file: {}", path.display()))?;
        let mut tenant: TenantConfig = serde_json::from_str(&raw)
            .with_context(|| format!("invalid tenant file: {}", path.display()))?;

        if tenant.client_id.trim().is_empty() {
            tenant.client_id = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default()
                .to_string();
        }
        tenant.client_id = tenant.client_id.trim().to_string();

        if tenant.client_id.is_empty() {
            continue;
        }
        tenants.push(tenant);
    }

    Ok(tenants)
}
