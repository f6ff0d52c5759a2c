//! Permission catalog and the checkbox matrix of the access-requests panel.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::format::escape_html;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub const ADMIN_ACCESS: &str = "admin.access";
pub const OTHER_PERMISSIONS: &str = "Outras permissões";
pub const EMPTY_SUMMARY: &str = "Sem módulos adicionais selecionados";
pub const DEFAULT_PREVIEW_LIMIT: usize = 2;

/// Every module key with its label, in display order.
pub const MODULES: [(&str, &str); 28] = [
    ("dashboard.overview", "Dashboard - Visão geral"),
    ("automation.control", "Automação - Controle de execuções"),
    ("crm.overview", "CRM - Acesso ao painel"),
    ("crm.dashboard.metrics", "CRM - Visão geral de clientes"),
    ("crm.dashboard.alerts", "CRM - Alertas de renovação"),
    ("crm.dashboard.performance", "CRM - Performance de emissões"),
    ("crm.dashboard.partners", "CRM - Parceiro / Contador"),
    ("crm.import", "CRM - Importação de planilhas"),
    ("crm.clients", "CRM - Carteira de clientes"),
    ("crm.partners", "CRM - Parceiros e contadores"),
    ("crm.off", "CRM - Carteira Off"),
    ("crm.agenda", "CRM - Agenda operacional"),
    ("rfb.base", "Base RFB - Prospecção"),
    ("campaigns.email", "Campanhas - Disparos por e-mail"),
    ("social_accounts.manage", "Marketing - Contas de redes sociais"),
    ("templates.library", "Marketing - Biblioteca de templates"),
    ("whatsapp.access", "Conversas - WhatsApp Copilot"),
    ("marketing.lists", "Marketing - Listas e contatos"),
    ("marketing.segments", "Marketing - Segmentos dinâmicos"),
    ("marketing.email_accounts", "Marketing - Contas de envio"),
    ("finance.overview", "Financeiro - Visão geral"),
    ("finance.calendar", "Financeiro - Calendário fiscal"),
    ("finance.accounts", "Financeiro - Contas & lançamentos"),
    ("finance.accounts.manage", "Financeiro - Gestão das contas"),
    ("finance.cost_centers", "Financeiro - Centros de custo"),
    ("finance.transactions", "Financeiro - Lançamentos manuais"),
    ("config.manage", "Configurações do sistema"),
    (ADMIN_ACCESS, "Administração - Liberação de acessos"),
];

/// Pre-module permission names and what they grant today.
const LEGACY_MAP: &[(&str, &[&str])] = &[
    ("dashboard", &["dashboard.overview"]),
    ("automation", &["automation.control"]),
    (
        "crm",
        &[
            "crm.overview",
            "crm.dashboard.metrics",
            "crm.dashboard.alerts",
            "crm.dashboard.performance",
            "crm.dashboard.partners",
            "crm.import",
            "crm.clients",
            "crm.partners",
            "crm.off",
            "crm.agenda",
            "rfb.base",
        ],
    ),
    ("campaigns", &["campaigns.email"]),
    ("social_accounts", &["social_accounts.manage"]),
    ("templates", &["templates.library"]),
    ("whatsapp", &["whatsapp.access"]),
    (
        "marketing",
        &["marketing.lists", "marketing.segments", "marketing.email_accounts"],
    ),
    (
        "finance",
        &[
            "finance.overview",
            "finance.calendar",
            "finance.accounts",
            "finance.accounts.manage",
            "finance.cost_centers",
            "finance.transactions",
        ],
    ),
    ("config", &["config.manage"]),
];

/// Any of these implies access to the CRM panel itself.
const CRM_DEPENDENTS: [&str; 8] = [
    "crm.dashboard.metrics",
    "crm.dashboard.alerts",
    "crm.dashboard.performance",
    "crm.dashboard.partners",
    "crm.import",
    "crm.clients",
    "crm.partners",
    "crm.off",
];

pub fn is_valid_key(key: &str) -> bool {
    MODULES.iter().any(|(k, _)| *k == key)
}

pub fn label(key: &str) -> Option<&'static str> {
    MODULES.iter().find(|(k, _)| *k == key).map(|(_, l)| *l)
}

/// Key → label map of the whole catalog.
pub fn catalog_labels() -> IndexMap<String, String> {
    MODULES
        .iter()
        .map(|(k, l)| (k.to_string(), l.to_string()))
        .collect()
}

/// Normalize a raw permission list: expand legacy names, drop unknown keys,
/// add implied dependencies, dedupe and sort.
pub fn sanitize<I, S>(input: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized = BTreeSet::new();
    for item in input {
        let value = item.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        if let Some((_, mapped)) = LEGACY_MAP.iter().find(|(legacy, _)| *legacy == value) {
            normalized.extend(mapped.iter().copied().filter(|k| is_valid_key(k)));
            continue;
        }
        if let Some((key, _)) = MODULES.iter().find(|(k, _)| *k == value) {
            normalized.insert(*key);
        }
    }
    if CRM_DEPENDENTS.iter().any(|k| normalized.contains(k)) {
        normalized.insert("crm.overview");
    }
    if normalized.contains("marketing.lists") || normalized.contains("marketing.segments") {
        normalized.insert("marketing.email_accounts");
    }
    normalized.into_iter().map(String::from).collect()
}

fn sanitize_values(values: &[Value]) -> Vec<String> {
    sanitize(values.iter().filter_map(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// Read a stored permissions column: a JSON array, or a string holding one.
pub fn decode_permissions_field(value: &Value) -> Vec<String> {
    match value {
        Value::Array(arr) => sanitize_values(arr),
        Value::Object(map) => sanitize_values(&map.values().cloned().collect::<Vec<_>>()),
        Value::String(raw) if !raw.is_empty() => match serde_json::from_str::<Value>(raw) {
            Ok(decoded @ (Value::Array(_) | Value::Object(_))) => decode_permissions_field(&decoded),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Roles and profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("admin") {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }
}

/// Only administrators may hold `admin.access`.
pub fn apply_role_restrictions<S: AsRef<str>>(permissions: &[S], role: UserRole) -> Vec<String> {
    let kept = permissions
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| role == UserRole::Admin || *p != ADMIN_ACCESS);
    sanitize(kept)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub permissions: Vec<String>,
}

pub const DEFAULT_PROFILE: &str = "operational";

const OPERATIONAL: &[&str] = &[
    "dashboard.overview",
    "crm.overview",
    "crm.dashboard.metrics",
    "crm.dashboard.alerts",
    "crm.dashboard.performance",
    "crm.dashboard.partners",
    "crm.clients",
    "crm.partners",
    "crm.off",
    "crm.agenda",
    "crm.import",
    "rfb.base",
    "marketing.lists",
    "marketing.segments",
    "marketing.email_accounts",
    "campaigns.email",
    "social_accounts.manage",
    "whatsapp.access",
    "templates.library",
    "finance.overview",
    "finance.calendar",
    "finance.accounts",
    "finance.accounts.manage",
    "finance.cost_centers",
    "finance.transactions",
];

const MARKETING: &[&str] = &[
    "dashboard.overview",
    "marketing.lists",
    "marketing.segments",
    "marketing.email_accounts",
    "campaigns.email",
    "social_accounts.manage",
    "whatsapp.access",
    "templates.library",
];

const READONLY: &[&str] = &[
    "dashboard.overview",
    "crm.overview",
    "crm.dashboard.metrics",
    "crm.dashboard.alerts",
    "crm.dashboard.performance",
];

/// The quick-pick presets offered when approving a collaborator.
pub fn profiles() -> Vec<Profile> {
    let profile = |key, label, description, keys: &[&str]| Profile {
        key,
        label,
        description,
        permissions: sanitize(keys),
    };
    vec![
        profile(
            "operational",
            "Operacional",
            "Acesso completo ao CRM, listas de marketing e calendário.",
            OPERATIONAL,
        ),
        profile(
            "marketing",
            "Marketing & Conteúdo",
            "Campanhas, listas e redes sociais.",
            MARKETING,
        ),
        profile(
            "readonly",
            "Somente visualização",
            "Dashboard e relatórios do CRM sem edição.",
            READONLY,
        ),
        Profile {
            key: "admin",
            label: "Administrador",
            description: "Todos os módulos e painel de liberação.",
            permissions: sanitize(MODULES.iter().map(|(k, _)| *k)),
        },
    ]
}

/// Permissions of a named profile; empty for unknown names.
pub fn profile_permissions(name: &str) -> Vec<String> {
    profiles()
        .into_iter()
        .find(|p| p.key == name)
        .map(|p| p.permissions)
        .unwrap_or_default()
}

/// What a newly approved user gets: the default profile, or every module
/// except `admin.access` if that profile is empty.
pub fn default_user_keys() -> Vec<String> {
    let preset = profile_permissions(DEFAULT_PROFILE);
    if !preset.is_empty() {
        return preset;
    }
    MODULES
        .iter()
        .map(|(k, _)| k.to_string())
        .filter(|k| k != ADMIN_ACCESS)
        .collect()
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// A group as declared by the server; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GroupSpec {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub keys: Vec<String>,
}

impl GroupSpec {
    pub fn new(title: &str, subtitle: &str, keys: &[&str]) -> Self {
        GroupSpec {
            title: Some(title.to_string()),
            subtitle: Some(subtitle.to_string()),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PermissionGroup {
    pub title: String,
    pub subtitle: Option<String>,
    pub keys: Vec<String>,
}

/// Menu groups shown for collaborators.
pub fn collaborator_groups() -> Vec<GroupSpec> {
    vec![
        GroupSpec::new(
            "Menu Dashboard",
            "Painel principal e automação",
            &["dashboard.overview", "automation.control"],
        ),
        GroupSpec::new(
            "Menu Clientes",
            "CRM e gestão da carteira",
            &[
                "crm.overview",
                "crm.dashboard.metrics",
                "crm.dashboard.alerts",
                "crm.dashboard.performance",
                "crm.dashboard.partners",
                "crm.import",
                "crm.clients",
                "crm.partners",
                "crm.off",
            ],
        ),
        GroupSpec::new(
            "Menu Marketing",
            "Campanhas e presença digital",
            &["campaigns.email", "social_accounts.manage", "templates.library"],
        ),
        GroupSpec::new("Menu Configurações", "Parâmetros e integrações", &["config.manage"]),
    ]
}

/// Keep only labelled keys, drop groups left empty, and collect every
/// labelled key no group claimed into a trailing "Outras permissões".
pub fn normalize_groups(groups: &[GroupSpec], labels: &IndexMap<String, String>) -> Vec<PermissionGroup> {
    let mut claimed = BTreeSet::new();
    let mut normalized: Vec<PermissionGroup> = groups
        .iter()
        .filter_map(|group| {
            let keys: Vec<String> = group
                .keys
                .iter()
                .filter(|k| !k.is_empty() && labels.contains_key(k.as_str()))
                .cloned()
                .collect();
            if keys.is_empty() {
                return None;
            }
            claimed.extend(keys.iter().cloned());
            Some(PermissionGroup {
                title: group.title.clone().unwrap_or_else(|| OTHER_PERMISSIONS.to_string()),
                subtitle: group.subtitle.clone().filter(|s| !s.is_empty()),
                keys,
            })
        })
        .collect();

    let ungrouped: Vec<String> = labels
        .keys()
        .filter(|k| !claimed.contains(*k))
        .cloned()
        .collect();
    if !ungrouped.is_empty() {
        normalized.push(PermissionGroup {
            title: OTHER_PERMISSIONS.to_string(),
            subtitle: None,
            keys: ungrouped,
        });
    }
    normalized
}

// ---------------------------------------------------------------------------
// Matrix
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    /// `perm-{group index}-{key index}`.
    pub checkbox_id: String,
    pub key: String,
    pub label: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixGroup {
    pub title: String,
    pub subtitle: Option<String>,
    pub rows: Vec<MatrixRow>,
}

/// One fieldset of checkboxes per group, posted as `permissions[]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionMatrix {
    pub groups: Vec<MatrixGroup>,
}

impl PermissionMatrix {
    pub fn build<S: AsRef<str>>(
        groups: &[PermissionGroup],
        labels: &IndexMap<String, String>,
        selected: &[S],
    ) -> Self {
        let is_selected = |key: &str| selected.iter().any(|s| s.as_ref() == key);
        let groups = groups
            .iter()
            .enumerate()
            .map(|(g, group)| MatrixGroup {
                title: group.title.clone(),
                subtitle: group.subtitle.clone(),
                rows: group
                    .keys
                    .iter()
                    .enumerate()
                    .filter_map(|(k, key)| {
                        let label = labels.get(key)?;
                        Some(MatrixRow {
                            checkbox_id: format!("perm-{g}-{k}"),
                            key: key.clone(),
                            label: label.clone(),
                            checked: is_selected(key),
                        })
                    })
                    .collect(),
            })
            .collect();
        PermissionMatrix { groups }
    }

    pub fn checked_keys(&self) -> Vec<&str> {
        self.groups
            .iter()
            .flat_map(|g| &g.rows)
            .filter(|r| r.checked)
            .map(|r| r.key.as_str())
            .collect()
    }

    pub fn render_html(&self) -> String {
        let mut html = String::from("<div class=\"permission-matrix\">");
        for group in &self.groups {
            html.push_str("<fieldset><legend>");
            html.push_str(&escape_html(&group.title));
            html.push_str("</legend>");
            if let Some(subtitle) = &group.subtitle {
                html.push_str(&format!("<p>{}</p>", escape_html(subtitle)));
            }
            html.push_str("<div>");
            for row in &group.rows {
                let id = escape_html(&row.checkbox_id);
                html.push_str(&format!(
                    "<label for=\"{id}\"><input type=\"checkbox\" id=\"{id}\" name=\"permissions[]\" value=\"{}\"{}><span>{}</span></label>",
                    escape_html(&row.key),
                    if row.checked { " checked" } else { "" },
                    escape_html(&row.label),
                ));
            }
            html.push_str("</div></fieldset>");
        }
        html.push_str("</div>");
        html
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryEntry {
    pub title: String,
    pub preview: Vec<String>,
    /// Selected labels beyond the preview, shown as `+N`.
    pub extra: usize,
}

/// Condensed read-only view: per group with a selected key, the first
/// `max(1, preview_limit)` labels and a count of the rest.
pub fn summarize<S: AsRef<str>>(
    groups: &[PermissionGroup],
    labels: &IndexMap<String, String>,
    selected: &[S],
    preview_limit: usize,
) -> Vec<SummaryEntry> {
    let limit = preview_limit.max(1);
    groups
        .iter()
        .filter_map(|group| {
            let matching: Vec<String> = group
                .keys
                .iter()
                .filter(|k| selected.iter().any(|s| s.as_ref() == k.as_str()))
                .map(|k| labels.get(k).cloned().unwrap_or_else(|| k.clone()))
                .collect();
            if matching.is_empty() {
                return None;
            }
            Some(SummaryEntry {
                title: group.title.clone(),
                extra: matching.len().saturating_sub(limit),
                preview: matching.into_iter().take(limit).collect(),
            })
        })
        .collect()
}

pub fn render_summary_html(entries: &[SummaryEntry]) -> String {
    let mut html = String::from("<div class=\"permission-summary\" role=\"list\">");
    if entries.is_empty() {
        html.push_str(&format!(
            "<span class=\"permission-summary-empty\" role=\"listitem\">{EMPTY_SUMMARY}</span>"
        ));
    }
    for entry in entries {
        html.push_str(&format!(
            "<span class=\"permission-summary-item\" role=\"listitem\"><strong>{}</strong><span>{}",
            escape_html(&entry.title),
            escape_html(&entry.preview.join(", ")),
        ));
        if entry.extra > 0 {
            html.push_str(&format!(" <small>+{}</small>", entry.extra));
        }
        html.push_str("</span></span>");
    }
    html.push_str("</div>");
    html
}
