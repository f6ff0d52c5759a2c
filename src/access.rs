//! Admin access-requests panel: the people listed and the form posts that
//! act on them.

use serde::Deserialize;
use serde_json::Value;

use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::format::{digits_only, format_datetime_br};
use crate::permissions::{self, apply_role_restrictions, UserRole};
use crate::transport::FormData;

pub type UserId = i64;
pub type RequestId = i64;

pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const REMOVE_AVP_CONFIRM: &str = "Remover este AVP das liberações?";
pub const DELETE_USER_CONFIRM: &str =
    "Tem certeza que deseja excluir este colaborador? Esta ação não pode ser desfeita.";
pub const DELETE_DEACTIVATED_CONFIRM: &str =
    "Tem certeza que deseja excluir este colaborador desativado?";

// ---------------------------------------------------------------------------
// Listing models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AccessRequest {
    pub id: RequestId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl AccessRequest {
    pub fn is_pending(&self) -> bool {
        self.status.as_deref() == Some("pending")
    }

    /// When the request was filed, as shown in the pending list.
    pub fn requested_at_label(&self) -> String {
        format_datetime_br(self.created_at, "Data não informada")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ManagedUser {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Stored permission list: an array, or a JSON string holding one.
    #[serde(default)]
    pub permissions: Value,
    #[serde(default)]
    pub client_access_scope: Option<String>,
}

impl ManagedUser {
    pub fn role(&self) -> UserRole {
        UserRole::parse(self.role.as_deref().unwrap_or_default())
    }

    pub fn is_deactivated(&self) -> bool {
        self.status.as_deref() == Some("inactive")
    }

    pub fn permission_keys(&self) -> Vec<String> {
        apply_role_restrictions(&permissions::decode_permissions_field(&self.permissions), self.role())
    }

    pub fn access_scope(&self) -> AccessScope {
        AccessScope::parse(self.client_access_scope.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessScope {
    #[default]
    All,
    /// Only clients whose last AVP is explicitly allowed.
    Custom,
}

impl AccessScope {
    pub fn parse(raw: &str) -> Self {
        if raw == "custom" {
            AccessScope::Custom
        } else {
            AccessScope::All
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessScope::All => "all",
            AccessScope::Custom => "custom",
        }
    }
}

// ---------------------------------------------------------------------------
// Access window
// ---------------------------------------------------------------------------

/// Per-collaborator login hours as typed in the panel (`HH:MM`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessWindow {
    pub start: Option<String>,
    pub end: Option<String>,
    pub require_known_device: bool,
    /// Drop the custom window and fall back to the general one.
    pub clear: bool,
}

/// Minutes since midnight for a strict `HH:MM` value.
pub fn parse_time_input(value: &str) -> Option<u32> {
    let value = value.trim();
    let (h, m) = value.split_once(':')?;
    if h.len() != 2 || m.len() != 2 || !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes): (u32, u32) = (h.parse().ok()?, m.parse().ok()?);
    (hours <= 23 && minutes <= 59).then_some(hours * 60 + minutes)
}

impl AccessWindow {
    pub fn validate(&self) -> Result<()> {
        if self.clear {
            return Ok(());
        }
        let parse = |raw: &Option<String>, message: &str| -> Result<Option<u32>> {
            match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                None => Ok(None),
                Some(v) => parse_time_input(v)
                    .map(Some)
                    .ok_or_else(|| Error::Validation(message.to_string())),
            }
        };
        let start = parse(&self.start, "Horário inicial inválido. Use o formato HH:MM.")?;
        let end = parse(&self.end, "Horário final inválido. Use o formato HH:MM.")?;
        match (start, end) {
            (Some(s), Some(e)) if s >= e => Err(Error::Validation(
                "O horário inicial deve ser menor que o horário final.".into(),
            )),
            (Some(_), None) | (None, Some(_)) => Err(Error::Validation(
                "Informe os dois horários para criar uma janela personalizada.".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Checks done before a reset is posted; the server applies its full
/// password policy afterwards.
pub fn validate_password_reset(password: &str, confirmation: &str) -> Result<()> {
    if password.is_empty() || confirmation.is_empty() {
        return Err(Error::Validation("Informe a nova senha e a confirmação.".into()));
    }
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(Error::Validation(
            "A senha deve ter pelo menos 8 caracteres.".into(),
        ));
    }
    if password != confirmation {
        return Err(Error::Validation("As senhas informadas não conferem.".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum AdminAction {
    ApproveLogin(UserId),
    DenyLogin(UserId),
    ApproveRequest { id: RequestId, reason: Option<String> },
    DenyRequest { id: RequestId, reason: Option<String> },
    DevicePolicy { admin_id: UserId, require_known_device: bool },
    UpdateAccessWindow { user_id: UserId, window: AccessWindow },
    LookupIdentity { user_id: UserId, query: String },
    LinkIdentity { user_id: UserId, client_id: i64 },
    UpdateIdentity { user_id: UserId, cpf: String },
    AvpProfile {
        user_id: UserId,
        is_avp: bool,
        label: Option<String>,
        cpf: Option<String>,
    },
    ClientAccessScope { user_id: UserId, scope: AccessScope },
    SyncClientAccess(UserId),
    AllowOnlineClients { user_id: UserId, allow: bool },
    GrantClientAccess {
        user_id: UserId,
        avp_labels: Vec<String>,
        custom_label: Option<String>,
        custom_cpf: Option<String>,
    },
    RevokeClientAccess { user_id: UserId, filter_id: i64 },
    ChatPermissions {
        user_id: UserId,
        allow_internal: bool,
        allow_external: bool,
    },
    /// `identifier: None` clears it.
    ChatIdentifier {
        user_id: UserId,
        identifier: Option<String>,
        display_name: Option<String>,
    },
    Permissions {
        user_id: UserId,
        role: UserRole,
        permissions: Vec<String>,
    },
    ForceLogout(UserId),
    Activate(UserId),
    Deactivate(UserId),
    Delete { user_id: UserId, deactivated: bool },
    ResetPassword {
        user_id: UserId,
        password: String,
        confirmation: String,
    },
}

/// A ready-to-send admin form.
#[derive(Debug, Clone)]
pub struct FormPost {
    pub path: String,
    pub fields: FormData,
}

/// Upper bound on AVP labels granted in one post.
const MAX_AVP_LABELS: usize = 200;

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AdminAction {
    /// Path relative to the deployment root.
    pub fn path(&self) -> String {
        use AdminAction::*;
        let user = |id: &UserId, tail: &str| format!("/admin/users/{id}/{tail}");
        match self {
            ApproveLogin(id) => user(id, "approve"),
            DenyLogin(id) => user(id, "deny"),
            ApproveRequest { id, .. } => format!("/admin/access-requests/{id}/approve"),
            DenyRequest { id, .. } => format!("/admin/access-requests/{id}/deny"),
            DevicePolicy { admin_id, .. } => format!("/admin/admins/{admin_id}/device-policy"),
            UpdateAccessWindow { user_id, .. } => user(user_id, "access-window"),
            LookupIdentity { user_id, .. } => user(user_id, "identity/lookup"),
            LinkIdentity { user_id, .. } => user(user_id, "identity/link"),
            UpdateIdentity { user_id, .. } => user(user_id, "identity"),
            AvpProfile { user_id, .. } => user(user_id, "avp-profile"),
            ClientAccessScope { user_id, .. } => user(user_id, "client-access/scope"),
            SyncClientAccess(id) => user(id, "client-access/sync"),
            AllowOnlineClients { user_id, .. } => user(user_id, "client-access/allow-online"),
            GrantClientAccess { user_id, .. } => user(user_id, "client-access/add"),
            RevokeClientAccess { user_id, filter_id } => {
                user(user_id, &format!("client-access/{filter_id}/remove"))
            }
            ChatPermissions { user_id, .. } => user(user_id, "chat-permissions"),
            ChatIdentifier { user_id, .. } => user(user_id, "chat-identifier"),
            Permissions { user_id, .. } => user(user_id, "permissions"),
            ForceLogout(id) => user(id, "force-off"),
            Activate(id) => user(id, "activate"),
            Deactivate(id) => user(id, "deactivate"),
            Delete { user_id, .. } => user(user_id, "delete"),
            ResetPassword { user_id, .. } => user(user_id, "reset-password"),
        }
    }

    /// Question to ask before posting, for the destructive ones.
    pub fn confirmation(&self) -> Option<&'static str> {
        match self {
            AdminAction::RevokeClientAccess { .. } => Some(REMOVE_AVP_CONFIRM),
            AdminAction::Delete { deactivated: true, .. } => Some(DELETE_DEACTIVATED_CONFIRM),
            AdminAction::Delete { .. } => Some(DELETE_USER_CONFIRM),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            AdminAction::UpdateAccessWindow { window, .. } => window.validate(),
            AdminAction::ResetPassword {
                password,
                confirmation,
                ..
            } => validate_password_reset(password, confirmation),
            AdminAction::GrantClientAccess { custom_cpf, .. } => match non_blank(custom_cpf) {
                Some(cpf) if digits_only(cpf).len() != 11 => Err(Error::Validation(
                    "CPF do AVP deve conter 11 dígitos.".into(),
                )),
                _ => Ok(()),
            },
            AdminAction::LookupIdentity { query, .. } if query.trim().is_empty() => Err(
                Error::Validation("Informe um nome, CPF ou e-mail para buscar.".into()),
            ),
            _ => Ok(()),
        }
    }

    pub fn fields(&self) -> FormData {
        use AdminAction::*;
        let mut form = FormData::new();
        match self {
            ApproveRequest { reason, .. } | DenyRequest { reason, .. } => {
                form.push_text("reason", non_blank(reason).unwrap_or_default());
            }
            DevicePolicy {
                require_known_device,
                ..
            } => form.push_text("require_known_device", flag(*require_known_device)),
            UpdateAccessWindow { window, .. } => {
                if window.require_known_device {
                    form.push_text("require_known_device", "1");
                }
                if window.clear {
                    form.push_text("clear_window", "1");
                } else {
                    form.push_text("access_start", non_blank(&window.start).unwrap_or_default());
                    form.push_text("access_end", non_blank(&window.end).unwrap_or_default());
                }
            }
            LookupIdentity { query, .. } => form.push_text("lookup_query", query.trim()),
            LinkIdentity { client_id, .. } => form.push_text("client_id", client_id.to_string()),
            UpdateIdentity { cpf, .. } => form.push_text("cpf", digits_only(cpf)),
            AvpProfile {
                is_avp, label, cpf, ..
            } => {
                form.push_text("is_avp", flag(*is_avp));
                form.push_text("avp_identity_label", non_blank(label).unwrap_or_default());
                form.push_text(
                    "avp_identity_cpf",
                    non_blank(cpf).map(digits_only).unwrap_or_default(),
                );
            }
            ClientAccessScope { scope, .. } => form.push_text("scope", scope.as_str()),
            AllowOnlineClients { allow, .. } => form.push_text("allow_online_clients", flag(*allow)),
            GrantClientAccess {
                avp_labels,
                custom_label,
                custom_cpf,
                ..
            } => {
                let mut seen = Vec::new();
                for label in avp_labels.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
                    if seen.len() == MAX_AVP_LABELS {
                        break;
                    }
                    if !seen.contains(&label) {
                        seen.push(label);
                        form.push_text("avp_labels[]", label);
                    }
                }
                form.push_text("custom_avp_label", non_blank(custom_label).unwrap_or_default());
                form.push_text(
                    "custom_avp_cpf",
                    non_blank(custom_cpf).map(digits_only).unwrap_or_default(),
                );
            }
            ChatPermissions {
                allow_internal,
                allow_external,
                ..
            } => {
                form.push_text("allow_internal_chat", flag(*allow_internal));
                form.push_text("allow_external_chat", flag(*allow_external));
            }
            ChatIdentifier {
                identifier,
                display_name,
                ..
            } => match non_blank(identifier) {
                Some(id) => {
                    form.push_text("chat_identifier", id);
                    form.push_text("chat_display_name", non_blank(display_name).unwrap_or_default());
                }
                None => form.push_text("clear_identifier", "1"),
            },
            Permissions {
                role, permissions, ..
            } => {
                for key in apply_role_restrictions(permissions, *role) {
                    form.push_text("permissions[]", key);
                }
            }
            ResetPassword {
                password,
                confirmation,
                ..
            } => {
                form.push_text("password", password.as_str());
                form.push_text("password_confirmation", confirmation.as_str());
            }
            ApproveLogin(_) | DenyLogin(_) | SyncClientAccess(_) | RevokeClientAccess { .. }
            | ForceLogout(_) | Activate(_) | Deactivate(_) | Delete { .. } => {}
        }
        form
    }

    /// Validate and build the form, with the CSRF token attached.
    pub fn to_form_post(&self, base_prefix: &str, csrf_token: &str) -> Result<FormPost> {
        self.validate()?;
        let mut fields = self.fields();
        fields.set_text("_token", csrf_token);
        Ok(FormPost {
            path: format!("{}{}", base_prefix.trim_end_matches('/'), self.path()),
            fields,
        })
    }
}

// ---------------------------------------------------------------------------
// AdminApi
// ---------------------------------------------------------------------------

/// Posts admin actions. The server answers each with a redirect back to the
/// panel, so only the status matters.
pub struct AdminApi {
    client: ApiClient,
    base_prefix: String,
}

impl AdminApi {
    pub fn new(client: ApiClient, base_prefix: impl Into<String>) -> Self {
        AdminApi {
            client,
            base_prefix: base_prefix.into(),
        }
    }

    /// Returns `Ok(false)` when `confirm` declined a destructive action.
    pub async fn submit(&self, action: &AdminAction, confirm: impl FnOnce(&str) -> bool) -> Result<bool> {
        let post = action.to_form_post(&self.base_prefix, self.client.csrf_token())?;
        if let Some(question) = action.confirmation() {
            if !confirm(question) {
                log::debug!("Admin action {} declined", post.path);
                return Ok(false);
            }
        }
        log::info!("Admin action {}", post.path);
        self.client.post_form_raw(&post.path, post.fields).await?;
        Ok(true)
    }
}
