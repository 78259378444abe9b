// src/models/rbac.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// O que sai do banco (Tabela Roles)
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

// O que sai do banco (Tabela Permissions)
// A chave segue o formato "recurso_acao", ex: "inventory_read".
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: i64,
    pub key: String,
}

// O que sai do banco (Tabela Modules)
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub required_permission_id: Option<i64>,
}

// O Payload para criar ou editar um cargo. Na edição a lista de permissões
// substitui integralmente a anterior (não é um diff incremental).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RolePayload {
    #[validate(length(min = 1, max = 20, message = "O nome deve ter entre 1 e 20 caracteres."))]
    pub name: String,

    #[validate(length(max = 60, message = "A descrição deve ter no máximo 60 caracteres."))]
    pub description: Option<String>,

    // Chaves das permissões, ex: ["sales_read", "sales_write"]
    pub permissions: Vec<String>,
}

// Resposta completa (Cargo + Lista de Permissões)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<String>,
}

/// O vocabulário fechado de capacidades do sistema. Cada variante corresponde
/// a uma linha semeada na tabela `permissions`; nenhum outro valor existe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionKey {
    UsersRead,
    UsersWrite,
    UsersUpdate,
    UsersDelete,
    InventoryRead,
    InventoryWrite,
    InventoryUpdate,
    InventoryDelete,
    SalesRead,
    SalesWrite,
    SalesUpdate,
    SalesDelete,
    SettingsRead,
    SettingsWrite,
    SettingsUpdate,
    SettingsDelete,
    // "reports" só existe pareado com "read"
    ReportsRead,
}

impl PermissionKey {
    pub const ALL: [PermissionKey; 17] = [
        PermissionKey::UsersRead,
        PermissionKey::UsersWrite,
        PermissionKey::UsersUpdate,
        PermissionKey::UsersDelete,
        PermissionKey::InventoryRead,
        PermissionKey::InventoryWrite,
        PermissionKey::InventoryUpdate,
        PermissionKey::InventoryDelete,
        PermissionKey::SalesRead,
        PermissionKey::SalesWrite,
        PermissionKey::SalesUpdate,
        PermissionKey::SalesDelete,
        PermissionKey::SettingsRead,
        PermissionKey::SettingsWrite,
        PermissionKey::SettingsUpdate,
        PermissionKey::SettingsDelete,
        PermissionKey::ReportsRead,
    ];

    pub fn as_key(&self) -> &'static str {
        match self {
            PermissionKey::UsersRead => "users_read",
            PermissionKey::UsersWrite => "users_write",
            PermissionKey::UsersUpdate => "users_update",
            PermissionKey::UsersDelete => "users_delete",
            PermissionKey::InventoryRead => "inventory_read",
            PermissionKey::InventoryWrite => "inventory_write",
            PermissionKey::InventoryUpdate => "inventory_update",
            PermissionKey::InventoryDelete => "inventory_delete",
            PermissionKey::SalesRead => "sales_read",
            PermissionKey::SalesWrite => "sales_write",
            PermissionKey::SalesUpdate => "sales_update",
            PermissionKey::SalesDelete => "sales_delete",
            PermissionKey::SettingsRead => "settings_read",
            PermissionKey::SettingsWrite => "settings_write",
            PermissionKey::SettingsUpdate => "settings_update",
            PermissionKey::SettingsDelete => "settings_delete",
            PermissionKey::ReportsRead => "reports_read",
        }
    }
}

/// Identificadores fechados dos módulos navegáveis. Substitui a tabela de
/// rotas por string da versão antiga: o compilador cobra exaustividade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleId {
    Home,
    Cashier,
    Inventory,
    Reports,
    Settings,
}

impl ModuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleId::Home => "home",
            ModuleId::Cashier => "cashier",
            ModuleId::Inventory => "inventory",
            ModuleId::Reports => "reports",
            ModuleId::Settings => "settings",
        }
    }

    pub fn from_name(name: &str) -> Option<ModuleId> {
        match name {
            "home" => Some(ModuleId::Home),
            "cashier" => Some(ModuleId::Cashier),
            "inventory" => Some(ModuleId::Inventory),
            "reports" => Some(ModuleId::Reports),
            "settings" => Some(ModuleId::Settings),
            _ => None,
        }
    }
}
