//! Sales module: invoices owned by the user who created them.

use super::business;
use crate::api::SuccessResponse;
use crate::authz::{Owned, PolicyBuilder, Requirement, RoleGuard};
use crate::domain::{NavigationItem, PermissionDescriptor, UiContext, UserId};
use crate::error::{AppError, Result};
use crate::middleware::TenantScope;
use crate::module::{ModuleDescriptor, Pipeline, ServiceCollection};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub const MODULE_ID: &str = "sales";
pub const INVOICES_READ: &str = "sales:invoices:read";
pub const INVOICES_WRITE: &str = "sales:invoices:write";
pub const INVOICES_DELETE: &str = "sales:invoices:delete";
pub const INVOICES_MANAGE: &str = "sales:invoices:manage";
/// Creators may act on their own invoices; managers and accountants on any.
pub const INVOICE_OWNER_POLICY: &str = "sales.invoice-owner";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub business_id: String,
    pub number: String,
    pub amount_cents: i64,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Owned for Invoice {
    fn owner_id(&self) -> Option<&UserId> {
        Some(&self.created_by)
    }
}

pub trait InvoiceStore: Send + Sync {
    fn find(&self, business_id: &str, invoice_id: &str) -> Option<Invoice>;
    fn remove(&self, business_id: &str, invoice_id: &str) -> Option<Invoice>;
}

/// Process-local store keyed by (business, invoice)
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    invoices: RwLock<HashMap<(String, String), Invoice>>,
}

impl InMemoryInvoiceStore {
    pub fn insert(&self, invoice: Invoice) {
        self.invoices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((invoice.business_id.clone(), invoice.id.clone()), invoice);
    }
}

impl InvoiceStore for InMemoryInvoiceStore {
    fn find(&self, business_id: &str, invoice_id: &str) -> Option<Invoice> {
        self.invoices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(business_id.to_string(), invoice_id.to_string()))
            .cloned()
    }

    fn remove(&self, business_id: &str, invoice_id: &str) -> Option<Invoice> {
        self.invoices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(business_id.to_string(), invoice_id.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct SalesModule {
    store: Arc<InMemoryInvoiceStore>,
}

impl SalesModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_invoices(invoices: impl IntoIterator<Item = Invoice>) -> Self {
        let module = Self::default();
        for invoice in invoices {
            module.store.insert(invoice);
        }
        module
    }
}

impl ModuleDescriptor for SalesModule {
    fn id(&self) -> &str {
        MODULE_ID
    }

    fn display_name(&self) -> &str {
        "Sales"
    }

    fn dependencies(&self) -> Vec<String> {
        vec![business::MODULE_ID.to_string()]
    }

    fn register_services(&self, services: &mut ServiceCollection) -> anyhow::Result<()> {
        let store: Arc<dyn InvoiceStore> = self.store.clone();
        services.add(store)?;
        Ok(())
    }

    fn configure_pipeline(&self, pipeline: &mut Pipeline) -> anyhow::Result<()> {
        pipeline.merge_tenant_scoped(
            "sales-invoices",
            Router::new().route(
                "/api/v1/businesses/{business_id}/invoices/{invoice_id}",
                get(get_invoice).delete(delete_invoice),
            ),
        );
        Ok(())
    }

    fn configure_authorization(&self, policies: &mut PolicyBuilder) -> anyhow::Result<()> {
        policies
            .ownership(INVOICE_OWNER_POLICY, [INVOICES_MANAGE])
            .guard(INVOICE_OWNER_POLICY, Arc::new(RoleGuard::new("accountant")));
        Ok(())
    }

    fn permissions(&self) -> Vec<PermissionDescriptor> {
        vec![
            PermissionDescriptor::new(INVOICES_READ, "View invoices", MODULE_ID)
                .default_roles(["admin", "member", "accountant"]),
            PermissionDescriptor::new(INVOICES_WRITE, "Create and edit invoices", MODULE_ID)
                .default_roles(["admin", "member"]),
            PermissionDescriptor::new(INVOICES_DELETE, "Delete invoices", MODULE_ID)
                .default_roles(["admin"])
                .sensitive(),
            PermissionDescriptor::new(INVOICES_MANAGE, "Manage invoices of other users", MODULE_ID)
                .default_roles(["admin"])
                .sensitive(),
        ]
    }

    fn navigation_items(&self) -> Vec<NavigationItem> {
        vec![
            NavigationItem::group("sales.root", "Sales", UiContext::Operation).order(20),
            NavigationItem::link("sales.invoices", "Invoices", "/sales/invoices", UiContext::Operation)
                .under("sales.root")
                .order(10)
                .requires(INVOICES_READ),
            NavigationItem::link(
                "sales.invoices.new",
                "New invoice",
                "/sales/invoices/new",
                UiContext::Operation,
            )
            .under("sales.root")
            .order(20)
            .requires(INVOICES_READ)
            .requires(INVOICES_WRITE),
        ]
    }
}

fn load_invoice(state: &AppState, business_id: &str, invoice_id: &str) -> Result<Invoice> {
    let store = state
        .host
        .current()
        .services
        .require::<Arc<dyn InvoiceStore>>()?;
    store
        .find(business_id, invoice_id)
        .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", invoice_id)))
}

/// Permission check, before anything is looked up. The tenant boundary
/// already ran in `TenantScope`.
fn require_permission(state: &AppState, scope: &TenantScope, permission: &str) -> Result<()> {
    state
        .host
        .current()
        .engine
        .authorize(&scope.credential, Requirement::Permission(permission), None)
        .into_result()
}

fn require_invoice_owner(state: &AppState, scope: &TenantScope, invoice: &Invoice) -> Result<()> {
    state
        .host
        .current()
        .engine
        .authorize(
            &scope.credential,
            Requirement::Ownership {
                policy: INVOICE_OWNER_POLICY,
                resource: invoice,
            },
            None,
        )
        .into_result()
}

/// GET /api/v1/businesses/{business_id}/invoices/{invoice_id}
async fn get_invoice(
    State(state): State<AppState>,
    scope: TenantScope,
    Path((_, invoice_id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse<Invoice>>> {
    require_permission(&state, &scope, INVOICES_READ)?;
    let invoice = load_invoice(&state, &scope.tenant_id, &invoice_id)?;
    require_invoice_owner(&state, &scope, &invoice)?;
    Ok(Json(SuccessResponse::new(invoice)))
}

/// DELETE /api/v1/businesses/{business_id}/invoices/{invoice_id}
async fn delete_invoice(
    State(state): State<AppState>,
    scope: TenantScope,
    Path((_, invoice_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    require_permission(&state, &scope, INVOICES_DELETE)?;
    let invoice = load_invoice(&state, &scope.tenant_id, &invoice_id)?;
    require_invoice_owner(&state, &scope, &invoice)?;

    let store = state
        .host
        .current()
        .services
        .require::<Arc<dyn InvoiceStore>>()?;
    store.remove(&scope.tenant_id, &invoice_id);
    tracing::info!(
        user_id = ?scope.credential.user_id(),
        business_id = %scope.tenant_id,
        invoice_id = %invoice_id,
        "Invoice deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
