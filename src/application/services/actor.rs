//! Request actor
//!
//! The authenticated caller of a use case, with the request metadata that
//! ends up in the audit log.

use crate::domain::Scope;

/// Authenticated caller of a service operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub tenant_id: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Actor {
    pub fn new(user_id: i64, tenant_id: i64) -> Self {
        Self {
            user_id,
            tenant_id,
            ip_address: None,
            user_agent: None,
        }
    }

    /// Attach request metadata for auditing
    pub fn with_request_info(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    /// Scope covering the whole tenant
    pub fn tenant_scope(&self) -> Scope {
        Scope::Tenant {
            tenant_id: self.tenant_id,
        }
    }

    /// Scope of a record owned by `owner_id`
    pub fn record_scope(&self, owner_id: i64) -> Scope {
        Scope::Record {
            tenant_id: self.tenant_id,
            owner_id,
        }
    }
}
