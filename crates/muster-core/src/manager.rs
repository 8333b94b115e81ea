//! Composition root
//!
//! Wires named backend instances, the dispatch rule table, the business
//! layer, and access control into one manager. All configuration is
//! resolved at construction; per-request contexts are cheap
//! `ProtectedBackend` values bound to one authenticated caller.

use std::sync::Arc;

use muster_auth::model::AuthContext;
use muster_auth::protected::ProtectedBackend;
use muster_auth::provider::AuthenticationProvider;
use muster_auth::service::authentication::authenticate;
use muster_auth::service::permission::AccessControl;
use muster_auth::{AclEntry, AclRule, AclRuleKind};
use muster_backend::contract::{ConfigDataBackend, ExtendedBackend};
use muster_backend::dispatch::{DispatchRule, Dispatcher};
use muster_backend::options::BackendOptions;
use muster_common::MusterError;

use crate::extended::ExtendedConfigDataBackend;

/// Grant-everything table used when no ACL is configured
fn default_acl() -> Vec<AclEntry> {
    vec![AclEntry::new(".*", vec![AclRule::new(AclRuleKind::All)])]
}

/// The composed backend stack of one deployment
pub struct BackendManager {
    extended: Arc<ExtendedConfigDataBackend>,
    acl: Arc<AccessControl>,
    provider: Option<Arc<dyn AuthenticationProvider>>,
}

impl BackendManager {
    pub fn builder() -> BackendManagerBuilder {
        BackendManagerBuilder::default()
    }

    /// The unprotected business-layer backend
    pub fn backend(&self) -> Arc<dyn ExtendedBackend> {
        self.extended.clone()
    }

    /// Authenticate a caller and bind a request context to it
    pub async fn login(&self, identity: &str, secret: &str) -> anyhow::Result<ProtectedBackend> {
        let context = authenticate(
            &*self.extended,
            self.provider.as_deref(),
            identity,
            secret,
        )
        .await?;
        Ok(self.session(context))
    }

    /// A request context for an already-authenticated caller
    pub fn session(&self, context: AuthContext) -> ProtectedBackend {
        ProtectedBackend::new(self.extended.clone(), self.acl.clone(), context)
    }
}

/// Builder assembling the backend stack
#[derive(Default)]
pub struct BackendManagerBuilder {
    backends: Vec<(String, Arc<dyn ConfigDataBackend>)>,
    dispatch_rules: Vec<DispatchRule>,
    acl_entries: Option<Vec<AclEntry>>,
    provider: Option<Arc<dyn AuthenticationProvider>>,
    options: BackendOptions,
}

impl BackendManagerBuilder {
    /// Register a named, constructed backend instance
    pub fn backend(mut self, name: impl Into<String>, backend: Arc<dyn ConfigDataBackend>) -> Self {
        self.backends.push((name.into(), backend));
        self
    }

    pub fn dispatch_rules(mut self, rules: Vec<DispatchRule>) -> Self {
        self.dispatch_rules = rules;
        self
    }

    pub fn acl(mut self, entries: Vec<AclEntry>) -> Self {
        self.acl_entries = Some(entries);
        self
    }

    pub fn auth_provider(mut self, provider: Arc<dyn AuthenticationProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn options(mut self, options: BackendOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve the configuration; any inconsistency is fatal here
    pub fn build(mut self) -> anyhow::Result<BackendManager> {
        let inner: Arc<dyn ConfigDataBackend> = if self.dispatch_rules.is_empty() {
            match self.backends.len() {
                0 => {
                    return Err(
                        MusterError::Configuration("no backend configured".to_string()).into(),
                    );
                }
                1 => self.backends.remove(0).1,
                _ => {
                    return Err(MusterError::Configuration(
                        "multiple backends configured without dispatch rules".to_string(),
                    )
                    .into());
                }
            }
        } else {
            Arc::new(Dispatcher::new(&self.dispatch_rules, self.backends)?)
        };

        let extended = Arc::new(ExtendedConfigDataBackend::with_options(inner, self.options));
        let acl = Arc::new(AccessControl::new(
            &self.acl_entries.unwrap_or_else(default_acl),
        )?);

        Ok(BackendManager {
            extended,
            acl,
            provider: self.provider,
        })
    }
}
