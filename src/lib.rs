//! firmscope: client-side coordination core for a company-directory SaaS.
//!
//! Search, filter, cursor-paginate, cache, and export a company registry
//! served by a remote GraphQL API, and mirror the subscription plan gating
//! paid features. The UI layer is an external collaborator: it drives the
//! [`controller::CompanyListController`] surface and subscribes to
//! [`events::EventBus`] for re-render triggers.

pub mod api;
pub mod cache;
pub mod companies;
pub mod config;
pub mod controller;
pub mod errors;
pub mod events;
pub mod export;
pub mod filters;
pub mod logger;
pub mod persistence;
pub mod query;
pub mod subscription;
