//! The FinSight dashboard engine.
//!
//! Owns everything between the REST backend and the rendering layer: the
//! cascading filter-option resolver, the pure row derivation pipeline
//! feeding the grid and charts, the hierarchy fetch coordination per view
//! mode, the Ask-Nova context assembler, and the streaming chat session.

pub mod charts;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod derive;
pub mod grid;
pub mod kpi;
pub mod nova;
pub mod options;

pub use chat::ChatPhase;
pub use chat::ChatSession;
pub use chat::CompletionTransport;
pub use chat::QUICK_QUESTIONS;
pub use config::AssistantConfig;
pub use config::ConfigError;
pub use config::EngineConfig;
pub use dashboard::DashboardSession;
pub use dashboard::HierarchyFetcher;
pub use dashboard::HierarchyProvider;
pub use dashboard::ViewTab;
pub use derive::FilterScope;
pub use derive::SortDirection;
pub use derive::SortKey;
pub use derive::SortState;
pub use grid::Pager;
pub use grid::PAGE_SIZE;
pub use kpi::KpiMetrics;
pub use nova::NovaAssembler;
pub use options::OptionsProvider;
pub use options::OptionsResolver;
