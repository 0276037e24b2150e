/// Engagement Service Library
///
/// Computes derived, viewer-relative projections over the VidTide content
/// graph: channel profiles and dashboards, video detail views, comment
/// threads with like counts, subscription feeds, liked videos and watch
/// history. Also owns the engagement toggles (likes, subscriptions) and the
/// realtime notification point for newly created relations.
///
/// # Modules
///
/// - `domain`: entity and shared projection types
/// - `services`: business logic layer (one service per concern)
/// - `pagination`: page/limit windowing for aggregate result sets
/// - `sorting`: typed sort whitelists
/// - `storage`: object-storage collaborator seam
/// - `error`: error types and handling
/// - `config`: configuration management
pub mod config;
pub mod domain;
pub mod error;
pub mod pagination;
pub mod services;
pub mod sorting;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
