//! Core type definitions for the application

use std::time::Instant;

use super::track::Track;

/// Where the catalog load stands
#[derive(Clone, Debug, Default)]
pub enum CatalogState {
    #[default]
    Loading,
    Loaded(Vec<Track>),
    /// Fatal catalog error; list rendering stops
    Failed(String),
}

/// UI state for the application
#[derive(Clone, Debug, Default)]
pub struct UiState {
    pub search_query: String,
    /// Index into the filtered track list
    pub selected_index: usize,
    pub error_message: Option<String>,
    pub error_timestamp: Option<Instant>,
    pub show_help_popup: bool,
}
