//! Run configuration.
//!
//! Settings are loaded once from a JSON file, validated against an embedded
//! JSON Schema, and passed by reference into the pipeline, never read as
//! ambient global state.

pub mod loader;
pub mod schema;

pub use loader::{
    load_allow_list, load_allow_list_from_str, load_settings, load_settings_from_str,
};
pub use schema::Settings;
