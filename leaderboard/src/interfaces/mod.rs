pub mod collaborators;
pub mod json_sources;
