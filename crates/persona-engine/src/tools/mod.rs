pub mod date_extraction;
pub mod open_world;
pub mod profile_lookup;

use std::sync::Arc;

use crate::profile::Profile;
use crate::registry::ToolRegistry;

/// Build the registry over the closed tool set.
pub fn create_default_registry(profile: Arc<Profile>, restrict_open_ended: bool) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(open_world::OpenWorldTool::new(restrict_open_ended)));
    registry.register(Arc::new(date_extraction::DateExtractionTool));
    registry.register(Arc::new(profile_lookup::ProfileLookupTool::new(profile)));
    registry
}
