use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;

use persona_core::tools::{Tool, ToolContext, ToolError, ToolResult};

use crate::profile::Profile;

/// Serves the static profile record. No external call; the only derived
/// field is tenure in months.
pub struct ProfileLookupTool {
    profile: Arc<Profile>,
}

impl ProfileLookupTool {
    pub fn new(profile: Arc<Profile>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl Tool for ProfileLookupTool {
    fn name(&self) -> &str {
        "collect_personal_data"
    }

    fn description(&self) -> &str {
        "Returns the detailed user profile data, including personal information, professional \
         summary, experience, project details, technical skills, education, and participation."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(
        &self,
        _args: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let payload = self.profile.to_payload(Local::now().date_naive());
        Ok(ToolResult::text(payload.to_string()))
    }
}
