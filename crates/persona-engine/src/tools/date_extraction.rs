use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use persona_core::completion::CompletionRequest;
use persona_core::messages::Message;
use persona_core::tools::{Tool, ToolContext, ToolError, ToolResult};

use crate::prompts;

/// What the extraction model is asked to produce.
#[derive(Debug, Deserialize)]
struct ExtractedDates {
    date_reference_present: bool,
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Extracts date references from a user query through a nested completion
/// call. Unparseable date fields resolve to null; a failed call resolves to
/// a no-dates answer. Neither is an error for the turn.
pub struct DateExtractionTool;

#[async_trait]
impl Tool for DateExtractionTool {
    fn name(&self) -> &str {
        "handle_date_question"
    }

    fn description(&self) -> &str {
        "Handles date-related questions asked by the user. Tries to extract and confirm dates \
         mentioned in the user query and returns whether a date reference is present, today's \
         date, and the extracted start and end dates when applicable. \
         Examples: \"What is today's date?\", \"What was last week's Friday date?\", \
         \"25-02-2024, what day was it?\", \"What is the range date Last March month second week?\""
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["user_query"],
            "properties": {
                "user_query": {
                    "type": "string",
                    "description": "The question or query input by the user, which may contain date references"
                }
            }
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let user_query = args["user_query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("user_query is required".into()))?;

        let today = Local::now().format("%A, %Y-%m-%d").to_string();
        let prompt = prompts::date_extraction_prompt(&today, user_query);
        let request =
            CompletionRequest::new("", vec![Message::user_text(prompt)]).with_temperature(0.0);

        let payload = match self.extract(ctx, &request).await {
            Ok(dates) => {
                info!(
                    present = dates.date_reference_present,
                    start = ?dates.start_date,
                    end = ?dates.end_date,
                    "extracted date references"
                );
                json!({
                    "date_reference_present": dates.date_reference_present,
                    "today": today,
                    "start_date": parse_date_or_none(dates.start_date.as_deref()),
                    "end_date": parse_date_or_none(dates.end_date.as_deref()),
                })
            }
            Err(e) => {
                error!(error = %e, "date extraction failed");
                json!({
                    "date_reference_present": false,
                    "today": today,
                    "start_date": null,
                    "end_date": null,
                })
            }
        };

        Ok(ToolResult::text(payload.to_string()))
    }
}

impl DateExtractionTool {
    async fn extract(
        &self,
        ctx: &ToolContext,
        request: &CompletionRequest,
    ) -> Result<ExtractedDates, String> {
        let response = ctx
            .completion
            .complete(request)
            .await
            .map_err(|e| e.to_string())?;
        let raw = strip_code_fences(&response.content);
        serde_json::from_str(raw).map_err(|e| format!("unparseable extraction result: {e}"))
    }
}

/// Reformat an extracted `YYYY-MM-DD` date as `MM-DD-YYYY`, or null it out
/// if it does not parse.
fn parse_date_or_none(date_string: Option<&str>) -> Option<String> {
    let raw = date_string?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date.format("%m-%d-%Y").to_string()),
        Err(e) => {
            error!(date = raw, error = %e, "error parsing extracted date");
            None
        }
    }
}

/// Models wrap JSON answers in markdown fences more often than not.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("```json").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("```").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}
