//! Curricular unit extraction.
//!
//! One completion per subject document. The result is opaque context text
//! handed to table sections; it is never parsed.

use crate::pipeline::llm::{CompletionClient, Message};
use crate::pipeline::truncate_chars;
use crate::prompts::{facts_user_prompt, FACTS_SYSTEM_PROMPT, UNITS_UNAVAILABLE};
use tracing::{info, warn};

/// List the curricular units (`UC<n>: <name>`) of `subject`.
///
/// Never fails: when the completion cannot be obtained the fixed
/// [`UNITS_UNAVAILABLE`] text is returned and used as context instead.
pub async fn extract_curricular_units(
    client: &CompletionClient,
    subject: &str,
    max_chars: usize,
) -> String {
    info!("Extracting curricular units");
    let messages = [
        Message::system(FACTS_SYSTEM_PROMPT),
        Message::user(facts_user_prompt(truncate_chars(subject, max_chars))),
    ];

    match client.complete(&messages).await {
        Ok(units) => {
            info!("Curricular units extracted ({} lines)", units.lines().count());
            units
        }
        Err(e) => {
            warn!("Curricular unit extraction failed: {}", e);
            UNITS_UNAVAILABLE.to_string()
        }
    }
}
