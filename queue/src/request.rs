use serde::{Deserialize, Serialize};
use texcompile_lib::Format;

/// The payload enqueued for one compilation job, matching `do_compile`'s
/// argument list (spec §4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub source_id: String,
    pub checksum: String,
    pub output_format: Format,
    pub stamp_label: Option<String>,
    pub stamp_link: Option<String>,
    pub token: String,
    pub owner: Option<String>,
}
