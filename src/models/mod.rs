pub mod issue;
pub mod project;
pub mod user;
pub mod priority;
pub mod issue_type;
pub mod status;
pub mod search;
pub mod relations;
pub mod serde_helpers;

pub use issue::*;
pub use project::*;
pub use user::*;
pub use priority::*;
pub use issue_type::*;
pub use status::*;
pub use search::*;
pub use relations::*;
pub use serde_helpers::{format_jira_datetime, parse_jira_datetime};
