//! Application-wide constants
//!
//! Tunable limits live in `app_config::LimitsConfig`. Values here are fixed.

/// Message posted to the requester when a super-staff member confirms a spam flag.
/// This is the only message the desk writes on its own.
pub const SPAM_CONFIRMED_NOTICE: &str = "Please make sure the content of your reports is valid and accurate. \
Thank you for your understanding and cooperation. If you disagree with this decision, please submit a new report.";

/// Entity type recorded in audit rows for ticket transitions.
pub const AUDIT_ENTITY_TICKET: &str = "TICKET";

/// Session key holding the authenticated user id.
/// Written by the external credential component.
pub const SESSION_USER_ID: &str = "user_id";

/// Lowest page number accepted by paginated listings.
pub const FIRST_PAGE: u64 = 1;
