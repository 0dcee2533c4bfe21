//! Canned data shared by the relational database probes.

pub(super) const TABLE: &str = "test_users";
pub(super) const TEST_NAME: &str = "Test User";
pub(super) const TEST_EMAIL: &str = "test@example.com";
pub(super) const UPDATED_NAME: &str = "Updated User";

/// Report line for the row read back after the insert.
pub(super) fn describe_user(id: i32, name: &str, email: &str) -> String {
    format!("Selected user: id={id}, name={name}, email={email}")
}

/// Keeps the first line of a multi-line version banner.
pub(super) fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim_end()
}
