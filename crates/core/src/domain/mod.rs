pub mod activity;
pub mod contact;
pub mod deal;
pub mod extraction;
pub mod interaction;

/// Collapses blank strings to `None` so absent and empty mean the same thing.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}
