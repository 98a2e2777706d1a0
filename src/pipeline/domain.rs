//! Sender address helpers.

use crate::error::MalformedSenderError;

/// Company identifier for a sender: everything after the first `@`.
///
/// The sender is taken as-is, so a display-name form such as
/// `"Acme <jobs@acme.com>"` keeps the trailing `>`.
pub fn extract_domain(sender: &str) -> Result<&str, MalformedSenderError> {
    match sender.split_once('@') {
        Some((_, domain)) if !domain.is_empty() => Ok(domain),
        _ => Err(MalformedSenderError {
            sender: sender.to_string(),
        }),
    }
}

/// Whether `sender` is the account's own address.
///
/// An empty `self_address` matches nothing.
pub fn is_self_address(sender: &str, self_address: &str) -> bool {
    let self_address = self_address.trim();
    !self_address.is_empty() && sender.trim().eq_ignore_ascii_case(self_address)
}
