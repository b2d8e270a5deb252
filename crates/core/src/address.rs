//! Cheap, dependency-free address helpers shared by the backends.
//!
//! These checks gate obviously malformed input before a network call; they
//! are not a deliverability guarantee and deliberately accept anything a
//! provider might accept.

/// Syntactic sanity check for an email address: exactly one `@`, a
/// non-empty local part, a dotted domain, and no whitespace.
pub fn is_valid_address(address: &str) -> bool {
    if address.is_empty() || address.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty()
}

/// Format a mailbox as `Name <addr>`, or the bare address when no display
/// name is present.
pub fn format_mailbox(name: Option<&str>, email: &str) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("{name} <{email}>"),
        _ => email.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(is_valid_address("alice@example.com"));
        assert!(is_valid_address("a.b+tag@mail.example.co.uk"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("no-at-sign"));
        assert!(!is_valid_address("@example.com"));
        assert!(!is_valid_address("a@b@example.com"));
        assert!(!is_valid_address("alice@nodot"));
        assert!(!is_valid_address("alice@.com"));
        assert!(!is_valid_address("alice@example."));
        assert!(!is_valid_address("alice @example.com"));
    }

    #[test]
    fn formats_mailboxes() {
        assert_eq!(
            format_mailbox(Some("Alice"), "alice@example.com"),
            "Alice <alice@example.com>"
        );
        assert_eq!(format_mailbox(None, "alice@example.com"), "alice@example.com");
        assert_eq!(format_mailbox(Some(""), "alice@example.com"), "alice@example.com");
    }
}
