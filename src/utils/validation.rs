use validator::ValidateEmail;

/// Trims and lowercases an address; `None` when it is not a plausible email.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    if email.validate_email() {
        Some(email)
    } else {
        None
    }
}

/// Keeps the first occurrence of every entry, preserving input order.
pub fn dedup_preserving_order<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
