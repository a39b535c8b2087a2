use std::collections::HashSet;

/// All dot-variations of an address that a mail provider ignoring dots
/// would deliver to the same inbox.
///
/// The input comes first, then one variation per step with dots after
/// each of the last `n` characters of the local part:
/// `abc@x.com` gives `abc@x.com`, `ab.c@x.com`, `a.b.c@x.com`.
/// Input without a local part or domain comes back alone.
pub fn email_variations(email: &str) -> Vec<String> {
    let mut variations = vec![email.to_string()];

    let Some((local, domain)) = split(email) else {
        return variations;
    };
    let chars: Vec<char> = local.chars().collect();
    let last = chars.len() - 1;

    for start in (0..last).rev() {
        let mut dotted = String::with_capacity(local.len() * 2 + domain.len() + 1);
        for (j, ch) in chars.iter().enumerate() {
            dotted.push(*ch);
            if j >= start && j < last {
                dotted.push('.');
            }
        }
        dotted.push('@');
        dotted.push_str(domain);
        variations.push(dotted);
    }

    variations
}

/// Collapses stored addresses to one entry per inbox.
///
/// Addresses match when they share a domain and their local parts are
/// equal once dots are removed. The dot-free form represents the group
/// when it is present, otherwise the first address seen. Groups keep the
/// order in which they first appear.
pub fn base_emails(emails: &[String]) -> Vec<String> {
    let mut bases = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for email in emails {
        let key = match split(email) {
            Some((local, domain)) => (local.replace('.', ""), domain.to_string()),
            None => (email.clone(), String::new()),
        };
        let undotted = format!("{}@{}", key.0, key.1);
        if !seen.insert(key) {
            continue;
        }
        if emails.contains(&undotted) {
            bases.push(undotted);
        } else {
            bases.push(email.clone());
        }
    }

    bases
}

fn split(email: &str) -> Option<(&str, &str)> {
    let (local, rest) = email.split_once('@')?;
    // Only the text up to a second '@' counts as the domain.
    let domain = rest.split('@').next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some((local, domain))
}
