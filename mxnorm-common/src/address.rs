//! Best-effort extraction of a bare `local@domain` from free-form input.
//!
//! Accepts anything a `From:` or `To:` header might carry, e.g.
//! `"Real Name" <local@domain>`, a bare `local@domain`, or an RFC 5322 group
//! (`team: a@example.com, b@example.com;`, first member wins). Input that
//! `mailparse` rejects is passed through with surrounding whitespace and angle
//! brackets removed, so the caller always gets a [`Mailbox`] back.

use std::fmt;

use mailparse::{MailAddr, SingleInfo};
use serde::{Deserialize, Serialize};

/// A lower-cased mailbox split into its local and domain parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mailbox {
    /// The local part (before @)
    pub local_part: String,
    /// The domain (after @). Empty when the input carried no `@` at all.
    pub domain: String,
}

impl Mailbox {
    /// Returns `true` if a domain part was found.
    #[must_use]
    pub fn has_domain(&self) -> bool {
        !self.domain.is_empty()
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_domain() {
            write!(f, "{}@{}", self.local_part, self.domain)
        } else {
            f.write_str(&self.local_part)
        }
    }
}

impl From<&str> for Mailbox {
    /// Splits at the last `@` and lower-cases both halves.
    fn from(addr: &str) -> Self {
        let addr = addr.to_lowercase();
        match addr.rsplit_once('@') {
            Some((local, domain)) => Self {
                local_part: local.to_string(),
                domain: domain.to_string(),
            },
            None => Self {
                local_part: addr,
                domain: String::new(),
            },
        }
    }
}

/// Extract the first mailbox found in `raw`.
///
/// Never fails: unparseable input degrades to the trimmed raw text.
#[must_use]
pub fn parse_address(raw: &str) -> Mailbox {
    Mailbox::from(extract_address(raw).as_str())
}

/// The lower-cased bare address in `raw`, exactly as written apart from case.
///
/// Unlike [`parse_address`] this keeps a dangling `@`, so `Foo@` stays `foo@`.
#[must_use]
pub fn extract_address(raw: &str) -> String {
    mailparse::addrparse(raw)
        .ok()
        .and_then(|list| list.iter().find_map(first_single).map(|info| info.addr))
        .filter(|addr| !addr.is_empty())
        .unwrap_or_else(|| strip_brackets(raw).to_string())
        .to_lowercase()
}

fn first_single(addr: &MailAddr) -> Option<SingleInfo> {
    match addr {
        MailAddr::Single(info) => Some(info.clone()),
        MailAddr::Group(group) => group.addrs.first().cloned(),
    }
}

fn strip_brackets(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find('<'), trimmed.rfind('>')) {
        (Some(start), Some(end)) if start < end => trimmed[start + 1..end].trim(),
        _ => trimmed,
    }
}
