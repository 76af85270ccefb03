//! Known mailbox providers and the address rewrites they allow.
//!
//! A provider is detected from the exchange hostnames in a domain's MX
//! records, never from the address domain itself, so custom domains hosted
//! by a provider are normalized the same way as its consumer domains.

use std::{fmt, ops::BitOr};

use mxnorm_common::Mailbox;

/// Set of address rewrites a provider honors.
///
/// Rules compose with `|`. [`Rules::NONE`] marks a provider that is detected
/// but whose addresses must be left as they are.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rules(u8);

impl Rules {
    /// No rewriting.
    pub const NONE: Self = Self(0);
    /// Everything from the first `+` in the local part is ignored.
    pub const PLUS_ADDRESSING: Self = Self(1);
    /// Everything from the first `-` in the local part is ignored.
    pub const DASH_ADDRESSING: Self = Self(1 << 1);
    /// Periods in the local part are ignored.
    pub const STRIP_PERIODS: Self = Self(1 << 2);
    /// `any@user.example.com` delivers to `user@example.com`.
    pub const LOCAL_PART_AS_HOSTNAME: Self = Self(1 << 3);

    const NAMED: [(Self, &'static str); 4] = [
        (Self::PLUS_ADDRESSING, "PLUS_ADDRESSING"),
        (Self::DASH_ADDRESSING, "DASH_ADDRESSING"),
        (Self::STRIP_PERIODS, "STRIP_PERIODS"),
        (Self::LOCAL_PART_AS_HOSTNAME, "LOCAL_PART_AS_HOSTNAME"),
    ];

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if every rule in `other` is set. Never true for [`Rules::NONE`].
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Rules {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl fmt::Debug for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("NONE");
        }

        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(rule, _)| self.contains(*rule))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join(" | "))
    }
}

impl fmt::Display for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A mailbox provider recognized by its MX hostnames.
#[derive(Debug, PartialEq, Eq)]
pub struct Provider {
    pub name: &'static str,
    pub rules: Rules,
    /// Hostname suffixes of the provider's mail exchangers.
    pub mx_domains: &'static [&'static str],
}

impl Provider {
    /// Returns `true` if `host` ends with one of this provider's MX suffixes.
    #[must_use]
    pub fn serves(&self, host: &str) -> bool {
        self.mx_domains.iter().any(|suffix| host.ends_with(suffix))
    }

    /// Rewrites `mailbox` according to this provider's rules.
    ///
    /// `LOCAL_PART_AS_HOSTNAME` runs first since it replaces the local part
    /// the remaining rules operate on.
    #[must_use]
    pub fn apply(&self, mut mailbox: Mailbox) -> Mailbox {
        if self.rules.contains(Rules::LOCAL_PART_AS_HOSTNAME) {
            local_part_as_hostname(&mut mailbox);
        }
        if self.rules.contains(Rules::STRIP_PERIODS) {
            mailbox.local_part.retain(|c| c != '.');
        }
        if self.rules.contains(Rules::PLUS_ADDRESSING) {
            truncate_at(&mut mailbox.local_part, '+');
        }
        if self.rules.contains(Rules::DASH_ADDRESSING) {
            truncate_at(&mut mailbox.local_part, '-');
        }
        mailbox
    }
}

fn local_part_as_hostname(mailbox: &mut Mailbox) {
    if let Some((host, rest)) = mailbox.domain.split_once('.')
        && rest.contains('.')
    {
        let (host, rest) = (host.to_string(), rest.to_string());
        mailbox.local_part = host;
        mailbox.domain = rest;
    }
}

fn truncate_at(local_part: &mut String, separator: char) {
    if let Some(index) = local_part.find(separator) {
        local_part.truncate(index);
    }
}

/// Provider table, in match order.
pub static PROVIDERS: &[Provider] = &[
    Provider {
        name: "Apple",
        rules: Rules::PLUS_ADDRESSING,
        mx_domains: &["icloud.com"],
    },
    Provider {
        name: "Fastmail",
        rules: Rules::PLUS_ADDRESSING.union(Rules::LOCAL_PART_AS_HOSTNAME),
        mx_domains: &["messagingengine.com"],
    },
    Provider {
        name: "Google",
        rules: Rules::PLUS_ADDRESSING.union(Rules::STRIP_PERIODS),
        mx_domains: &["google.com", "googlemail.com"],
    },
    Provider {
        name: "Microsoft",
        rules: Rules::PLUS_ADDRESSING,
        mx_domains: &["outlook.com"],
    },
    Provider {
        name: "ProtonMail",
        rules: Rules::PLUS_ADDRESSING,
        mx_domains: &["protonmail.ch"],
    },
    Provider {
        name: "Rackspace",
        rules: Rules::PLUS_ADDRESSING,
        mx_domains: &["emailsrvr.com"],
    },
    // Yahoo's dash aliases are separate mailboxes, so nothing is rewritten.
    Provider {
        name: "Yahoo",
        rules: Rules::NONE,
        mx_domains: &["yahoodns.net"],
    },
    Provider {
        name: "Yandex",
        rules: Rules::PLUS_ADDRESSING,
        mx_domains: &["mx.yandex.net", "yandex.ru"],
    },
    Provider {
        name: "Zoho",
        rules: Rules::PLUS_ADDRESSING,
        mx_domains: &["zoho.com"],
    },
];

/// Finds the provider behind a list of MX hosts.
///
/// Hosts are tried in the order given (priority order for cached records);
/// for each host the table is scanned in order and the first provider serving
/// it wins. Later hosts are only consulted when earlier ones match nothing.
pub fn match_provider<I, S>(hosts: I) -> Option<&'static Provider>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    hosts.into_iter().find_map(|host| {
        PROVIDERS
            .iter()
            .find(|provider| provider.serves(host.as_ref()))
    })
}

/// Looks a provider up by name, ignoring case.
#[must_use]
pub fn by_name(name: &str) -> Option<&'static Provider> {
    PROVIDERS
        .iter()
        .find(|provider| provider.name.eq_ignore_ascii_case(name))
}
