//! Admin allowlist.
//!
//! Admins bypass every entitlement rule. The list is injected from
//! configuration; addresses are compared trimmed and lowercased.

use std::collections::HashSet;

use crate::domain::foundation::AuthenticatedUser;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowlist {
    emails: HashSet<String>,
}

impl AdminAllowlist {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|e| normalize(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails }
    }

    /// Parses a comma-separated list. Blank entries are ignored.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.emails.contains(&normalize(email))
    }

    pub fn is_admin(&self, user: &AuthenticatedUser) -> bool {
        self.is_admin_email(&user.email)
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
