// Invite allowlist: the name=token table behind the access gate.
//
// Parsed once at startup from INVITE_TOKENS (see config). Matching is exact
// string equality; every valid token grants identical access.

/// A single configured invite: a human-readable name and its shared token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteEntry {
    pub name: String,
    pub token: String,
}

/// The full allowlist parsed from `INVITE_TOKENS`.
///
/// An empty list fails closed: no token validates, so the gate routes all
/// traffic to the login page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InviteList {
    entries: Vec<InviteEntry>,
}

impl InviteList {
    /// Parse a `name=token,name=token,...` string.
    ///
    /// Entries are whitespace-trimmed; malformed entries (no `=`, or an empty
    /// name or token) are skipped rather than rejected, so one bad entry does
    /// not lock out the rest.
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .filter_map(|pair| {
                let (name, token) = pair.trim().split_once('=')?;
                let (name, token) = (name.trim(), token.trim());
                if name.is_empty() || token.is_empty() {
                    return None;
                }
                Some(InviteEntry {
                    name: name.to_string(),
                    token: token.to_string(),
                })
            })
            .collect();

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Exact-equality check used by both gate paths (URL token and cookie).
    pub fn contains_token(&self, token: &str) -> bool {
        self.entries.iter().any(|e| e.token == token)
    }

    /// Reverse lookup for audit records: token -> configured name.
    ///
    /// Unmatched tokens resolve to themselves, so audit entries for unknown
    /// or pre-revocation cookies still carry the raw value.
    pub fn resolve_name<'a>(&'a self, token_or_name: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|e| e.token == token_or_name)
            .map(|e| e.name.as_str())
            .unwrap_or(token_or_name)
    }
}
