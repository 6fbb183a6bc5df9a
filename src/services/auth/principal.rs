use std::collections::BTreeSet;

use serde::Serialize;

/// An authenticated identity: a username and the role names granted to it.
///
/// Authorities are kept in an ordered set so that the comma-joined form
/// written into tokens is stable. Authority names must not contain `,`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub username: String,
    pub authorities: BTreeSet<String>,
}

impl Principal {
    pub fn new<I, S>(username: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            authorities: authorities.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    pub(crate) fn joined_authorities(&self) -> String {
        self.authorities
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub(crate) fn split_authorities(joined: &str) -> BTreeSet<String> {
        joined
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorities_are_deduplicated_and_joined_in_order() {
        let p = Principal::new("t_admin", ["ROLE_USER", "ROLE_ADMIN", "ROLE_USER"]);

        assert_eq!(p.authorities.len(), 2);
        assert_eq!(p.joined_authorities(), "ROLE_ADMIN,ROLE_USER");
    }

    #[test]
    fn split_ignores_empty_entries() {
        assert!(Principal::split_authorities("").is_empty());

        let set = Principal::split_authorities("ROLE_ADMIN,,ROLE_USER");
        assert_eq!(set.len(), 2);
        assert!(set.contains("ROLE_ADMIN"));
    }

    #[test]
    fn split_keeps_surrounding_spaces() {
        let p = Principal::new("u", ["ROLE_A ", " ROLE_B"]);

        assert_eq!(
            Principal::split_authorities(&p.joined_authorities()),
            p.authorities
        );
    }
}
