/*
 * Responsibility
 * - username -> (password hash, role names) の解決 (UserDirectory)
 * - Postgres 実装 (t_user / t_role / t_user_role) と in-memory 実装
 * - ユーザーの CRUD はここでは扱わない
 */
use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoResult;
use crate::services::auth::principal::Principal;

/// Role names stored in the database are exposed with this prefix.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Credential-store view of a user.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub username: String,
    pub password_hash: String,
    pub authorities: BTreeSet<String>,
}

impl UserAccount {
    pub fn principal(&self) -> Principal {
        Principal {
            username: self.username.clone(),
            authorities: self.authorities.clone(),
        }
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<UserAccount>>;
}

#[derive(Clone, Debug)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRoleRow {
    username: String,
    password: String,
    role_name: Option<String>,
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<UserAccount>> {
        // One row per role; LEFT JOIN keeps users without roles.
        let rows = sqlx::query_as::<_, UserRoleRow>(
            r#"
            SELECT
                u.username,
                u.password,
                r.name AS role_name
            FROM t_user u
            LEFT JOIN t_user_role ur ON ur.user_id = u.id
            LEFT JOIN t_role r ON r.id = ur.role_id
            WHERE u.username = $1
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_rows(rows))
    }
}

fn fold_rows(rows: Vec<UserRoleRow>) -> Option<UserAccount> {
    let first = rows.first()?;
    let mut account = UserAccount {
        username: first.username.clone(),
        password_hash: first.password.clone(),
        authorities: BTreeSet::new(),
    };

    for row in rows {
        if let Some(name) = row.role_name {
            account.authorities.insert(format!("{ROLE_PREFIX}{name}"));
        }
    }

    Some(account)
}

/// Directory backed by a fixed map, built once at startup (or in tests).
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserDirectory {
    accounts: HashMap<String, UserAccount>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, account: UserAccount) -> Self {
        self.insert(account);
        self
    }

    pub fn insert(&mut self, account: UserAccount) {
        self.accounts.insert(account.username.clone(), account);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<UserAccount>> {
        Ok(self.accounts.get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: Option<&str>) -> UserRoleRow {
        UserRoleRow {
            username: "elio".into(),
            password: "$argon2id$stub".into(),
            role_name: role.map(str::to_owned),
        }
    }

    #[test]
    fn rows_fold_into_one_account_with_prefixed_roles() {
        let account = fold_rows(vec![row(Some("ADMIN")), row(Some("USER"))]).unwrap();

        assert_eq!(account.username, "elio");
        assert_eq!(
            account.authorities,
            BTreeSet::from(["ROLE_ADMIN".to_string(), "ROLE_USER".to_string()])
        );
    }

    #[test]
    fn user_without_roles_has_empty_authorities() {
        let account = fold_rows(vec![row(None)]).unwrap();
        assert!(account.authorities.is_empty());
    }

    #[test]
    fn no_rows_means_no_user() {
        assert!(fold_rows(Vec::new()).is_none());
    }

    #[tokio::test]
    async fn in_memory_lookup_is_exact() {
        let dir = InMemoryUserDirectory::new().with_account(UserAccount {
            username: "t_admin".into(),
            password_hash: "h".into(),
            authorities: BTreeSet::from(["ROLE_ADMIN".to_string()]),
        });

        let found = dir.find_by_username("t_admin").await.unwrap().unwrap();
        assert_eq!(found.principal(), Principal::new("t_admin", ["ROLE_ADMIN"]));
        assert!(dir.find_by_username("T_ADMIN").await.unwrap().is_none());
    }
}
