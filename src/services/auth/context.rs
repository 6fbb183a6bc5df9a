/*
 * Responsibility
 * - 1 リクエスト分の認証状態 (SecurityContext)
 * - middleware が request extensions に格納し、handler -> service へ &mut で渡す
 *
 * Notes
 * - process-global には置かない。request と一緒に drop されるので、
 *   並行リクエスト間で principal が漏れることはない
 */
use super::principal::Principal;

/// Request-scoped holder for at most one authenticated [`Principal`].
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    principal: Option<Principal>,
}

impl SecurityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// Install `principal` only if the context is still empty.
    ///
    /// Returns `true` when the principal was installed.
    pub fn install(&mut self, principal: Principal) -> bool {
        if self.principal.is_some() {
            return false;
        }
        self.principal = Some(principal);
        true
    }

    /// Replace whatever is installed (used by login).
    pub fn set(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    pub fn clear(&mut self) {
        self.principal = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_is_idempotent() {
        let mut ctx = SecurityContext::new();

        assert!(ctx.install(Principal::new("alice", ["ROLE_USER"])));
        assert!(!ctx.install(Principal::new("mallory", ["ROLE_ADMIN"])));
        assert_eq!(ctx.principal().map(|p| p.username.as_str()), Some("alice"));
    }

    #[test]
    fn clear_on_empty_context_is_a_no_op() {
        let mut ctx = SecurityContext::new();
        ctx.clear();
        ctx.clear();

        assert!(!ctx.is_authenticated());
    }
}
