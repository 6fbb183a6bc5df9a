/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: authentication filter (bearer -> SecurityContext)
 * - http: request id / trace / body limit / timeout
 */
pub mod auth;
pub mod http;
