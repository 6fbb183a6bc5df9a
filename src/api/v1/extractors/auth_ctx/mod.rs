/*!
 * Security context extractors
 *
 * Responsibility:
 * - filter が request extensions に入れた SecurityContext を handler に渡す
 * - 認証必須の handler には Authenticated (無ければ 401)
 *
 * Public API:
 * - CurrentContext
 * - Authenticated
 */

mod core;

pub use core::{Authenticated, CurrentContext};
