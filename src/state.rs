/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - auth: login / refresh / logout
 *   - validator: authentication filter が使う token 検証
 *   - bearer: header 名と prefix (設定値)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - request ごとの状態 (SecurityContext) はここに置かない
 */
use std::sync::Arc;

use axum::http::HeaderName;

use crate::services::auth::{AuthComponents, TokenService, TokenValidator};

#[derive(Clone, Debug)]
pub struct BearerConfig {
    pub header_name: HeaderName,
    pub prefix: String,
}

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<TokenService>,
    pub validator: Arc<TokenValidator>,
    pub bearer: BearerConfig,
}

impl AppState {
    pub fn new(components: AuthComponents, bearer: BearerConfig) -> Self {
        Self {
            auth: components.service,
            validator: components.validator,
            bearer,
        }
    }
}
