//! 비밀번호 해시 생성.

use anyhow::{bail, Result};
use rbac_service::auth::hash_password;

/// 평문 비밀번호의 argon2 PHC 문자열을 반환합니다.
pub fn run(secret: &str) -> Result<String> {
    if secret.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(hash_password(secret)?)
}
