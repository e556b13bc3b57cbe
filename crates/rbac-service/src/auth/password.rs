//! 비밀번호 해싱 및 검증.
//!
//! Argon2id, PHC 문자열 형식을 사용합니다. 평문과 해시는 로그나 에러
//! 메시지에 포함하지 않습니다.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("비밀번호 해싱 실패")]
    HashingFailed,
}

impl From<PasswordError> for rbac_core::RbacError {
    fn from(err: PasswordError) -> Self {
        rbac_core::RbacError::Internal(err.to_string())
    }
}

/// 존재하지 않는 사용자 로그인 시 검증에 쓰는 해시.
///
/// 알 수 없는 사용자도 한 번의 해시 검증 비용을 치르게 하여
/// 응답 시간으로 사용자 존재 여부가 드러나지 않도록 합니다.
static DUMMY_HASH: Lazy<String> = Lazy::new(|| {
    hash_password("rbac-timing-guard").unwrap_or_default()
});

/// 비밀번호를 해싱합니다. 솔트는 자동 생성됩니다.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| PasswordError::HashingFailed)?;

    Ok(hash.to_string())
}

/// 저장된 해시와 입력된 비밀번호를 비교합니다.
///
/// 형식이 잘못된 해시는 불일치로 취급합니다.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// 더미 해시로 검증을 수행합니다. 결과는 항상 버려집니다.
pub fn verify_against_dummy(password: &str) {
    let _ = verify_password(password, &DUMMY_HASH);
}
