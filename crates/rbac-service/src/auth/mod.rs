//! 자격 증명 검증과 토큰 발급.
//!
//! # 구성 요소
//!
//! - [`hash_password`] / [`verify_password`]: Argon2 비밀번호 해싱
//! - [`TokenIssuer`]: Access/Refresh 토큰 발급 및 검증
//! - [`Claims`]: 토큰 페이로드 (사용자 + 세션 역할)

mod jwt;
mod password;

pub use jwt::{Claims, TokenError, TokenIssuer, TokenKind, TokenPair};
pub use password::{hash_password, verify_against_dummy, verify_password, PasswordError};
