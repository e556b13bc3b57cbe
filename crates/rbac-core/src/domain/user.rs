//! 사용자 엔티티.
//!
//! 사용자는 로그인 식별자(username/email)와 비밀번호 해시를 가지며,
//! 0개 이상의 역할 할당을 소유합니다. 삭제 대신 `is_active`를 내려
//! 비활성화합니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 관리 백엔드 사용자.
#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    /// 사용자 ID
    pub id: Uuid,
    /// 고유 사용자 이름
    pub username: String,
    /// 고유 이메일
    pub email: String,
    /// PHC 형식 비밀번호 해시 (직렬화하지 않음)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// 표시 이름
    pub full_name: String,
    /// 활성 상태 (false = 소프트 삭제)
    pub is_active: bool,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 마지막 수정 시각
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// 새 활성 사용자를 생성합니다.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            full_name: full_name.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// 사용자 이름 또는 이메일이 로그인 식별자와 일치하는지 확인합니다.
    pub fn matches_login(&self, username_or_email: &str) -> bool {
        self.username == username_or_email || self.email == username_or_email
    }

    /// 사용자를 비활성화합니다 (소프트 삭제).
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

// 해시가 로그에 남지 않도록 Debug를 직접 구현
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// 로그인 응답에 포함되는 사용자 요약.
///
/// 이번 세션에서 선택된 역할 정보를 함께 담습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role_id: Uuid,
    pub role_name: String,
    pub role_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_is_active() {
        let user = User::new("john", "john@example.com", "$argon2id$...", "John Doe");
        assert!(user.is_active);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_matches_login() {
        let user = User::new("john", "john@example.com", "hash", "John");
        assert!(user.matches_login("john"));
        assert!(user.matches_login("john@example.com"));
        assert!(!user.matches_login("JOHN"));
    }

    #[test]
    fn test_hash_never_leaks() {
        let user = User::new("john", "john@example.com", "secret-hash", "John");
        assert!(!format!("{:?}", user).contains("secret-hash"));
        assert!(!serde_json::to_string(&user).unwrap().contains("secret-hash"));
    }

    #[test]
    fn test_deactivate() {
        let mut user = User::new("john", "john@example.com", "hash", "John");
        user.deactivate();
        assert!(!user.is_active);
    }
}
