//! 로그인 세션.
//!
//! 세션은 로그인 시 생성되고, 토큰 갱신 시 Access Token만 교체되며,
//! 로그아웃 시 삭제됩니다. 만료된 세션은 즉시 지우지 않고 조회에서만 제외합니다.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// (사용자, 역할) 쌍에 발급된 세션.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// 절대 만료 시각
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// 주어진 시각에 세션이 유효한지 확인합니다.
    ///
    /// `now == expires_at`이면 만료된 것으로 봅니다.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("role_id", &self.role_id)
            .field("ip_address", &self.ip_address)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// 세션 생성 입력.
#[derive(Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl NewSession {
    /// 저장될 세션 레코드로 변환합니다.
    pub fn into_session(self) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            role_id: self.role_id,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            expires_at: self.expires_at,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: DateTime<Utc>) -> Session {
        NewSession {
            user_id: Uuid::new_v4(),
            role_id: Uuid::new_v4(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            ip_address: None,
            user_agent: None,
            expires_at,
        }
        .into_session()
    }

    #[test]
    fn test_expiry_boundary() {
        let expires_at = Utc::now() + Duration::hours(1);
        let s = session(expires_at);

        assert!(s.is_active_at(expires_at - Duration::seconds(1)));
        assert!(!s.is_active_at(expires_at));
        assert!(!s.is_active_at(expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_debug_hides_tokens() {
        let s = session(Utc::now());
        let debug = format!("{:?}", s);
        assert!(!debug.contains("access"));
        assert!(!debug.contains("refresh"));
    }
}
