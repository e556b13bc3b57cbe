//! JWT 토큰 발급 및 검증.
//!
//! Access Token과 Refresh Token은 같은 페이로드 구조를 쓰지만 서로 다른
//! 비밀 키와 만료 시간으로 서명됩니다 (HS256). 검증 실패 사유는
//! 구분하지 않고 모두 [`TokenError::InvalidToken`]으로 보고합니다.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rbac_core::{AuthConfig, RbacError, ResolvedRole, User};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject - 사용자 ID
    pub sub: String,
    /// 사용자 이름
    pub username: String,
    /// 이메일
    pub email: String,
    /// 세션에서 선택된 역할 ID
    pub role_id: Uuid,
    /// 세션에서 선택된 역할 코드
    pub role_code: String,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// JWT ID
    pub jti: String,
}

impl Claims {
    /// 사용자와 선택된 역할로 Claims를 생성합니다.
    ///
    /// 만료 시각이 표현 범위를 넘으면 [`TokenError::Lifetime`]을 반환합니다.
    pub fn new(user: &User, role: &ResolvedRole, ttl: Duration) -> Result<Self, TokenError> {
        let now = Utc::now();
        let exp = expires_after(now, ttl)?;
        Ok(Self {
            sub: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            role_id: role.role_id,
            role_code: role.role_code.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        })
    }

    /// Subject를 사용자 ID로 해석합니다.
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::InvalidToken)
    }
}

/// 토큰 종류. 종류마다 별도의 키와 만료 시간을 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Access Token + Refresh Token 페어.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access Token 만료 시간 (초)
    pub expires_in: i64,
    /// 토큰 타입 (항상 "Bearer")
    pub token_type: String,
}

/// 토큰 에러.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// 서명, 형식, 만료 중 어떤 검증이든 실패
    #[error("유효하지 않은 토큰")]
    InvalidToken,
    #[error("토큰 인코딩 실패: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    /// 설정된 수명으로 만료 시각을 계산할 수 없음
    #[error("토큰 수명이 허용 범위를 벗어났습니다")]
    Lifetime,
}

fn expires_after(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, TokenError> {
    if ttl <= Duration::zero() {
        return Err(TokenError::Lifetime);
    }
    now.checked_add_signed(ttl).ok_or(TokenError::Lifetime)
}

impl From<TokenError> for RbacError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => RbacError::InvalidToken,
            TokenError::Encoding(e) => RbacError::Internal(e.to_string()),
            TokenError::Lifetime => RbacError::Internal(TokenError::Lifetime.to_string()),
        }
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// 토큰 발급기.
pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl TokenIssuer {
    /// 인증 설정으로 발급기를 생성합니다.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            access: SigningKeys::new(config.access_secret.expose_secret(), config.access_ttl),
            refresh: SigningKeys::new(config.refresh_secret.expose_secret(), config.refresh_ttl),
            validation,
        }
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// 토큰 종류별 만료 시간.
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.keys(kind).ttl
    }

    /// `now`부터 토큰 종류별 수명이 지난 시각.
    pub fn expires_at(
        &self,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, TokenError> {
        expires_after(now, self.ttl(kind))
    }

    /// 주어진 Claims를 서명합니다.
    pub fn sign(&self, kind: TokenKind, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys(kind).encoding)
            .map_err(TokenError::from)
    }

    /// 사용자와 역할로 단일 토큰을 발급합니다.
    pub fn issue(
        &self,
        kind: TokenKind,
        user: &User,
        role: &ResolvedRole,
    ) -> Result<String, TokenError> {
        let claims = Claims::new(user, role, self.ttl(kind))?;
        self.sign(kind, &claims)
    }

    /// Access/Refresh 토큰 쌍을 발급합니다.
    pub fn issue_pair(&self, user: &User, role: &ResolvedRole) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(TokenKind::Access, user, role)?,
            refresh_token: self.issue(TokenKind::Refresh, user, role)?,
            expires_in: self.access.ttl.num_seconds(),
            token_type: "Bearer".to_string(),
        })
    }

    /// 토큰을 검증하고 Claims를 반환합니다.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbac_core::Role;

    const ACCESS_SECRET: &str = "test-access-secret-minimum-32-characters";
    const REFRESH_SECRET: &str = "test-refresh-secret-minimum-32-characters";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&AuthConfig::new(ACCESS_SECRET, REFRESH_SECRET))
    }

    fn subject() -> (User, ResolvedRole) {
        let user = User::new("staff", "staff@example.com", "hash", "Staff User");
        let role = ResolvedRole::from(&Role::new("Staff", "STAFF"));
        (user, role)
    }

    #[test]
    fn test_issue_and_verify_pair() {
        let issuer = issuer();
        let (user, role) = subject();

        let pair = issuer.issue_pair(&user, &role).unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 15 * 60);

        let access = issuer.verify(TokenKind::Access, &pair.access_token).unwrap();
        assert_eq!(access.user_id().unwrap(), user.id);
        assert_eq!(access.username, "staff");
        assert_eq!(access.email, "staff@example.com");
        assert_eq!(access.role_id, role.role_id);
        assert_eq!(access.role_code, "STAFF");

        let refresh = issuer.verify(TokenKind::Refresh, &pair.refresh_token).unwrap();
        assert_eq!(refresh.sub, access.sub);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_kinds_use_independent_secrets() {
        let issuer = issuer();
        let (user, role) = subject();
        let pair = issuer.issue_pair(&user, &role).unwrap();

        assert!(matches!(
            issuer.verify(TokenKind::Refresh, &pair.access_token),
            Err(TokenError::InvalidToken)
        ));
        assert!(matches!(
            issuer.verify(TokenKind::Access, &pair.refresh_token),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (user, role) = subject();
        let token = issuer().issue(TokenKind::Access, &user, &role).unwrap();

        let other = TokenIssuer::new(&AuthConfig::new(
            "another-access-secret-minimum-32-chars",
            REFRESH_SECRET,
        ));
        assert!(matches!(other.verify(TokenKind::Access, &token), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let issuer = issuer();
        let (user, role) = subject();
        let token = issuer.issue(TokenKind::Access, &user, &role).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let forged = Claims {
            role_code: "ADMIN".to_string(),
            ..issuer.verify(TokenKind::Access, &token).unwrap()
        };
        let forged_token = issuer.sign(TokenKind::Access, &forged).unwrap();
        parts[1] = forged_token.split('.').nth(1).unwrap().to_string();

        assert!(matches!(
            issuer.verify(TokenKind::Access, &parts.join(".")),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();
        let (user, role) = subject();
        let mut claims = Claims::new(&user, &role, Duration::minutes(15)).unwrap();
        claims.exp = Utc::now().timestamp() - 10;

        let token = issuer.sign(TokenKind::Access, &claims).unwrap();
        assert!(matches!(issuer.verify(TokenKind::Access, &token), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_garbage_token() {
        assert!(matches!(
            issuer().verify(TokenKind::Access, "invalid.token.here"),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn test_claims_are_camel_case() {
        let (user, role) = subject();
        let claims = Claims::new(&user, &role, Duration::minutes(1)).unwrap();
        let json = serde_json::to_value(claims).unwrap();
        assert!(json.get("roleId").is_some());
        assert_eq!(json["roleCode"], "STAFF");
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        // 검증을 거치지 않은 설정도 발급 시 패닉 없이 에러
        let config = AuthConfig::new(ACCESS_SECRET, REFRESH_SECRET)
            .with_refresh_ttl(Duration::days(100_000_000));
        let issuer = TokenIssuer::new(&config);
        let (user, role) = subject();

        assert!(matches!(
            issuer.issue(TokenKind::Refresh, &user, &role),
            Err(TokenError::Lifetime)
        ));
        assert!(matches!(issuer.issue_pair(&user, &role), Err(TokenError::Lifetime)));
        assert!(issuer.expires_at(TokenKind::Refresh, Utc::now()).is_err());
        assert!(issuer.issue(TokenKind::Access, &user, &role).is_ok());

        let zero = TokenIssuer::new(
            &AuthConfig::new(ACCESS_SECRET, REFRESH_SECRET).with_access_ttl(Duration::zero()),
        );
        assert!(matches!(
            zero.issue(TokenKind::Access, &user, &role),
            Err(TokenError::Lifetime)
        ));
    }
}
