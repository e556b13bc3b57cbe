//! 로그인, 토큰 갱신, 로그아웃, 토큰 인증.
//!
//! 로그인 경로: 자격 증명 검증 → 역할 선택 → 토큰 발급 → 세션 저장.
//! 선택된 역할은 사용자에 저장되지 않고 발급된 토큰과 세션에만 남습니다.

use std::sync::Arc;

use chrono::Utc;
use rbac_core::{
    select_role, MembershipWithRole, NewSession, RbacError, RbacResult, Resource, ResolvedRole,
    User, UserSummary,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::directory::{DirectoryService, NewUser};
use crate::auth::{verify_against_dummy, verify_password, TokenIssuer, TokenKind};
use crate::store::{MembershipStore, RbacStore, RoleStore, SessionStore, UserStore};

/// 로그인 요청.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// 사용자 이름 또는 이메일
    pub username_or_email: String,
    pub password: String,
    /// 명시적으로 선택한 역할 (없으면 기본 역할)
    #[serde(default)]
    pub role_id: Option<Uuid>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl LoginRequest {
    /// 자격 증명만으로 요청을 생성합니다.
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
            role_id: None,
            ip_address: None,
            user_agent: None,
        }
    }

    /// 역할을 명시합니다.
    pub fn with_role(mut self, role_id: Uuid) -> Self {
        self.role_id = Some(role_id);
        self
    }
}

/// 로그인 응답.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

/// 토큰 갱신 응답.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// 회원 가입 요청.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Access Token으로 인증된 요청 주체.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role_id: Uuid,
    pub role_code: String,
}

/// 사용자 프로필과 역할 할당.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user: User,
    pub roles: Vec<MembershipWithRole>,
}

/// 인증 서비스.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn RbacStore>,
    issuer: Arc<TokenIssuer>,
    directory: DirectoryService,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn RbacStore>,
        issuer: Arc<TokenIssuer>,
        directory: DirectoryService,
    ) -> Self {
        Self {
            store,
            issuer,
            directory,
        }
    }

    /// 자격 증명을 확인하고 역할을 선택해 토큰 쌍과 세션을 발급합니다.
    ///
    /// 알 수 없는 사용자, 잘못된 비밀번호, 비활성 사용자는 모두
    /// `InvalidCredentials`로 구분 없이 거부합니다.
    #[instrument(skip(self, request), fields(role_id = ?request.role_id))]
    pub async fn login(&self, request: LoginRequest) -> RbacResult<LoginResponse> {
        let user = self.verify_credentials(&request).await?;

        let memberships = self.store.list_for_user(user.id).await?;
        let role = select_role(&memberships, request.role_id).map_err(|e| {
            warn!(user_id = %user.id, kind = e.code(), "Login rejected");
            e
        })?;

        let pair = self.issuer.issue_pair(&user, &role)?;
        let expires_at = self.issuer.expires_at(TokenKind::Refresh, Utc::now())?;
        let session = self
            .store
            .create_session(NewSession {
                user_id: user.id,
                role_id: role.role_id,
                access_token: pair.access_token.clone(),
                refresh_token: pair.refresh_token.clone(),
                ip_address: request.ip_address,
                user_agent: request.user_agent,
                expires_at,
            })
            .await?;

        info!(
            user_id = %user.id,
            role_code = %role.role_code,
            session_id = %session.id,
            "Login succeeded"
        );

        Ok(LoginResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: summary(&user, &role),
        })
    }

    async fn verify_credentials(&self, request: &LoginRequest) -> RbacResult<User> {
        let Some(user) = self
            .store
            .find_user_by_login(&request.username_or_email)
            .await?
        else {
            verify_against_dummy(&request.password);
            warn!(kind = "INVALID_CREDENTIALS", "Login rejected");
            return Err(RbacError::InvalidCredentials);
        };

        if !verify_password(&request.password, &user.password_hash) || !user.is_active {
            warn!(kind = "INVALID_CREDENTIALS", "Login rejected");
            return Err(RbacError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Refresh Token으로 새 Access Token을 발급합니다.
    ///
    /// 새 토큰은 현재 사용자/역할 정보로 만들어지고 세션의 Access Token을
    /// 교체합니다. Refresh Token과 세션 만료 시각은 바뀌지 않습니다.
    /// 이 경로의 모든 실패는 `InvalidToken`입니다.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> RbacResult<RefreshResponse> {
        self.try_refresh(refresh_token).await.map_err(|e| {
            match &e {
                RbacError::Storage(_) | RbacError::Internal(_) => {
                    error!(error = %e, "Token refresh failed")
                }
                _ => warn!(kind = e.code(), "Token refresh rejected"),
            }
            RbacError::InvalidToken
        })
    }

    async fn try_refresh(&self, refresh_token: &str) -> RbacResult<RefreshResponse> {
        let claims = self.issuer.verify(TokenKind::Refresh, refresh_token)?;
        let user_id = claims.user_id()?;

        let session = self
            .store
            .find_active_by_refresh_token(refresh_token, user_id, Utc::now())
            .await?
            .ok_or(RbacError::InvalidToken)?;

        let user = self
            .store
            .find_user(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(RbacError::InvalidToken)?;
        let role = self
            .store
            .find_role(session.role_id)
            .await?
            .filter(|r| r.is_active)
            .ok_or(RbacError::InvalidToken)?;

        let access_token =
            self.issuer
                .issue(TokenKind::Access, &user, &ResolvedRole::from(&role))?;
        // 조회 이후 로그아웃으로 세션이 사라졌으면 거부
        let replaced = self
            .store
            .replace_access_token(session.id, &access_token)
            .await?;
        if replaced == 0 {
            return Err(RbacError::InvalidToken);
        }

        info!(user_id = %user_id, session_id = %session.id, "Access token refreshed");
        Ok(RefreshResponse { access_token })
    }

    /// 세션을 삭제합니다. 일치하는 세션이 없어도 성공합니다.
    #[instrument(skip(self, access_token))]
    pub async fn logout(&self, user_id: Uuid, access_token: &str) -> RbacResult<()> {
        let removed = self
            .store
            .delete_by_user_and_token(user_id, access_token)
            .await?;

        info!(removed, "Logged out");
        Ok(())
    }

    /// Access Token을 검증하고 요청 주체를 반환합니다.
    pub fn authenticate(&self, access_token: &str) -> RbacResult<CurrentUser> {
        let claims = self.issuer.verify(TokenKind::Access, access_token)?;
        if claims.sub.is_empty() {
            return Err(RbacError::InvalidToken);
        }

        Ok(CurrentUser {
            user_id: claims.user_id()?,
            username: claims.username,
            email: claims.email,
            role_id: claims.role_id,
            role_code: claims.role_code,
        })
    }

    /// 활성 사용자를 역할 없이 생성합니다. 역할이 할당되기 전까지는
    /// 로그인 시 `NoRoleAssigned`로 거부됩니다.
    pub async fn register(&self, request: RegisterRequest) -> RbacResult<User> {
        self.directory
            .create_user(NewUser {
                username: request.username,
                email: request.email,
                password: request.password,
                full_name: request.full_name,
            })
            .await
    }

    /// 사용자 프로필과 역할 할당 목록.
    pub async fn profile(&self, user_id: Uuid) -> RbacResult<UserProfile> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| RbacError::not_found(Resource::User, user_id))?;
        let roles = self.store.list_for_user(user_id).await?;

        Ok(UserProfile { user, roles })
    }
}

fn summary(user: &User, role: &ResolvedRole) -> UserSummary {
    UserSummary {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        role_id: role.role_id,
        role_name: role.role_name.clone(),
        role_code: role.role_code.clone(),
    }
}
