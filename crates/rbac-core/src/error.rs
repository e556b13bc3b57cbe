//! RBAC 시스템의 에러 타입.
//!
//! 인증, 역할 선택, 토큰, 메뉴 구조 변경, 권한 검사에서 발생하는
//! 모든 실패를 하나의 타입으로 분류합니다. 호출자(전송 계층)는
//! [`RbacError::code`]와 [`RbacError::http_status`]로 응답을 구성합니다.

use std::fmt;

use thiserror::Error;

/// 에러가 가리키는 리소스 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// 사용자
    User,
    /// 역할
    Role,
    /// 메뉴
    Menu,
    /// 역할-메뉴 권한 행
    Permission,
    /// 사용자-역할 할당
    Assignment,
    /// 로그인 세션
    Session,
}

impl Resource {
    /// 사람이 읽을 수 있는 리소스 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::User => "user",
            Resource::Role => "role",
            Resource::Menu => "menu",
            Resource::Permission => "permission",
            Resource::Assignment => "role assignment",
            Resource::Session => "session",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 핵심 RBAC 에러.
#[derive(Debug, Error)]
pub enum RbacError {
    /// 알 수 없는 사용자 또는 잘못된 비밀번호 (두 경우를 구분하지 않음)
    #[error("인증 정보가 올바르지 않습니다")]
    InvalidCredentials,

    /// 사용자에게 할당된 역할이 없음
    #[error("할당된 역할이 없습니다. 관리자에게 문의하세요")]
    NoRoleAssigned,

    /// 요청한 역할이 사용자에게 할당되지 않음
    #[error("선택한 역할이 올바르지 않습니다")]
    InvalidRoleSelection,

    /// 선택된 역할이 비활성 상태
    #[error("선택한 역할이 비활성 상태입니다")]
    RoleInactive,

    /// 토큰 서명/만료 검증 실패 또는 세션 없음
    #[error("유효하지 않은 토큰")]
    InvalidToken,

    /// 메뉴 코드 중복
    #[error("이미 존재하는 메뉴 코드: {0}")]
    DuplicateCode(String),

    /// 고유성 위반 (역할 이름/코드, 사용자 이름/이메일, 권한 행, 역할 할당)
    #[error("이미 존재하는 {0}")]
    AlreadyExists(Resource),

    /// 리소스를 찾을 수 없음
    #[error("{resource}을(를) 찾을 수 없음: {id}")]
    NotFound {
        /// 리소스 종류
        resource: Resource,
        /// 조회에 사용한 식별자
        id: String,
    },

    /// 부모 메뉴가 존재하지 않음
    #[error("부모 메뉴를 찾을 수 없습니다")]
    ParentNotFound,

    /// 메뉴를 자기 자신의 부모로 지정
    #[error("메뉴는 자기 자신의 부모가 될 수 없습니다")]
    SelfParent,

    /// 하위 메뉴를 부모로 지정 (순환 참조)
    #[error("하위 메뉴를 부모로 지정할 수 없습니다 (순환 참조)")]
    CircularReference,

    /// 하위 메뉴가 있는 메뉴 삭제 시도
    #[error("하위 메뉴가 있는 메뉴는 삭제할 수 없습니다. 하위 메뉴를 먼저 삭제하거나 이동하세요")]
    HasChildren,

    /// 권한 검사 실패 (어떤 플래그가 실패했는지 노출하지 않음)
    #[error("접근 권한이 없습니다")]
    Forbidden,

    /// 저장소 에러
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// RBAC 작업을 위한 Result 타입.
pub type RbacResult<T> = Result<T, RbacError>;

impl RbacError {
    /// `NotFound` 에러 생성 헬퍼.
    pub fn not_found(resource: Resource, id: impl ToString) -> Self {
        RbacError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// 안정적인 기계 판독용 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            RbacError::InvalidCredentials => "INVALID_CREDENTIALS",
            RbacError::NoRoleAssigned => "NO_ROLE_ASSIGNED",
            RbacError::InvalidRoleSelection => "INVALID_ROLE_SELECTION",
            RbacError::RoleInactive => "ROLE_INACTIVE",
            RbacError::InvalidToken => "INVALID_TOKEN",
            RbacError::DuplicateCode(_) => "DUPLICATE_CODE",
            RbacError::AlreadyExists(_) => "ALREADY_EXISTS",
            RbacError::NotFound { .. } => "NOT_FOUND",
            RbacError::ParentNotFound => "PARENT_NOT_FOUND",
            RbacError::SelfParent => "SELF_PARENT",
            RbacError::CircularReference => "CIRCULAR_REFERENCE",
            RbacError::HasChildren => "HAS_CHILDREN",
            RbacError::Forbidden => "FORBIDDEN",
            RbacError::Storage(_) => "STORAGE_ERROR",
            RbacError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 전송 계층에서 일반적으로 사용할 HTTP 상태 코드.
    pub fn http_status(&self) -> u16 {
        match self {
            RbacError::InvalidCredentials
            | RbacError::NoRoleAssigned
            | RbacError::RoleInactive
            | RbacError::InvalidToken => 401,
            RbacError::InvalidRoleSelection
            | RbacError::ParentNotFound
            | RbacError::SelfParent
            | RbacError::CircularReference
            | RbacError::HasChildren => 400,
            RbacError::DuplicateCode(_) | RbacError::AlreadyExists(_) => 409,
            RbacError::NotFound { .. } => 404,
            RbacError::Forbidden => 403,
            RbacError::Storage(_) | RbacError::Internal(_) => 500,
        }
    }

    /// 메뉴 트리 구조 위반인지 확인합니다.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            RbacError::ParentNotFound
                | RbacError::SelfParent
                | RbacError::CircularReference
                | RbacError::HasChildren
        )
    }

    /// 로그인 시 역할 문제로 차단되었는지 확인합니다.
    pub fn is_role_rejection(&self) -> bool {
        matches!(
            self,
            RbacError::NoRoleAssigned | RbacError::InvalidRoleSelection | RbacError::RoleInactive
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RbacError::InvalidCredentials.http_status(), 401);
        assert_eq!(RbacError::InvalidToken.http_status(), 401);
        assert_eq!(RbacError::DuplicateCode("A".into()).http_status(), 409);
        assert_eq!(RbacError::AlreadyExists(Resource::Role).http_status(), 409);
        assert_eq!(RbacError::not_found(Resource::Menu, "x").http_status(), 404);
        assert_eq!(RbacError::CircularReference.http_status(), 400);
        assert_eq!(RbacError::Forbidden.http_status(), 403);
    }

    #[test]
    fn test_credentials_message_is_generic() {
        let msg = RbacError::InvalidCredentials.to_string();
        assert!(!msg.contains("user"));
        assert!(!msg.contains("password"));
    }

    #[test]
    fn test_error_classification() {
        assert!(RbacError::HasChildren.is_structural());
        assert!(RbacError::SelfParent.is_structural());
        assert!(!RbacError::Forbidden.is_structural());

        assert!(RbacError::RoleInactive.is_role_rejection());
        assert!(!RbacError::InvalidCredentials.is_role_rejection());
    }

    #[test]
    fn test_not_found_display() {
        let err = RbacError::not_found(Resource::Menu, "abc");
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(err.to_string().contains("menu"));
        assert!(err.to_string().contains("abc"));
    }
}
