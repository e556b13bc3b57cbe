//! 역할, 사용자-역할 할당, 로그인 시 역할 선택.
//!
//! "현재 역할"은 사용자에 저장되지 않습니다. 로그인할 때마다
//! [`select_role`]로 다시 결정되고, 발급된 토큰 안에서만 세션 동안 유지됩니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RbacError, RbacResult};

/// 역할.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// 역할 ID
    pub id: Uuid,
    /// 고유 역할 이름
    pub name: String,
    /// 고유 역할 코드 (생성 후 변경 불가)
    pub code: String,
    /// 설명
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 활성 상태 (false = 소프트 삭제)
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// 새 활성 역할을 생성합니다.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            code: code.into(),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// 설명을 설정합니다.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 역할을 비활성화합니다 (소프트 삭제).
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

/// 사용자-역할 할당.
///
/// 사용자당 `is_default`가 true인 할당은 최대 하나입니다.
/// 이 불변식은 할당 경로에서 유지되며 DB 제약에 의존하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleMembership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    /// 기본 역할 여부
    pub is_default: bool,
    /// 할당한 관리자 (감사용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_by: Option<Uuid>,
    /// 할당 시각
    pub assigned_at: DateTime<Utc>,
}

impl UserRoleMembership {
    /// 새 할당을 생성합니다.
    pub fn new(user_id: Uuid, role_id: Uuid, is_default: bool, assigned_by: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            role_id,
            is_default,
            assigned_by,
            assigned_at: Utc::now(),
        }
    }
}

/// 역할 정보가 결합된 할당. 역할 선택기의 입력입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipWithRole {
    pub membership: UserRoleMembership,
    pub role: Role,
}

/// 세션을 지배하는 것으로 결정된 역할.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRole {
    pub role_id: Uuid,
    pub role_code: String,
    pub role_name: String,
}

impl From<&Role> for ResolvedRole {
    fn from(role: &Role) -> Self {
        Self {
            role_id: role.id,
            role_code: role.code.clone(),
            role_name: role.name.clone(),
        }
    }
}

/// 사용자의 역할 할당 중 세션에 사용할 역할 하나를 선택합니다.
///
/// 1. 할당이 없으면 `NoRoleAssigned`
/// 2. 명시적으로 요청한 역할이 있으면 해당 할당을 선택 (없으면 `InvalidRoleSelection`)
/// 3. 아니면 기본 역할, 기본 역할이 없으면 입력 순서상 첫 번째 할당
/// 4. 선택된 역할이 비활성이면 `RoleInactive`
///
/// 입력 순서가 같으면 결과도 같습니다. 기본 역할이 없을 때 재현 가능한
/// 결과를 얻으려면 호출자는 할당 시각 오름차순처럼 안정적인 순서로 전달해야 합니다.
pub fn select_role(
    memberships: &[MembershipWithRole],
    requested_role_id: Option<Uuid>,
) -> RbacResult<ResolvedRole> {
    let first = memberships.first().ok_or(RbacError::NoRoleAssigned)?;

    let selected = match requested_role_id {
        Some(role_id) => memberships
            .iter()
            .find(|m| m.membership.role_id == role_id)
            .ok_or(RbacError::InvalidRoleSelection)?,
        None => memberships
            .iter()
            .find(|m| m.membership.is_default)
            .unwrap_or(first),
    };

    if !selected.role.is_active {
        return Err(RbacError::RoleInactive);
    }

    Ok(ResolvedRole::from(&selected.role))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(user_id: Uuid, role: &Role, is_default: bool) -> MembershipWithRole {
        MembershipWithRole {
            membership: UserRoleMembership::new(user_id, role.id, is_default, None),
            role: role.clone(),
        }
    }

    #[test]
    fn test_no_roles() {
        let result = select_role(&[], None);
        assert!(matches!(result, Err(RbacError::NoRoleAssigned)));

        let result = select_role(&[], Some(Uuid::new_v4()));
        assert!(matches!(result, Err(RbacError::NoRoleAssigned)));
    }

    #[test]
    fn test_default_role_wins_over_order() {
        let user = Uuid::new_v4();
        let manager = Role::new("Manager", "MANAGER");
        let staff = Role::new("Staff", "STAFF");
        let list = vec![membership(user, &manager, false), membership(user, &staff, true)];

        let resolved = select_role(&list, None).unwrap();
        assert_eq!(resolved.role_code, "STAFF");
    }

    #[test]
    fn test_first_role_without_default() {
        let user = Uuid::new_v4();
        let manager = Role::new("Manager", "MANAGER");
        let staff = Role::new("Staff", "STAFF");
        let list = vec![membership(user, &manager, false), membership(user, &staff, false)];

        let resolved = select_role(&list, None).unwrap();
        assert_eq!(resolved.role_id, manager.id);
    }

    #[test]
    fn test_explicit_role_overrides_default() {
        let user = Uuid::new_v4();
        let staff = Role::new("Staff", "STAFF");
        let manager = Role::new("Manager", "MANAGER");
        let list = vec![membership(user, &staff, true), membership(user, &manager, false)];

        let resolved = select_role(&list, Some(manager.id)).unwrap();
        assert_eq!(resolved.role_code, "MANAGER");
        assert_eq!(resolved.role_name, "Manager");
    }

    #[test]
    fn test_unknown_explicit_role() {
        let user = Uuid::new_v4();
        let staff = Role::new("Staff", "STAFF");
        let list = vec![membership(user, &staff, true)];

        let result = select_role(&list, Some(Uuid::new_v4()));
        assert!(matches!(result, Err(RbacError::InvalidRoleSelection)));
    }

    #[test]
    fn test_inactive_role_rejected() {
        let user = Uuid::new_v4();
        let mut staff = Role::new("Staff", "STAFF");
        staff.deactivate();
        let manager = Role::new("Manager", "MANAGER");
        let list = vec![membership(user, &staff, true), membership(user, &manager, false)];

        assert!(matches!(select_role(&list, None), Err(RbacError::RoleInactive)));
        // 다른 활성 역할을 명시하면 로그인 가능
        assert_eq!(select_role(&list, Some(manager.id)).unwrap().role_code, "MANAGER");
    }

    #[test]
    fn test_selection_is_deterministic() {
        let user = Uuid::new_v4();
        let roles: Vec<Role> = (0..5)
            .map(|i| Role::new(format!("Role {}", i), format!("R{}", i)))
            .collect();
        let list: Vec<_> = roles.iter().map(|r| membership(user, r, false)).collect();

        let first = select_role(&list, None).unwrap();
        for _ in 0..10 {
            assert_eq!(select_role(&list, None).unwrap(), first);
        }
    }
}
