//! 기본 역할, 관리자, 메뉴, 권한 초기 데이터.
//!
//! 여러 번 실행해도 안전합니다. 이미 있는 레코드는 재사용하고 덮어쓰지 않습니다.

use rbac_core::{Menu, Permissions, RbacResult, Role};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::directory::{NewRole, NewUser, RoleAssignment};
use super::menus::NewMenu;
use super::permissions::NewAccess;
use crate::state::AppState;
use crate::store::{AccessStore, MembershipStore, MenuStore, RoleStore, UserStore};

/// 관리자 비밀번호를 지정하지 않았을 때 사용하는 값. 첫 로그인 후 변경해야 합니다.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin1234!";

const ADMIN_USERNAME: &str = "admin";
const ADMIN_EMAIL: &str = "admin@example.com";

/// (이름, 코드, 설명)
const ROLES: [(&str, &str, &str); 3] = [
    ("Administrator", "ADMIN", "전체 관리 권한"),
    ("Manager", "MANAGER", "운영 관리"),
    ("Staff", "STAFF", "일반 사용자"),
];

/// (부모 코드, 이름, 코드, URL, 순서)
const MENUS: [(Option<&str>, &str, &str, &str, i32); 5] = [
    (None, "대시보드", "DASHBOARD", "/dashboard", 1),
    (None, "사용자 관리", "USER_MGMT", "/users", 2),
    (None, "역할 관리", "ROLE_MGMT", "/roles", 3),
    (None, "메뉴 관리", "MENU_MGMT", "/menus", 4),
    (Some("USER_MGMT"), "사용자 목록", "USER_LIST", "/users/list", 1),
];

/// 초기 데이터 실행 결과. 새로 만든 레코드 수만 셉니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub roles_created: usize,
    pub users_created: usize,
    pub memberships_created: usize,
    pub menus_created: usize,
    pub permissions_created: usize,
}

impl SeedReport {
    /// 아무것도 만들지 않았는지 확인합니다.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// 기본 데이터를 생성합니다.
///
/// - 역할 ADMIN, MANAGER, STAFF
/// - 관리자 계정 (ADMIN 기본 역할)
/// - 메뉴 DASHBOARD, USER_MGMT(하위 USER_LIST), ROLE_MGMT, MENU_MGMT
/// - ADMIN: 모든 메뉴 전체 권한, STAFF: DASHBOARD 조회 권한
#[instrument(skip_all)]
pub async fn seed_defaults(state: &AppState, admin_password: &str) -> RbacResult<SeedReport> {
    let mut report = SeedReport::default();

    let mut roles = Vec::with_capacity(ROLES.len());
    for (name, code, description) in ROLES {
        roles.push(ensure_role(state, name, code, description, &mut report).await?);
    }
    let admin_role = roles[0].id;
    let staff_role = roles[2].id;

    let admin = ensure_admin(state, admin_password, &mut report).await?;
    if state
        .store()
        .find_membership(admin, admin_role)
        .await?
        .is_none()
    {
        state
            .directory
            .assign_role(
                admin,
                RoleAssignment {
                    role_id: admin_role,
                    is_default: true,
                },
                None,
            )
            .await?;
        report.memberships_created += 1;
    }

    let mut menus: Vec<Menu> = Vec::with_capacity(MENUS.len());
    for (parent_code, name, code, url, order) in MENUS {
        let parent_id = parent_code
            .and_then(|p| menus.iter().find(|m| m.code == p))
            .map(|m| m.id);
        menus.push(ensure_menu(state, parent_id, name, code, url, order, &mut report).await?);
    }

    for menu in &menus {
        ensure_access(state, admin_role, menu.id, Permissions::full(), &mut report).await?;
        if menu.code == "DASHBOARD" {
            ensure_access(state, staff_role, menu.id, Permissions::view_only(), &mut report)
                .await?;
        }
    }

    info!(?report, "Seeding finished");
    Ok(report)
}

async fn ensure_role(
    state: &AppState,
    name: &str,
    code: &str,
    description: &str,
    report: &mut SeedReport,
) -> RbacResult<Role> {
    if let Some(role) = state.store().find_role_by_code(code).await? {
        return Ok(role);
    }

    let role = state
        .directory
        .create_role(NewRole {
            name: name.to_string(),
            code: code.to_string(),
            description: Some(description.to_string()),
        })
        .await?;
    report.roles_created += 1;
    info!(role_code = code, "Seeded role");
    Ok(role)
}

async fn ensure_admin(
    state: &AppState,
    password: &str,
    report: &mut SeedReport,
) -> RbacResult<Uuid> {
    if let Some(user) = state.store().find_user_by_login(ADMIN_USERNAME).await? {
        return Ok(user.id);
    }

    let user = state
        .directory
        .create_user(NewUser {
            username: ADMIN_USERNAME.to_string(),
            email: ADMIN_EMAIL.to_string(),
            password: password.to_string(),
            full_name: "System Administrator".to_string(),
        })
        .await?;
    report.users_created += 1;
    info!(user_id = %user.id, "Seeded admin user");
    Ok(user.id)
}

async fn ensure_menu(
    state: &AppState,
    parent_id: Option<Uuid>,
    name: &str,
    code: &str,
    url: &str,
    order: i32,
    report: &mut SeedReport,
) -> RbacResult<Menu> {
    if let Some(menu) = state.store().find_menu_by_code(code).await? {
        return Ok(menu);
    }

    let mut input = NewMenu::new(name, code).ordered(order);
    input.url = Some(url.to_string());
    if let Some(parent_id) = parent_id {
        input = input.under(parent_id);
    }

    let menu = state.menus.create(input).await?;
    report.menus_created += 1;
    info!(menu_code = code, "Seeded menu");
    Ok(menu)
}

async fn ensure_access(
    state: &AppState,
    role_id: Uuid,
    menu_id: Uuid,
    permissions: Permissions,
    report: &mut SeedReport,
) -> RbacResult<()> {
    if state
        .store()
        .find_access_for(role_id, menu_id)
        .await?
        .is_some()
    {
        return Ok(());
    }

    state
        .permissions
        .grant(NewAccess::with_permissions(role_id, menu_id, permissions))
        .await?;
    report.permissions_created += 1;
    Ok(())
}
