//! # RBAC Service
//!
//! 인증, 세션, 메뉴 권한 서비스.
//!
//! - [`auth`]: argon2 비밀번호 검증과 HS256 토큰 발급/검증
//! - [`store`]: 영속성 포트와 인메모리/PostgreSQL 어댑터
//! - [`services`]: 로그인, 메뉴 구조 변경, 권한 관리, 사용자/역할 관리, 초기 데이터
//! - [`state`]: 서비스 묶음

pub mod auth;
pub mod services;
pub mod state;
pub mod store;

pub use services::{
    seed_defaults, AccessPatch, AuthService, CurrentUser, DirectoryService, LoginRequest,
    LoginResponse, MenuDetail, MenuPatch, MenuService, NewAccess, NewMenu, NewRole, NewUser,
    PermissionService, RefreshResponse, RegisterRequest, RoleAssignment, RolePatch, SeedReport,
    UserPatch, UserProfile, WriteGate, DEFAULT_ADMIN_PASSWORD,
};
pub use state::AppState;
pub use store::{MemoryStore, PgStore, RbacStore, StoreError, StoreResult};
