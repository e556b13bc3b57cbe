//! # RBAC Core
//!
//! 멀티 테넌트 관리자 백엔드의 역할 기반 접근 제어(RBAC) 핵심 도메인을 제공합니다.
//!
//! 이 크레이트는 I/O 없이 순수한 타입과 알고리즘만 포함합니다:
//! - 사용자, 역할, 메뉴, 권한, 세션 엔티티
//! - 로그인 시 역할 선택 ([`select_role`])
//! - 메뉴 트리 구성 ([`build_menu_tree`])
//! - 메뉴 구조 변경 검증 ([`MenuGuard`])
//! - (역할, 메뉴, 액션) 권한 평가 ([`evaluate_access`])
//! - 에러 분류, 설정 관리, 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
