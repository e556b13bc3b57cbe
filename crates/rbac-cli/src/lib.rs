//! RBAC 운영 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 스키마 마이그레이션과 초기 데이터
//! - 비밀번호 해시 생성
//! - 메뉴 트리와 권한 점검
//! - 만료 세션 정리

pub mod commands;
