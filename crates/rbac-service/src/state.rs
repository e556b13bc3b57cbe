//! 서비스 공유 상태.
//!
//! AppState는 저장소 하나와 그 위의 서비스들을 묶습니다. 모든 서비스는
//! 같은 저장소와 같은 [`WriteGate`]를 공유하므로 한 프로세스 안의 변경
//! 연산은 서로 직렬화됩니다. Clone 비용은 Arc 복사뿐입니다.

use std::sync::Arc;

use rbac_core::AuthConfig;

use crate::auth::TokenIssuer;
use crate::services::{AuthService, DirectoryService, MenuService, PermissionService, WriteGate};
use crate::store::{MemoryStore, RbacStore};

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn RbacStore>,

    /// 로그인, 토큰 갱신, 로그아웃, 토큰 인증
    pub auth: AuthService,

    /// 메뉴 구조 변경과 트리 조회
    pub menus: MenuService,

    /// 역할-메뉴 권한 관리와 검사
    pub permissions: PermissionService,

    /// 사용자, 역할, 역할 할당 관리
    pub directory: DirectoryService,
}

impl AppState {
    /// 저장소와 인증 설정으로 상태를 구성합니다.
    pub fn new(store: Arc<dyn RbacStore>, auth_config: &AuthConfig) -> Self {
        let gate = Arc::new(WriteGate::new());
        let issuer = Arc::new(TokenIssuer::new(auth_config));

        let directory = DirectoryService::new(Arc::clone(&store), Arc::clone(&gate));
        let auth = AuthService::new(Arc::clone(&store), issuer, directory.clone());
        let menus = MenuService::new(Arc::clone(&store), Arc::clone(&gate));
        let permissions = PermissionService::new(Arc::clone(&store), gate);

        Self {
            store,
            auth,
            menus,
            permissions,
            directory,
        }
    }

    /// 인메모리 저장소 위의 상태 (테스트, 임베딩용).
    pub fn in_memory(auth_config: &AuthConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), auth_config)
    }

    /// 공유 저장소.
    pub fn store(&self) -> &Arc<dyn RbacStore> {
        &self.store
    }
}
