//! RBAC 운영 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 스키마 마이그레이션
//! rbac migrate
//!
//! # 기본 역할/관리자/메뉴 생성
//! rbac seed --admin-password 'S3cret!'
//!
//! # 역할별 메뉴 트리
//! rbac menu-tree --role 6f1c...
//!
//! # 권한 확인 (거부 시 종료 코드 1)
//! rbac check --role 6f1c... --menu DASHBOARD --action update
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rbac_core::{init_logging, init_logging_from_env, Action, AppConfig};
use rbac_service::{AppState, PgStore};
use tracing::info;
use uuid::Uuid;

use rbac_cli::commands;

#[derive(Parser)]
#[command(name = "rbac")]
#[command(about = "RBAC backend CLI - 스키마, 초기 데이터, 권한 점검", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로 (없으면 환경 변수만 사용)
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 스키마 마이그레이션 실행
    Migrate,

    /// 기본 역할, 관리자, 메뉴, 권한 생성 (이미 있으면 건너뜀)
    Seed {
        /// 관리자 비밀번호 (기본값은 첫 로그인 후 반드시 변경)
        #[arg(long)]
        admin_password: Option<String>,
    },

    /// 비밀번호를 argon2 PHC 문자열로 해시
    HashPassword {
        /// 평문 비밀번호
        secret: String,
    },

    /// 메뉴 트리를 JSON으로 출력
    MenuTree {
        /// 비활성 메뉴 포함
        #[arg(long, default_value = "false")]
        include_inactive: bool,

        /// 역할 ID (지정하면 조회 가능한 메뉴만 권한과 함께 출력)
        #[arg(long)]
        role: Option<Uuid>,
    },

    /// 역할의 메뉴 권한 확인
    Check {
        /// 역할 ID
        #[arg(long)]
        role: Uuid,

        /// 메뉴 코드
        #[arg(long)]
        menu: String,

        /// 액션 (view, create, update, delete)
        #[arg(long)]
        action: Action,
    },

    /// 만료된 세션 삭제
    PurgeSessions,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::HashPassword { secret } = &cli.command {
        init_logging_from_env()?;
        println!("{}", commands::hash_password::run(secret)?);
        return Ok(ExitCode::SUCCESS);
    }

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;
    init_logging(&config.logging)?;

    let store = PgStore::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    if let Commands::Migrate = cli.command {
        commands::migrate::run(&store).await?;
        println!("마이그레이션 완료");
        return Ok(ExitCode::SUCCESS);
    }

    let state = AppState::new(Arc::new(store), &config.auth);

    match cli.command {
        Commands::Seed { admin_password } => {
            let report = commands::seed::run(&state, admin_password.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::MenuTree {
            include_inactive,
            role,
        } => {
            let tree = commands::menu_tree::run(&state, include_inactive, role).await?;
            println!("{}", tree);
        }

        Commands::Check { role, menu, action } => {
            let allowed = commands::check::run(&state, role, &menu, action).await?;
            if !allowed {
                println!("denied");
                return Ok(ExitCode::FAILURE);
            }
            println!("allowed");
        }

        Commands::PurgeSessions => {
            let purged = commands::purge_sessions::run(&state).await?;
            info!(purged, "Expired sessions purged");
            println!("만료 세션 {}개 삭제", purged);
        }

        Commands::Migrate | Commands::HashPassword { .. } => {}
    }

    Ok(ExitCode::SUCCESS)
}
