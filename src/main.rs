use std::net::SocketAddr;
use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use passgate::{
    config::Config,
    create_router,
    repositories::{MemoryUserRepository, PgUserRepository, UserRepository},
    services::{LogMailer, Mailer},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ログ初期化（JSON形式、環境変数でレベル制御）
    init_tracing();

    tracing::info!("passgate 起動中...");

    // 設定読み込み
    let config = Config::load().map_err(|e| {
        tracing::error!(error = ?e, "設定の読み込みに失敗");
        anyhow::anyhow!("Failed to load config: {}", e)
    })?;

    tracing::info!(host = %config.host, port = %config.port, "設定読み込み完了");

    // サーバーアドレスを先に構築（config が move される前に）
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| {
            tracing::error!(error = ?e, "アドレスのパースに失敗");
            anyhow::anyhow!("Failed to parse address: {}", e)
        })?;

    let user_repo = build_user_repository(&config).await?;
    let mailer = build_mailer(&config)?;

    // AppState 構築
    let state = AppState::new(user_repo, mailer, config).map_err(|e| {
        tracing::error!(error = ?e, "AppState の構築に失敗");
        anyhow::anyhow!("Failed to create AppState: {}", e)
    })?;

    let app = create_router(state);

    // サーバー起動
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(error = ?e, addr = %addr, "ポートのバインドに失敗");
        anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
    })?;

    tracing::info!(addr = %addr, "サーバー起動");

    // Graceful shutdown 対応
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "サーバーエラー");
            anyhow::anyhow!("Server error: {}", e)
        })?;

    tracing::info!("サーバー終了");

    Ok(())
}

/// tracing の初期化（JSON形式）
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,passgate=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// ユーザーストアの構築
///
/// DATABASE_URL があれば PostgreSQL に接続してマイグレーションを適用、
/// なければインメモリストアで起動する。
async fn build_user_repository(config: &Config) -> anyhow::Result<Arc<dyn UserRepository>> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL 未設定: インメモリストアで起動（再起動でデータ消失）");
        return Ok(Arc::new(MemoryUserRepository::new()));
    };

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "データベース接続に失敗");
            anyhow::anyhow!("Failed to connect to database: {}", e)
        })?;

    sqlx::migrate!().run(&db_pool).await.map_err(|e| {
        tracing::error!(error = ?e, "マイグレーションに失敗");
        anyhow::anyhow!("Failed to run migrations: {}", e)
    })?;

    tracing::info!("データベース接続完了");

    Ok(Arc::new(PgUserRepository::new(db_pool)))
}

/// メーラーの構築（SMTP認証情報がなければログ出力のみ）
fn build_mailer(config: &Config) -> anyhow::Result<Arc<dyn Mailer>> {
    if let Some(mailer) = smtp_mailer(config)? {
        return Ok(mailer);
    }

    tracing::warn!("SMTP 未設定: メールはログ出力のみ");
    Ok(Arc::new(LogMailer))
}

#[cfg(feature = "email")]
fn smtp_mailer(config: &Config) -> anyhow::Result<Option<Arc<dyn Mailer>>> {
    let Some((username, password)) = config.smtp_credentials() else {
        return Ok(None);
    };

    let mailer = passgate::services::SmtpMailer::new(
        &config.smtp_host,
        config.smtp_port,
        username.expose_secret().clone(),
        password.expose_secret().clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to create SMTP mailer: {}", e))?;

    tracing::info!(host = %config.smtp_host, port = %config.smtp_port, "SMTP メーラー初期化完了");
    let mailer: Arc<dyn Mailer> = Arc::new(mailer);
    Ok(Some(mailer))
}

#[cfg(not(feature = "email"))]
fn smtp_mailer(config: &Config) -> anyhow::Result<Option<Arc<dyn Mailer>>> {
    if config.smtp_configured() {
        tracing::warn!("email 機能が無効なビルド: SMTP設定は無視されます");
    }
    Ok(None)
}

/// Graceful shutdown シグナル待機
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "Ctrl+C ハンドラーのインストールに失敗");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "SIGTERM ハンドラーのインストールに失敗");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, starting graceful shutdown");
        }
    }
}
