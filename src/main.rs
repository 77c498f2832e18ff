use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xray_report_backend::{
    config::{Config, inference::API_KEY_ENV},
    error::{AppError, AppResult},
    handlers::AppState,
    routes::create_app,
    services::HttpVisionClient,
};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> AppResult<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xray_report_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = if std::path::Path::new(CONFIG_PATH).exists() {
        let config = Config::from_file(CONFIG_PATH)?;
        tracing::info!("已加载配置文件: {}", CONFIG_PATH);
        config
    } else {
        tracing::warn!("未找到配置文件，使用默认配置");
        let default_config = Config::default();
        // 保存默认配置到文件
        if let Err(e) = default_config.save_to_file(CONFIG_PATH) {
            tracing::warn!("保存默认配置失败: {}", e);
        }
        let mut config = default_config;
        config.inference.apply_env_overrides();
        config.validate()?;
        config
    };

    tracing::info!("服务器配置: {}", config.server_addr());

    if config.inference.api_key.trim().is_empty() {
        tracing::warn!(
            "推理服务密钥为空，可在配置文件 inference.api_key 或环境变量 {} 中设置",
            API_KEY_ENV
        );
    }

    // 初始化视觉推理客户端
    let vision = HttpVisionClient::new(config.inference.clone())
        .map_err(|e| AppError::config(e.to_string()))?;
    tracing::info!(
        endpoint = %config.inference.endpoint,
        model = %config.inference.model,
        "视觉推理客户端初始化成功"
    );

    // 创建应用状态并启动分析工作池
    let cancel = CancellationToken::new();
    let app_state = AppState::build(config.clone(), Arc::new(vision), cancel.clone());
    app_state.local_storage.ensure_root().await?;

    let workers = app_state.workers.clone();
    let app = create_app(app_state);

    // 启动服务器
    let listener = tokio::net::TcpListener::bind(&config.server_addr()).await?;
    tracing::info!("🚀 服务器启动成功，监听地址: {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 取消进行中的分析并等待工作者退出
    tracing::info!("正在停止分析工作池...");
    workers.shutdown().await;

    tracing::info!("服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("安装 Ctrl+C 处理器失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("安装 SIGTERM 处理器失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("收到 SIGINT"),
        () = terminate => tracing::info!("收到 SIGTERM"),
    }
}
