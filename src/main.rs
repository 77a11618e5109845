use danci_vocab::logging::init_tracing;
use danci_vocab::{
    create_configured_provider, AppConfig, DataProviderError, ProviderResult, VocabularySession,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ProviderResult<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    let _log_guard = init_tracing(&config);
    run(&config).await
}

/// 加载词汇数据并输出进度，加载失败时返回错误使进程以非零状态退出
async fn run(config: &AppConfig) -> ProviderResult<()> {
    info!(
        provider = %config.provider_type,
        db_path = %config.db_path.display(),
        "Danci 词汇数据层启动"
    );

    let provider = create_configured_provider(config)?;
    let mut session = VocabularySession::new(provider).with_auto_seed(config.auto_seed);

    session.load().await;
    if session.supports_syncing() {
        session.sync().await;
    }

    if let Some(err) = session.current_error() {
        error!(error = %err, "加载词汇数据失败");
        return Err(DataProviderError::Unknown(err.to_string()));
    }

    let language = session.current_language();
    for category in session.categories() {
        let progress = session.progress(category.category_type);
        info!(
            category = %category.category_type,
            completed = progress.completed,
            total = progress.total,
            "分类进度"
        );
    }

    let overall = session.overall_progress();
    info!(
        language = %language,
        completed = overall.completed,
        total = overall.total,
        ratio = %format!("{:.0}%", overall.ratio() * 100.0),
        "总体进度"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use danci_vocab::provider::ProviderType;

    #[tokio::test]
    async fn test_run_fails_when_load_fails() {
        let config = AppConfig {
            provider_type: ProviderType::Stub,
            ..AppConfig::default()
        };
        assert!(matches!(
            run(&config).await,
            Err(DataProviderError::Unknown(_))
        ));
    }

    #[tokio::test]
    async fn test_run_succeeds_with_seeded_local_store() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig {
            provider_type: ProviderType::Local,
            db_path: tmp.path().join("vocab.db"),
            ..AppConfig::default()
        };
        run(&config).await.unwrap();
    }
}
