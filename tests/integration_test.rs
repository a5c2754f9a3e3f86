use ps_verify::browser::connect_to_browser_and_page;
use ps_verify::config::Config;
use ps_verify::infrastructure::{ChromeDriverFactory, DriverFactory};
use ps_verify::models::{Identifier, Outcome};
use ps_verify::services::ResponseClassifier;
use ps_verify::utils::logging;
use ps_verify::workflow::{FormSettings, VerifyCtx, VerifySession};

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_verify_single_identifier() {
    // 初始化日志
    logging::init(true);

    // 加载配置
    let config = Config::from_env().expect("配置无效");

    // 打开核验会话
    let driver = ChromeDriverFactory::new(&config)
        .open()
        .await
        .expect("连接浏览器失败");
    let classifier = ResponseClassifier::new(config.no_match_message.clone()).unwrap();
    let mut session = VerifySession::open(driver, FormSettings::from_config(&config), classifier)
        .await
        .expect("表单页面未就绪");

    // 注意：请根据实际情况修改证件号
    let identifier = Identifier::new(
        std::env::var("TEST_ID_NUMBER").unwrap_or_else(|_| "8001015009087".to_string()),
    )
    .unwrap();
    let outcome = session.run(&VerifyCtx::new(identifier, 1, 1)).await;

    session.close().await.expect("关闭会话失败");
    assert!(
        !matches!(outcome, Outcome::FatalFailure { .. }),
        "不应出现驱动故障: {}",
        outcome
    );
}

#[tokio::test]
#[ignore]
async fn test_browser_connection() {
    // 初始化日志
    logging::init(false);

    // 加载配置
    let config = Config::from_env().expect("配置无效");

    // 测试浏览器连接
    let result = connect_to_browser_and_page(config.browser_debug_port, &config.target_url).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}
