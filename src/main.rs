use anyhow::Result;
use prep_ai::utils::logging;
use prep_ai::{App, Command, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    let command = Command::from_args(std::env::args().skip(1))?;

    // 初始化并运行应用
    App::initialize(config).await?.run(command).await?;

    Ok(())
}
