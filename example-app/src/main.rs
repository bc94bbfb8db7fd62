//! # 示例应用程序
//!
//! 演示宿主如何注册为注入根、启动组合并驱动服务生命周期

mod heads;

use clap::Parser;
use di_abstractions::ResolverExt;
use heads::{CommandTable, HeadsPlugin};
use infrastructure_common::{BootstrapConfig, Service};
use infrastructure_composition::{
    AppInjectorBuilder, InjectionModule, JsonCodec, LifecycleDriver, LoggingConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "依赖注入引导示例宿主")]
struct Args {
    /// 引导配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 资源根目录
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/resources"))]
    resources: PathBuf,

    /// 日志级别，覆盖配置文件
    #[arg(long)]
    log_level: Option<String>,

    /// 要展示的头像名称
    #[arg(long, default_value = "steve")]
    head: String,

    /// 以带缩进的 JSON 输出头像
    #[arg(long)]
    pretty: bool,

    /// 启用之后等待 Ctrl-C 再关闭
    #[arg(long)]
    wait: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = BootstrapConfig::load(args.config.as_deref())?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    config.resource_roots.push(args.resources.clone());
    let logging = LoggingConfig::from_settings(&config.logging)?;
    let builder = AppInjectorBuilder::from_config(config).with_logging(logging);

    // 宿主在自身加载阶段注册注入根与组合模块，进程级组合同时服务 ServiceLoader::load
    let plugin = Arc::new(HeadsPlugin::default());
    let scope = heads::declare(builder.scope_builder("example-app")).build();
    let app = builder.build_global()?;
    info!("启动示例宿主");
    app.register_injection_root(plugin.clone(), Arc::clone(&scope))?;

    let codec = if args.pretty {
        JsonCodec::pretty()
    } else {
        JsonCodec::new()
    };
    let module = InjectionModule::new(scope)
        .attach(app)
        .with_codec(codec)
        .with_host_handle::<HeadsPlugin>(Arc::clone(&plugin));
    app.register_root_module(Arc::new(module))?;

    let injector = app.boot()?;

    let mut services = LifecycleDriver::<dyn Service>::collect(app)?;
    services.load().await?;
    services.enable().await?;

    info!("已注册命令: {:?}", injector.get::<CommandTable>()?.commands());
    println!("{}", plugin.describe(&args.head)?);

    if args.wait {
        tokio::signal::ctrl_c().await?;
        info!("收到退出信号，正在关闭");
    }

    services.disable().await?;
    info!("示例宿主已关闭");
    Ok(())
}
