use ragscope_serve::ServeConfig;
use ragscope_store::ScopeConfig;

pub fn execute(config: &ScopeConfig) -> anyhow::Result<()> {
    let serve_config = ServeConfig {
        bind: config.bind.clone(),
        port: config.port,
        logs_dir: config.logs_dir.clone(),
        utc_offset: config.offset()?,
    };
    tokio::runtime::Runtime::new()?.block_on(ragscope_serve::serve(serve_config))
}
