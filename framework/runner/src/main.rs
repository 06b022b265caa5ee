use runbench_runner::prelude::{init, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = init()?;
    let config = cli.to_config()?;

    run(&config, &cli.scenarios).await
}
