use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    slotwatch_cli::cli::app::run().await
}
