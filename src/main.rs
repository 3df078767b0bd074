use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    sluice::app::run().await?;
    Ok(())
}
