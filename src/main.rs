#[tokio::main]
async fn main() -> anyhow::Result<()> {
    veriframe::run().await
}
