#[tokio::main]
async fn main() -> anyhow::Result<()> {
    neura_focus_lib::run().await
}
