#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mcp_playground_lib::run().await
}
