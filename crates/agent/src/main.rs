use logmetric_agent::runtime::{boot, serve};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = boot::boot()?;
    serve::serve(config).await
}
