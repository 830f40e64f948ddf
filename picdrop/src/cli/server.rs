use std::error::Error;

use server::config::Config;

pub async fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    server::run(config).await
}
