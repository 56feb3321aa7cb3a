use anyhow::{Context, Result};
use bunosh_cli::App;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;

    let code = App::new(cwd).run(args).await;
    std::process::exit(code);
}
