use greeting_scene::{Config, run};

fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    run(config)
}
