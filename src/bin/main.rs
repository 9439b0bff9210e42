use dotenv::dotenv;

use microblog::{app::*, error::*};

fn main() -> Result<()> {
  dotenv().ok();
  env_logger::init();

  let yaml = clap::load_yaml!("main-cli.yml");
  let cli = clap::App::from_yaml(yaml).get_matches();

  let config = AppConfig::new_clap(&cli)?;

  match cli.subcommand_name() {
    Some("init-db") => init_db::execute(config)?,
    // default to 'serve' command.
    _ => serve::execute(config)?,
  }
  log::info!("Main finished");
  Ok(())
}
