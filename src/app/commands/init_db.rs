use log::*;

use actix_rt::System;

use crate::{
  error::*,
  app::*,
  db::DbService,
};

/// Create the tables and check every prepared statement against them.
pub fn execute(config: AppConfig) -> Result<()> {
  let db_url = config.require_str("db.url")?;
  let mut sys = System::new("system.init-db");
  sys.block_on(async move {
    let db = DbService::new(&db_url)?;
    db.init_schema().await?;
    db.prepare().await
  })?;
  info!("database schema ready.");
  Ok(())
}
