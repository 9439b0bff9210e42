use log::*;

use std::rc::Rc;
use std::cell::RefCell;
use std::time::Duration;

use tokio::time::delay_for;

use tokio_postgres::{
  connect, Client, Statement, Row, NoTls,
  types::ToSql,
};

use crate::error::*;

use super::{
  UserService,
  PostService,
  FollowService,
};

const MAX_RETRIES: u32 = 10;
const RETRY_DELAY: Duration = Duration::from_millis(100);
const RECONNECT_DELAY: Duration = Duration::from_millis(500);

pub static SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Connected client tagged with the connection generation it belongs to.
pub type RefClient = Rc<(u64, Client)>;

#[derive(Clone)]
pub enum ClientState {
  Connecting(u64),
  Connected(RefClient),
}

/// A postgres connection shared by every statement of one worker.
///
/// A background task owns the connection and reconnects when it drops;
/// each reconnect bumps the generation so prepared statements know to
/// prepare themselves again.
#[derive(Clone)]
pub struct SharedClient {
  state: Rc<RefCell<ClientState>>,
}

impl SharedClient {
  pub fn new(url: &str) -> Self {
    let shared_cl = Self {
      state: Rc::new(RefCell::new(ClientState::Connecting(0))),
    };
    let task_cl = shared_cl.clone();
    let url = url.to_string();
    actix_rt::spawn(async move {
      task_cl.run_connection(url).await;
      debug!("db client background task stopped.");
    });
    shared_cl
  }

  async fn run_connection(&self, url: String) {
    let mut generation = 0;
    loop {
      generation += 1;
      self.set_state(ClientState::Connecting(generation));
      let (cl, conn) = loop {
        match connect(&url, NoTls).await {
          Ok(pair) => break pair,
          Err(e) => {
            debug!("db client gen={}: connect error: {}", generation, e);
            delay_for(RECONNECT_DELAY).await;
          },
        }
      };
      debug!("db client gen={}: connected.", generation);
      self.set_state(ClientState::Connected(Rc::new((generation, cl))));

      match conn.await {
        Err(e) => {
          warn!("db connection gen={} error: {}", generation, e);
        },
        Ok(()) => {
          debug!("db connection gen={} closed.", generation);
          return;
        },
      }
      delay_for(RECONNECT_DELAY).await;
    }
  }

  pub async fn get_client(&self) -> Result<RefClient> {
    for _ in 0..MAX_RETRIES {
      match self.get_state() {
        ClientState::Connected(cl) => return Ok(cl),
        ClientState::Connecting(generation) => {
          debug!("get_client: gen={}: connecting..", generation);
          delay_for(RETRY_DELAY).await;
        },
      }
    }
    Err(Error::DisconnectedError("Failed to connect to database".to_string()))
  }

  /// True while `generation` is still the live connection.
  pub fn is_current(&self, generation: u64) -> bool {
    match *self.state.borrow() {
      ClientState::Connected(ref cl) => cl.0 == generation,
      _ => false,
    }
  }

  /// Run a multi-statement script, e.g. the schema.
  pub async fn batch_execute(&self, script: &str) -> Result<()> {
    let cl = self.get_client().await?;
    cl.1.batch_execute(script).await?;
    Ok(())
  }

  fn get_state(&self) -> ClientState {
    self.state.borrow().clone()
  }

  fn set_state(&self, state: ClientState) {
    self.state.replace(state);
  }
}

/// Statement prepared on a specific connection generation.
pub struct PreparedStatement {
  cl: RefClient,
  statement: Statement,
}

impl PreparedStatement {
  pub fn generation(&self) -> u64 {
    self.cl.0
  }
}

// client-side error with no SQLSTATE: the connection went away under us.
fn is_connection_closed(err: &tokio_postgres::Error) -> bool {
  err.code().is_none() && err.to_string() == "connection closed"
}

/// Lazily prepared statement that survives reconnects.
#[derive(Clone)]
pub struct VersionedStatement {
  shared_cl: SharedClient,
  prepared: RefCell<Option<Rc<PreparedStatement>>>,
  query: String,
}

macro_rules! impl_client_method {
  ($method:ident, $res_ty:ty) => {
    pub async fn $method(&self, params: &[&(dyn ToSql + Sync)]) -> Result<$res_ty> {
      let mut retries = 0;
      loop {
        let prepared = self.get_statement().await?;
        match prepared.cl.1.$method(&prepared.statement, params).await {
          Ok(res) => return Ok(res),
          Err(err) if is_connection_closed(&err) => {
            retries += 1;
            if retries >= MAX_RETRIES {
              return Err(Error::DisconnectedError(
                "Failed to connect to database".to_string()));
            }
            info!("DB connection closed, retry query.");
            self.prepared.replace(None);
            delay_for(RETRY_DELAY).await;
          },
          Err(err) => {
            error!("Postgres error: {}, query=[[{}]]", err, self.query);
            return Err(err.into());
          },
        }
      }
    }
  };
}

impl VersionedStatement {
  pub fn new(shared_cl: SharedClient, query: &str) -> Result<Self> {
    Ok(Self {
      shared_cl,
      prepared: RefCell::new(None),
      query: query.to_string(),
    })
  }

  pub async fn prepare(&self) -> Result<()> {
    self.get_statement().await?;
    Ok(())
  }

  async fn get_statement(&self) -> Result<Rc<PreparedStatement>> {
    let current = self.prepared.borrow().clone();
    if let Some(prepared) = current {
      if self.shared_cl.is_current(prepared.generation()) {
        return Ok(prepared);
      }
      debug!("statement gen={} is stale, preparing again.", prepared.generation());
    }

    let cl = self.shared_cl.get_client().await?;
    let statement = cl.1.prepare(&self.query).await.map_err(|err| {
      error!("Postgres prepare error: {}, query=[[{}]]", err, self.query);
      err
    })?;
    let prepared = Rc::new(PreparedStatement { cl, statement });
    self.prepared.replace(Some(prepared.clone()));
    Ok(prepared)
  }

  impl_client_method!(query, Vec<Row>);
  impl_client_method!(query_one, Row);
  impl_client_method!(query_opt, Option<Row>);
  impl_client_method!(execute, u64);
}

/// Per-worker handle on all stores.
#[derive(Clone)]
pub struct DbService {
  pub shared_cl: SharedClient,
  pub user: UserService,
  pub post: PostService,
  pub follow: FollowService,
}

impl DbService {
  pub fn new(db_url: &str) -> Result<DbService> {
    let shared_cl = SharedClient::new(db_url);

    Ok(DbService {
      user: UserService::new(shared_cl.clone())?,
      post: PostService::new(shared_cl.clone())?,
      follow: FollowService::new(shared_cl.clone())?,
      shared_cl,
    })
  }

  /// Create the tables if they don't exist yet.
  pub async fn init_schema(&self) -> Result<()> {
    info!("DBService: apply schema.");
    self.shared_cl.batch_execute(SCHEMA).await
  }

  pub async fn prepare(&self) -> Result<()> {
    info!("DBService: Prepare UserService.");
    self.user.prepare().await?;
    info!("DBService: Prepare PostService.");
    self.post.prepare().await?;
    info!("DBService: Prepare FollowService.");
    self.follow.prepare().await?;

    info!("DBService: finished.");
    Ok(())
  }
}
