use log::*;

use std::convert::TryInto;
use std::thread;
use futures::executor;

use crossbeam_channel::{
  bounded, Sender, Receiver,
};

use ::config::ConfigError;

use actix_cors::Cors;
use actix_files::Files;
use actix_rt::System;
use actix_web::{get, web, middleware, HttpResponse, App, HttpServer};
use actix_web::dev::{Body, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::errhandlers::{ErrorHandlers, ErrorHandlerResponse};

use crate::{
  error::*,
  app::*,
  db::DbService,
  notify::Mailer,
  services::config_services,
};

#[derive(Debug)]
enum StopEvent {
  /// Someone asked the whole process to stop.
  Shutdown,
  /// Main thread asks one server to stop.
  StopServer,
  /// A server finished; carries its index.
  Stopped(usize),
}

#[get("/stop")]
async fn stop_server(handle: web::Data<ServerHandle>) -> HttpResponse {
  info!("Got shutdown request.");
  handle.request_shutdown();

  HttpResponse::Ok().body("Shutting down.")
}

/// Server-side end of the channels shared with the main thread.
#[derive(Clone)]
struct ServerHandle {
  id: usize,
  main_tx: Sender<StopEvent>,
  rx: Receiver<StopEvent>,
}

impl ServerHandle {
  fn wait_stop(&self) -> Result<StopEvent> {
    Ok(self.rx.recv()?)
  }

  fn stopped(&self) {
    debug!("Server({}) stopped, let main thread know.", self.id);
    if self.main_tx.send(StopEvent::Stopped(self.id)).is_err() {
      debug!("main thread already gone.");
    }
  }

  fn request_shutdown(&self) {
    if self.main_tx.send(StopEvent::Shutdown).is_err() {
      warn!("main thread already gone.");
    }
  }
}

/// Main thread's view of every running server.
struct Supervisor {
  tx: Sender<StopEvent>,
  rx: Receiver<StopEvent>,
  servers: Vec<Sender<StopEvent>>,
}

impl Supervisor {
  fn new() -> Self {
    let (tx, rx) = bounded(1);
    Self { tx, rx, servers: Vec::new() }
  }

  fn add_server(&mut self) -> ServerHandle {
    let (tx, rx) = bounded(1);
    let id = self.servers.len();
    self.servers.push(tx);
    ServerHandle {
      id,
      main_tx: self.tx.clone(),
      rx,
    }
  }

  /// Block until all servers stopped on their own, or a shutdown request
  /// arrives, in which case every remaining server is told to stop.
  fn wait(&self) {
    let mut running = self.servers.len();
    while running > 0 {
      match self.rx.recv() {
        Ok(StopEvent::Stopped(id)) => {
          running -= 1;
          debug!("Server({}) stopped.  Remaining {}", id, running);
        },
        Ok(StopEvent::Shutdown) => {
          info!("Got shutdown signal.  Stop servers.");
          break;
        },
        Ok(ev) => {
          error!("Main thread received unexpected event: {:?}", ev);
        },
        Err(err) => {
          error!("Main thread waiter received error: {:?}", err);
          return;
        },
      }
    }
    if running == 0 {
      return;
    }

    for tx in self.servers.iter() {
      // a server that already exited has dropped its receiver.
      let _ = tx.send(StopEvent::StopServer);
    }
    while running > 0 {
      match self.rx.recv() {
        Ok(StopEvent::Stopped(id)) => {
          running -= 1;
          debug!("Server({}) stopped.  Remaining {}", id, running);
        },
        Ok(_) => (),
        Err(err) => {
          error!("Main thread waiter received error during shutdown: {:?}", err);
          return;
        },
      }
    }
    info!("Stopped all servers.");
  }
}

pub fn execute(config: AppConfig) -> Result<()> {
  let mut supervisor = Supervisor::new();

  let servers = config.get_str_list("servers")?
    .ok_or_else(|| Error::ConfigError { source: ConfigError::NotFound("servers".to_string()) })?;
  for server in servers {
    let cfg = config.clone();
    let handle = supervisor.add_server();
    debug!("Spawn server: {}", server);
    thread::spawn(move || {
      if let Err(err) = run_server(&cfg, &server, handle.clone()) {
        error!("Error from server({}): {:?}", server, err);
      }
      handle.stopped();
    });
  }

  supervisor.wait();

  info!("main thread: stopped.");
  Ok(())
}

async fn check_db(url: String) -> Result<()> {
  let db = DbService::new(&url)?;
  db.prepare().await
}

fn run_server(config: &AppConfig, prefix: &str, handle: ServerHandle) -> Result<()> {
  let mut sys = System::new(format!("system.{}", prefix));

  let debug = config.get_bool("debug")?.unwrap_or(false);
  debug!("Debug = {:?}", debug);

  if debug {
    // Fail early on bad SQL instead of on the first request.
    let db_url = config.require_str("db.url")?;
    sys.block_on(check_db(db_url))?;
  }

  info!("Serve.Services: configure services. prefix={}", prefix);
  let services = config_services(config, prefix)?;

  let stopper = if config.get_bool(&format!("{}.stopper", prefix))?.unwrap_or_default() {
    Some(handle.clone())
  } else {
    None
  };
  let cors_origin = config.get_str(&format!("{}.cors_origin", prefix))?;
  let static_dir = config.get_path(&format!("{}.static_dir", prefix))?;
  let mailer = Mailer::load_app_config(config)?;

  let mut server = HttpServer::new(move || {
    let cors = match cors_origin {
      Some(ref origin) => Cors::default()
        .allowed_origin(origin)
        .allow_any_method()
        .allow_any_header()
        .max_age(3600),
      None => Cors::default(),
    };

    let notice = mailer.clone();
    let admin_notice = ErrorHandlers::new()
      .handler(StatusCode::INTERNAL_SERVER_ERROR, move |res: ServiceResponse<Body>| {
        let request = format!("{} {}", res.request().method(), res.request().path());
        let detail = res.response().error()
          .map(|err| err.to_string())
          .unwrap_or_default();
        notice.server_error(&request, &detail);
        Ok(ErrorHandlerResponse::Response(res))
      });

    let mut app = App::new()
      .app_data(web::JsonConfig::default().limit(16 * 1024))
      .wrap(admin_notice)
      .wrap(cors)
      .wrap(middleware::Logger::default())
      .wrap(middleware::Compress::default())
      .configure(|web| services.web_config(web));

    if let Some(ref stopper) = stopper {
      app = app.data(stopper.clone())
        .service(stop_server);
    }

    if let Some(ref dir) = static_dir {
      app = app.service(Files::new("/", dir).index_file("index.html"));
    }

    app
  });

  let workers = match config.get_int(&format!("{}.workers", prefix))? {
    Some(workers) => workers.try_into()
      .map_err(|_| Error::ConfigError {
        source: ConfigError::Message(format!("{}.workers must be > 0", prefix)),
      })?,
    None => num_cpus::get(),
  };
  info!("Workers: {}", workers);
  server = server.workers(workers);

  if let Some(backlog) = config.get_int(&format!("{}.backlog", prefix))? {
    info!("Listen backlog: {}", backlog);
    server = server.backlog(backlog as i32);
  }

  let listen = config.require_str(&format!("{}.listen", prefix))?;
  info!("{} services listening on: {}", prefix, listen);
  server = server.bind(listen)?;

  let server = server.run();

  {
    let srv = server.clone();
    let handle = handle.clone();
    thread::spawn(move || {
      match handle.wait_stop() {
        Ok(StopEvent::StopServer) => {
          debug!("Got stop signal.  Stop server: {}", handle.id);
          executor::block_on(srv.stop(true));
        },
        Ok(ev) => {
          error!("Server waiter received invalid event: {:?}", ev);
        },
        // main thread is gone.
        Err(_) => (),
      }
    });
  }

  Ok(sys.block_on(server)?)
}
