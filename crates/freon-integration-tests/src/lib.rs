//! Shared fixtures for the end-to-end ceremony tests.
//!
//! Spins up a real coordinator (actix over an in-memory-backed temp SQLite
//! file) on an ephemeral port, and builds per-participant fixtures: an
//! isolated share store and a fresh age identity written to disk the way an
//! operator would keep one.

use std::io::Write;
use std::path::PathBuf;

use actix_web::{web, App, HttpServer};
use age::secrecy::ExposeSecret;

use freon_client::store::ShareStore;
use freon_coordinator::{routes, AppState};

/// A running in-process coordinator.
pub struct TestCoordinator {
    /// `host:port` to hand to clients.
    pub host: String,
    handle: actix_web::dev::ServerHandle,
    _db_dir: tempfile::TempDir,
}

impl TestCoordinator {
    /// Start a coordinator on an ephemeral port.
    pub async fn start() -> TestCoordinator {
        let db_dir = tempfile::tempdir().expect("coordinator temp dir");
        let db = freon_db::open(&db_dir.path().join("database.sqlite"))
            .expect("open coordinator db");
        let state = web::Data::new(AppState::new(db));

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .configure(routes::configure)
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind ephemeral port");

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        tokio::spawn(server);

        TestCoordinator {
            host: format!("127.0.0.1:{}", addr.port()),
            handle,
            _db_dir: db_dir,
        }
    }

    /// Stop accepting connections.
    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

/// One simulated operator: a share store and an age identity on disk.
pub struct TestParticipant {
    pub store: ShareStore,
    pub identity_file: PathBuf,
    pub recipient: String,
    _home: tempfile::TempDir,
}

impl TestParticipant {
    pub fn new() -> TestParticipant {
        let home = tempfile::tempdir().expect("participant home");
        let identity = age::x25519::Identity::generate();
        let recipient = identity.to_public().to_string();

        let identity_file = home.path().join("keys.age");
        let mut file = std::fs::File::create(&identity_file).expect("create identity file");
        writeln!(file, "{}", identity.to_string().expose_secret()).expect("write identity");

        TestParticipant {
            store: ShareStore::at(home.path().join(".freon.json")),
            identity_file,
            recipient,
            _home: home,
        }
    }
}

impl Default for TestParticipant {
    fn default() -> Self {
        TestParticipant::new()
    }
}
