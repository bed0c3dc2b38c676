//! Purpose: End-to-end tests for the HTTP/JSON server and remote client.
//! Exports: None (integration test module).
//! Role: Validate CRUD and suggestions across TCP, plus error envelopes.
//! Invariants: Uses a loopback-only server with a temp asset file.
//! Invariants: Bounded waits avoid test flakiness.
//! Invariants: Server processes are cleaned up on drop.

use herodex::api::{ErrorKind, Hero, Publisher, RemoteClient};
use std::io::Read;
use std::net::{SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread::sleep;
use std::time::{Duration, Instant};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

static SERVER_LOCK: Mutex<()> = Mutex::new(());

struct TestServer {
    child: Child,
    base_url: String,
    _server_guard: MutexGuard<'static, ()>,
}

impl TestServer {
    fn start(asset: &Path) -> TestResult<Self> {
        let guard = SERVER_LOCK
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let mut last_err: Option<Box<dyn std::error::Error>> = None;
        for _attempt in 0..3 {
            let port = pick_port()?;
            let bind = format!("127.0.0.1:{port}");
            let base_url = format!("http://{bind}");

            let mut command = Command::new(env!("CARGO_BIN_EXE_herodex"));
            command
                .arg("--db")
                .arg(asset)
                .arg("serve")
                .arg("--bind")
                .arg(&bind)
                .stdout(Stdio::null())
                .stderr(Stdio::piped());
            let mut child = command.spawn()?;

            match wait_for_server(&mut child, bind.parse()?) {
                Ok(()) => {
                    return Ok(Self {
                        child,
                        base_url,
                        _server_guard: guard,
                    });
                }
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    last_err = Some(err);
                    sleep(Duration::from_millis(30));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| "server failed to start".into()))
    }

    fn client(&self) -> TestResult<RemoteClient> {
        Ok(RemoteClient::new(self.base_url.clone())?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn pick_port() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

fn wait_for_server(child: &mut Child, addr: SocketAddr) -> TestResult<()> {
    let url = format!("http://{addr}/healthz");
    let start = Instant::now();
    loop {
        if let Ok(resp) = ureq::get(&url).call() {
            if resp.status() == 200 {
                return Ok(());
            }
        }
        if let Some(status) = child.try_wait()? {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            let detail = stderr.trim();
            return Err(format!(
                "server exited before ready (status: {status}, stderr: {})",
                if detail.is_empty() { "<empty>" } else { detail }
            )
            .into());
        }
        if start.elapsed() > Duration::from_secs(8) {
            return Err("server did not start in time".into());
        }
        sleep(Duration::from_millis(20));
    }
}

fn write_asset(dir: &Path) -> TestResult<PathBuf> {
    let path = dir.join("db.json");
    let body = r#"{"heroes":[
        {"id":"dc-batman","superhero":"Batman","publisher":"DC Comics",
         "alter_ego":"Bruce Wayne","first_appearance":"Detective Comics #27",
         "characters":"Bruce Wayne"},
        {"id":"marvel-spider","superhero":"Spider-Man","publisher":"Marvel Comics",
         "alter_ego":"Peter Parker","first_appearance":"Amazing Fantasy #15",
         "characters":"Peter Parker"}
    ]}"#;
    std::fs::write(&path, body)?;
    Ok(path)
}

fn draft(superhero: &str, publisher: Publisher, alter_ego: &str) -> Hero {
    Hero {
        id: String::new(),
        superhero: superhero.to_string(),
        publisher,
        alter_ego: alter_ego.to_string(),
        first_appearance: String::new(),
        characters: String::new(),
        alt_img: None,
    }
}

#[test]
fn remote_list_and_get() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let asset = write_asset(temp.path())?;
    let server = TestServer::start(&asset)?;
    let client = server.client()?;

    let heroes = client.list_heroes()?;
    assert_eq!(heroes.len(), 2);
    assert_eq!(heroes[0].id, "dc-batman");

    let hero = client.get_hero("marvel-spider")?;
    assert_eq!(hero.superhero, "Spider-Man");
    assert_eq!(hero.publisher, Publisher::MarvelComics);
    Ok(())
}

#[test]
fn remote_get_miss_is_not_found_with_hint() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let asset = write_asset(temp.path())?;
    let server = TestServer::start(&asset)?;
    let client = server.client()?;

    let err = client.get_hero("dc-nobody").expect_err("expected miss");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.hint().is_some());
    Ok(())
}

#[test]
fn remote_add_update_delete_round_trip() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let asset = write_asset(temp.path())?;
    let server = TestServer::start(&asset)?;
    let client = server.client()?;

    let added = client.add_hero(&draft("Iron Man", Publisher::MarvelComics, "Tony Stark"))?;
    assert_eq!(added.id, "2");

    let mut changed = added.clone();
    changed.first_appearance = "Tales of Suspense #39".to_string();
    let updated = client.update_hero(&changed)?;
    assert_eq!(updated.first_appearance, "Tales of Suspense #39");

    // Mutations live in the server session, so the list reflects the add.
    let heroes = client.list_heroes()?;
    assert_eq!(heroes.len(), 3);

    assert!(client.delete_hero("2")?);
    assert!(!client.delete_hero("2")?);
    assert_eq!(client.list_heroes()?.len(), 2);
    Ok(())
}

#[test]
fn remote_update_miss_is_not_found() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let asset = write_asset(temp.path())?;
    let server = TestServer::start(&asset)?;
    let client = server.client()?;

    let mut ghost = draft("Nobody", Publisher::DcComics, "");
    ghost.id = "dc-nobody".to_string();
    let err = client.update_hero(&ghost).expect_err("expected miss");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn remote_suggest_matches_case_insensitively() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let asset = write_asset(temp.path())?;
    let server = TestServer::start(&asset)?;
    let client = server.client()?;

    let heroes = client.suggest("MAN")?;
    let names: Vec<_> = heroes.iter().map(|hero| hero.superhero.as_str()).collect();
    assert_eq!(names, vec!["Batman", "Spider-Man"]);

    assert!(client.suggest("xyz")?.is_empty());
    Ok(())
}

#[test]
fn missing_asset_serves_an_empty_catalog() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let asset = temp.path().join("absent.json");
    let server = TestServer::start(&asset)?;
    let client = server.client()?;

    assert!(client.list_heroes()?.is_empty());
    Ok(())
}
