//! Standalone daemon: tick loop, control socket and shutdown handling
//!
//! All engine mutation happens on the tick thread. The control listener only
//! forwards requests over a channel and waits for the reply.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::classifier::{AllianceZones, Classifier};
use crate::config::Configuration;
use crate::engine::Engine;
use crate::host::{FileHost, Host, LiveSettings};
use crate::ipc::{self, ControlRequest, ControlResponse, ControlServer, Envelope};
use crate::persistence::{JsonFilePersister, Persist};

/// Resolved runtime options for `run`
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub config_path: PathBuf,
    pub host_state_path: PathBuf,
    pub zones_path: Option<PathBuf>,
    pub socket_path: PathBuf,
    pub tick: Duration,
}

fn load_zones(path: Option<&PathBuf>) -> AllianceZones {
    let Some(path) = path else {
        warn!("No zone table given, alliance-like zones will not be detected");
        return AllianceZones::default();
    };

    match AllianceZones::load(path) {
        Ok(zones) => {
            if zones.is_empty() {
                warn!(path = %path.display(), "Zone table lists no alliance-like zones");
            }
            zones
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = ?e,
                "Failed to load zone table, continuing without it"
            );
            AllianceZones::default()
        }
    }
}

fn register_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        signal_hook::flag::register(SIGINT, Arc::clone(&shutdown))
            .context("Failed to register SIGINT handler")?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&shutdown))
            .context("Failed to register SIGTERM handler")?;
    }
    Ok(shutdown)
}

/// Poll the host snapshot until it reports every tracked setting.
/// Returns false when shutdown is requested first.
fn wait_for_live_settings(host: &mut FileHost, shutdown: &AtomicBool, poll: Duration) -> bool {
    let mut announced = false;
    loop {
        host.refresh();
        let unreadable = host.unreadable();
        if unreadable.is_empty() {
            return true;
        }
        if !announced {
            warn!(
                path = %host.path().display(),
                unreadable = ?unreadable,
                "Waiting for the host to report every tracked setting"
            );
            announced = true;
        }
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        thread::sleep(poll);
    }
}

/// Open the host, then load or seed the configuration. Nothing is seeded or
/// written until the host reports every tracked setting, so Backup always
/// holds the user's real values. `None` when shutdown came first.
fn start(
    options: &DaemonOptions,
    shutdown: &AtomicBool,
) -> Result<Option<(FileHost, Engine<JsonFilePersister>)>> {
    let mut host = FileHost::open(options.host_state_path.clone());
    if !wait_for_live_settings(&mut host, shutdown, options.tick) {
        return Ok(None);
    }

    let config = Configuration::load_or_seed(&options.config_path, &host)?;
    let classifier = Classifier::new(load_zones(options.zones_path.as_ref()));
    let persister = JsonFilePersister::new(options.config_path.clone());
    Ok(Some((host, Engine::new(config, classifier, persister))))
}

/// One pass of the daemon loop: pick up host changes, serve queued requests,
/// reconcile, then write back what changed
fn tick<P: Persist>(engine: &mut Engine<P>, host: &mut FileHost, requests: &Receiver<Envelope>) {
    host.refresh();

    while let Ok(envelope) = requests.try_recv() {
        let response = handle_request(engine, host, envelope.request);
        if envelope.reply.send(response).is_err() {
            debug!("Control client went away before the reply");
        }
    }

    engine.on_update(host);

    if let Err(e) = host.flush() {
        error!(path = %host.path().display(), error = ?e, "Failed to flush host snapshot");
    }
}

/// Put the backup values back and make sure they reach the host file
fn finish<P: Persist>(engine: &mut Engine<P>, host: &mut FileHost) -> Result<()> {
    host.refresh();
    engine.restore(host);
    host.flush().context("Failed to write restored settings")
}

/// Run the daemon until SIGINT/SIGTERM
pub fn run(options: DaemonOptions) -> Result<()> {
    info!(options = ?options, "Starting daemon");

    let shutdown = register_shutdown_flag()?;

    let Some((mut host, mut engine)) = start(&options, &shutdown)? else {
        info!("Shutdown requested before the host reported its settings");
        return Ok(());
    };

    let server = ControlServer::bind_to(options.socket_path.clone())?;
    let (request_tx, request_rx) = mpsc::channel::<Envelope>();
    let _listener = ipc::spawn_listener(&server, request_tx)?;
    info!(socket = %server.path().display(), "Control socket ready");

    while !shutdown.load(Ordering::Relaxed) {
        tick(&mut engine, &mut host, &request_rx);
        thread::sleep(options.tick);
    }

    info!("Shutdown requested, restoring backup settings");
    finish(&mut engine, &mut host)?;

    // server drops here and removes the socket
    drop(server);
    info!("Daemon stopped");
    Ok(())
}

/// Dispatch one control request on the tick thread
pub fn handle_request<P: Persist, H: Host + ?Sized>(
    engine: &mut Engine<P>,
    host: &mut H,
    request: ControlRequest,
) -> ControlResponse {
    match request {
        ControlRequest::Ping => ControlResponse::Pong,
        ControlRequest::Status => ControlResponse::Status(engine.status(&*host)),
        ControlRequest::GetConfig => ControlResponse::Config(engine.config().clone()),
        ControlRequest::SetEnabled(enabled) => ControlResponse::Updated {
            changed: engine.set_enabled(enabled),
        },
        ControlRequest::ToggleVisible => ControlResponse::Visible(engine.toggle_visible()),
        ControlRequest::UpdateProfile {
            category,
            patch,
            active,
        } => ControlResponse::Updated {
            changed: engine.submit_patch(host, category, &patch, active),
        },
        ControlRequest::UpdateDebug(patch) => ControlResponse::Updated {
            changed: engine.apply_debug(&patch),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BundlePatch, DebugPatch};
    use crate::host::fake::FakeHost;
    use crate::persistence::RecordingPersister;
    use crate::types::{BattleEffect, Category, NameplateVisibility, SettingField, SettingValue};
    use serde_json::{Value, json};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn setup() -> (Engine<RecordingPersister>, FakeHost) {
        let host = FakeHost::uniform(BattleEffect::All, NameplateVisibility::Always);
        let config = Configuration::seeded_from(&host);
        let engine = Engine::new(
            config,
            Classifier::new(AllianceZones::default()),
            RecordingPersister::default(),
        );
        (engine, host)
    }

    #[test]
    fn test_ping() {
        let (mut engine, mut host) = setup();
        assert_eq!(
            handle_request(&mut engine, &mut host, ControlRequest::Ping),
            ControlResponse::Pong
        );
    }

    #[test]
    fn test_status_reports_solo() {
        let (mut engine, mut host) = setup();
        let response = handle_request(&mut engine, &mut host, ControlRequest::Status);
        let ControlResponse::Status(report) = response else {
            panic!("expected status");
        };
        assert!(report.enabled);
        assert_eq!(report.category, Category::Solo);
        assert_eq!(report.active_profile, Category::Solo);
        assert!(!report.in_duty);
    }

    #[test]
    fn test_set_enabled_reports_change_once() {
        let (mut engine, mut host) = setup();
        assert_eq!(
            handle_request(&mut engine, &mut host, ControlRequest::SetEnabled(false)),
            ControlResponse::Updated { changed: true }
        );
        assert_eq!(
            handle_request(&mut engine, &mut host, ControlRequest::SetEnabled(false)),
            ControlResponse::Updated { changed: false }
        );
        assert!(!engine.config().enabled);
        assert_eq!(engine.persister().saves, 1);
    }

    #[test]
    fn test_toggle_visible() {
        let (mut engine, mut host) = setup();
        assert_eq!(
            handle_request(&mut engine, &mut host, ControlRequest::ToggleVisible),
            ControlResponse::Visible(false)
        );
        assert_eq!(
            handle_request(&mut engine, &mut host, ControlRequest::ToggleVisible),
            ControlResponse::Visible(true)
        );
    }

    #[test]
    fn test_active_profile_update_is_pushed() {
        let (mut engine, mut host) = setup();
        engine.on_update(&mut host);
        host.take_writes();

        let request = ControlRequest::UpdateProfile {
            category: Category::Solo,
            patch: BundlePatch {
                effect_other: Some(BattleEffect::None),
                ..BundlePatch::default()
            },
            active: true,
        };
        assert_eq!(
            handle_request(&mut engine, &mut host, request),
            ControlResponse::Updated { changed: true }
        );
        assert_eq!(
            host.value(SettingField::EffectOther),
            Some(SettingValue::Effect(BattleEffect::None))
        );
    }

    #[test]
    fn test_inactive_profile_update_is_only_stored() {
        let (mut engine, mut host) = setup();
        engine.on_update(&mut host);
        host.take_writes();

        let request = ControlRequest::UpdateProfile {
            category: Category::Alliance,
            patch: BundlePatch {
                nameplate_others: Some(NameplateVisibility::Never),
                ..BundlePatch::default()
            },
            active: false,
        };
        handle_request(&mut engine, &mut host, request);

        assert!(host.take_writes().is_empty());
        assert_eq!(
            engine.config().profiles.alliance.nameplate_others,
            NameplateVisibility::Never
        );
    }

    #[test]
    fn test_debug_update() {
        let (mut engine, mut host) = setup();
        let patch = DebugPatch {
            force_party_size: Some(true),
            party_size: Some(-4),
            ..DebugPatch::default()
        };
        assert_eq!(
            handle_request(&mut engine, &mut host, ControlRequest::UpdateDebug(patch)),
            ControlResponse::Updated { changed: true }
        );
        assert_eq!(engine.config().debug.party_size, 0);
    }

    #[test]
    fn test_get_config_returns_copy() {
        let (mut engine, mut host) = setup();
        let response = handle_request(&mut engine, &mut host, ControlRequest::GetConfig);
        let ControlResponse::Config(config) = response else {
            panic!("expected config");
        };
        assert_eq!(&config, engine.config());
    }

    fn options(dir: &TempDir) -> DaemonOptions {
        DaemonOptions {
            config_path: dir.path().join("config.json"),
            host_state_path: dir.path().join("host.json"),
            zones_path: None,
            socket_path: dir.path().join("control.sock"),
            tick: Duration::from_millis(10),
        }
    }

    // Host file with every tracked setting at `raw` and a solo player
    fn write_host(path: &Path, raw: u32) {
        let settings: serde_json::Map<String, Value> = SettingField::ALL
            .iter()
            .map(|field| (field.key().to_string(), json!(raw)))
            .collect();
        let doc = json!({ "settings": settings, "group": { "member_count": 1 } });
        fs::write(path, doc.to_string()).unwrap();
    }

    fn host_setting(path: &Path, field: SettingField) -> Option<u64> {
        let doc: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        doc["settings"][field.key()].as_u64()
    }

    fn bridge_edit(path: &Path, field: SettingField, raw: u32) {
        let mut doc: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        doc["settings"][field.key()] = json!(raw);
        fs::write(path, doc.to_string()).unwrap();
    }

    #[test]
    fn test_start_does_not_seed_without_host_snapshot() {
        let dir = TempDir::new().unwrap();
        let options = options(&dir);
        let shutdown = AtomicBool::new(true);

        assert!(start(&options, &shutdown).unwrap().is_none());
        assert!(!options.config_path.exists());
    }

    #[test]
    fn test_start_seeds_backup_once_host_appears() {
        let dir = TempDir::new().unwrap();
        let options = options(&dir);
        let host_path = options.host_state_path.clone();
        let bridge = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            write_host(&host_path, 2);
        });

        let shutdown = AtomicBool::new(false);
        let (mut host, mut engine) = start(&options, &shutdown).unwrap().unwrap();
        bridge.join().unwrap();

        let backup = &engine.config().profiles.backup;
        assert_eq!(backup.effect_self, BattleEffect::None);
        assert_eq!(backup.nameplate_own, NameplateVisibility::WhenTargeted);
        assert!(options.config_path.exists());

        // shutdown puts the captured originals back
        finish(&mut engine, &mut host).unwrap();
        assert_eq!(host_setting(&options.host_state_path, SettingField::EffectSelf), Some(2));
    }

    #[test]
    fn test_tick_pushes_pulls_and_shutdown_restores_backup() {
        let dir = TempDir::new().unwrap();
        let options = options(&dir);
        write_host(&options.host_state_path, 0);
        let mut config = Configuration::default();
        config.profiles.solo.effect_other = BattleEffect::Limited;
        config.save_to(&options.config_path).unwrap();

        let shutdown = AtomicBool::new(false);
        let (mut host, mut engine) = start(&options, &shutdown).unwrap().unwrap();
        let (_tx, rx) = mpsc::channel::<Envelope>();

        tick(&mut engine, &mut host, &rx);
        assert_eq!(host_setting(&options.host_state_path, SettingField::EffectOther), Some(1));

        // user edit through the host lands in the active profile and on disk
        bridge_edit(&options.host_state_path, SettingField::EffectParty, 2);
        tick(&mut engine, &mut host, &rx);
        let saved = Configuration::load(&options.config_path).unwrap().unwrap();
        assert_eq!(saved.profiles.solo.effect_party, BattleEffect::None);
        assert_eq!(host_setting(&options.host_state_path, SettingField::EffectParty), Some(2));

        finish(&mut engine, &mut host).unwrap();
        let backup = &engine.config().profiles.backup;
        for field in SettingField::ALL {
            assert_eq!(
                host_setting(&options.host_state_path, field),
                Some(u64::from(backup.get(field).raw())),
                "{field:?}"
            );
        }
    }

    #[test]
    fn test_tick_serves_queued_requests() {
        let dir = TempDir::new().unwrap();
        let options = options(&dir);
        write_host(&options.host_state_path, 0);
        let mut config = Configuration::default();
        config.profiles.solo.effect_other = BattleEffect::None;
        config.save_to(&options.config_path).unwrap();

        let shutdown = AtomicBool::new(false);
        let (mut host, mut engine) = start(&options, &shutdown).unwrap().unwrap();
        let (tx, rx) = mpsc::channel::<Envelope>();
        tick(&mut engine, &mut host, &rx);
        assert_eq!(host_setting(&options.host_state_path, SettingField::EffectOther), Some(2));

        let (reply_tx, reply_rx) = mpsc::channel();
        tx.send(Envelope {
            request: ControlRequest::SetEnabled(false),
            reply: reply_tx,
        })
        .unwrap();
        tick(&mut engine, &mut host, &rx);

        assert_eq!(reply_rx.try_recv().unwrap(), ControlResponse::Updated { changed: true });
        assert_eq!(host_setting(&options.host_state_path, SettingField::EffectOther), Some(0));
        assert!(!Configuration::load(&options.config_path).unwrap().unwrap().enabled);
    }
}
