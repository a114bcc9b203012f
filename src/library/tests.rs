use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tempfile::{TempDir, tempdir};

use super::display::{display_from_fields, format_duration};
use super::*;
use crate::config::{LibrarySettings, TrackDisplayField};
use crate::error::{Error, Result};

/// Reads the title from the file body and counts how often it was asked.
#[derive(Default)]
struct StubExtractor {
    probes: AtomicUsize,
}

impl MetadataExtractor for StubExtractor {
    fn supports(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("mp3")
    }

    fn probe(&self, path: &Path) -> Result<TrackMetadata> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let body = fs::read_to_string(path).map_err(|e| Error::ExtractionFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if body == "corrupt" {
            return Err(Error::ExtractionFailed {
                path: path.to_path_buf(),
                reason: "bad header".into(),
            });
        }
        Ok(TrackMetadata {
            title: Some(body),
            duration: Some(Duration::from_secs(60)),
            ..TrackMetadata::default()
        })
    }
}

struct Fixture {
    _home: TempDir,
    music: TempDir,
    extractor: Arc<StubExtractor>,
    registry: LibraryRegistry,
}

impl Fixture {
    fn new() -> Self {
        let home = tempdir().unwrap();
        let music = tempdir().unwrap();
        let extractor = Arc::new(StubExtractor::default());
        let scanner = Scanner::new(LibrarySettings::default(), extractor.clone());
        let registry =
            LibraryRegistry::open(LibraryStore::new(home.path().join("libraries")), scanner).unwrap();
        Self {
            _home: home,
            music,
            extractor,
            registry,
        }
    }

    fn add(&self, rel: &str, title: &str) -> PathBuf {
        let p = self.music.path().join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(&p, title).unwrap();
        p.canonicalize().unwrap()
    }

    fn reopen(&self) -> LibraryRegistry {
        let scanner = Scanner::new(LibrarySettings::default(), self.extractor.clone());
        LibraryRegistry::open(
            LibraryStore::new(self._home.path().join("libraries")),
            scanner,
        )
        .unwrap()
    }
}

fn report(added: usize, removed: usize, unchanged: usize) -> RescanReport {
    RescanReport {
        added,
        removed,
        unchanged,
    }
}

#[test]
fn create_update_delete_scenario() {
    let mut fx = Fixture::new();

    fx.registry.create("main", fx.music.path()).unwrap();
    let listed = fx.registry.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "main");
    assert_eq!(listed[0].track_count, 0);

    fx.add("a.mp3", "A");
    let b = fx.add("sub/b.mp3", "B");
    fx.add("sub/deeper/c.mp3", "C");
    fx.add("cover.jpg", "not audio");
    assert_eq!(fx.registry.update("main").unwrap(), report(3, 0, 0));

    fs::remove_file(&b).unwrap();
    assert_eq!(fx.registry.update("main").unwrap(), report(0, 1, 2));
    assert_eq!(fx.registry.list()[0].track_count, 2);

    fx.registry.delete("main").unwrap();
    assert!(fx.registry.list().is_empty());
    assert!(matches!(fx.registry.get("main"), Err(Error::LibraryNotFound(_))));
    assert!(fx.reopen().list().is_empty());
}

#[test]
fn rescan_is_idempotent() {
    let mut fx = Fixture::new();
    fx.add("a.mp3", "A");
    fx.add("b.mp3", "B");
    let lib = fx.registry.create("main", fx.music.path()).unwrap();
    let before = lib.read().clone();
    let probes = fx.extractor.probes.load(Ordering::SeqCst);

    assert_eq!(fx.registry.update("main").unwrap(), report(0, 0, 2));
    assert_eq!(*lib.read(), before);
    // Unchanged files are not probed again.
    assert_eq!(fx.extractor.probes.load(Ordering::SeqCst), probes);
}

#[test]
fn rescan_preserves_history() {
    let mut fx = Fixture::new();
    let a = fx.add("a.mp3", "A");
    let lib = fx.registry.create("main", fx.music.path()).unwrap();

    let at = UNIX_EPOCH + Duration::from_secs(1_000);
    lib.record_played(&a, at).unwrap();
    lib.toggle_favourite(&a).unwrap();
    fx.add("new.mp3", "New");

    assert_eq!(fx.registry.update("main").unwrap(), report(1, 0, 1));
    let index = lib.read();
    let track = index.get(&a).unwrap();
    assert_eq!(track.play_count, 1);
    assert!(track.favourite);
    assert_eq!(track.last_played, Some(at));
}

#[test]
fn extraction_failure_falls_back_to_filename() {
    let mut fx = Fixture::new();
    let p = fx.add("Broken Song.mp3", "corrupt");
    let lib = fx.registry.create("main", fx.music.path()).unwrap();

    let index = lib.read();
    let track = index.get(&p).unwrap();
    assert_eq!(track.title, None);
    assert_eq!(track.duration, None);
    assert_eq!(track.display_title(), "Broken Song");
}

#[test]
fn paths_are_unique_and_under_root() {
    let mut fx = Fixture::new();
    fx.add("x/1.mp3", "1");
    fx.add("y/1.mp3", "1");
    fx.add("1.mp3", "1");
    let lib = fx.registry.create("main", fx.music.path()).unwrap();
    fx.registry.update("main").unwrap();

    let index = lib.read();
    let paths: Vec<&PathBuf> = index.tracks().map(|t| &t.path).collect();
    let mut dedup = paths.clone();
    dedup.dedup();
    assert_eq!(paths.len(), 3);
    assert_eq!(paths, dedup);
    assert!(paths.iter().all(|p| p.starts_with(index.root())));
}

#[test]
fn registry_survives_reopen() {
    let mut fx = Fixture::new();
    let a = fx.add("a.mp3", "A");
    let lib = fx.registry.create("main", fx.music.path()).unwrap();
    lib.record_played(&a, SystemTime::now()).unwrap();

    let reopened = fx.reopen();
    let again = reopened.get("main").unwrap();
    assert_eq!(*again.read(), *lib.read());
}

#[test]
fn create_rejects_duplicates_bad_roots_and_bad_names() {
    let mut fx = Fixture::new();
    fx.registry.create("main", fx.music.path()).unwrap();

    assert!(matches!(
        fx.registry.create("main", fx.music.path()),
        Err(Error::AlreadyExists(_))
    ));

    let file = fx.add("file.mp3", "x");
    assert!(matches!(
        fx.registry.create("other", &file),
        Err(Error::InvalidRoot(_))
    ));
    assert!(matches!(
        fx.registry.create("other", &fx.music.path().join("missing")),
        Err(Error::InvalidRoot(_))
    ));

    for bad in ["", "  ", ".hidden", "a/b", "..", "a\\b"] {
        assert!(
            matches!(fx.registry.create(bad, fx.music.path()), Err(Error::InvalidName(_))),
            "{bad:?} should be rejected"
        );
    }
    assert_eq!(fx.registry.list().len(), 1);
}

#[test]
fn delete_and_update_of_unknown_library_fail() {
    let mut fx = Fixture::new();
    assert!(matches!(fx.registry.delete("nope"), Err(Error::LibraryNotFound(_))));
    assert!(matches!(fx.registry.update("nope"), Err(Error::LibraryNotFound(_))));
}

#[test]
fn list_is_sorted_by_name() {
    let mut fx = Fixture::new();
    for name in ["zeta", "alpha", "mid"] {
        fx.registry.create(name, fx.music.path()).unwrap();
    }
    let names: Vec<String> = fx.registry.list().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
}

#[test]
fn interrupted_update_leaves_index_untouched() {
    let mut fx = Fixture::new();
    fx.add("a.mp3", "A");
    let lib = fx.registry.create("main", fx.music.path()).unwrap();
    let before = lib.read().clone();
    fx.add("b.mp3", "B");

    let cancel = AtomicBool::new(true);
    let err = fx
        .registry
        .update_with_cancel("main", Some(&cancel))
        .unwrap_err();
    assert!(matches!(err, Error::ScanInterrupted(_)));
    assert_eq!(*lib.read(), before);
}

#[test]
fn apply_rescan_keeps_history_written_after_planning() {
    let mut fx = Fixture::new();
    let a = fx.add("a.mp3", "A");
    let lib = fx.registry.create("main", fx.music.path()).unwrap();
    fx.add("b.mp3", "B");

    let plan = lib.read().plan_rescan(fx.registry.scanner(), None).unwrap();
    lib.record_played(&a, SystemTime::now()).unwrap();

    let mut index = lib.read().clone();
    assert_eq!(index.apply_rescan(plan), report(1, 0, 1));
    assert_eq!(index.get(&a).unwrap().play_count, 1);
}

/// Parks inside `probe` until the test lets it go.
struct GatedExtractor {
    started: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl MetadataExtractor for GatedExtractor {
    fn supports(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("mp3")
    }

    fn probe(&self, _path: &Path) -> Result<TrackMetadata> {
        let _ = self.started.lock().unwrap().send(());
        let _ = self
            .release
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(10));
        Ok(TrackMetadata::default())
    }
}

#[test]
fn history_writes_are_not_blocked_by_a_running_update() {
    let mut fx = Fixture::new();
    let old = fx.add("old.mp3", "Old");
    let lib = fx.registry.create("main", fx.music.path()).unwrap();
    fx.add("new.mp3", "New");

    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let gated = Scanner::new(
        LibrarySettings::default(),
        Arc::new(GatedExtractor {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        }),
    );

    thread::scope(|s| {
        let (lib, gated, old) = (&lib, &gated, &old);
        let updating = s.spawn(move || lib.update(gated, None));
        started_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("update reached the new file");

        let (done_tx, done_rx) = mpsc::channel();
        s.spawn(move || {
            let _ = done_tx.send(lib.toggle_favourite(old));
        });
        let toggled = done_rx.recv_timeout(Duration::from_secs(5));
        release_tx.send(()).unwrap();

        let toggled = toggled.expect("toggle finished while the update was walking");
        assert!(toggled.unwrap().favourite);
        assert_eq!(updating.join().unwrap().unwrap(), report(1, 0, 1));
    });

    let reopened = fx.reopen().get("main").unwrap();
    assert!(reopened.read().get(&old).unwrap().favourite);
    assert_eq!(reopened.read().len(), 2);
}

#[test]
fn unreadable_library_is_listed_and_deletable() {
    let mut fx = Fixture::new();
    fx.add("a.mp3", "A");
    fx.registry.create("good", fx.music.path()).unwrap();
    let dir = fx._home.path().join("libraries");
    fs::write(dir.join("broken.toml"), "this is = = not toml").unwrap();
    fs::write(dir.join("future.toml"), "version = 99\nroot = \"/m\"\n").unwrap();

    let mut registry = fx.reopen();
    let listed = registry.list();
    let names: Vec<&str> = listed.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, ["broken", "future", "good"]);
    assert!(listed[0].problem.is_some());
    assert!(listed[0].root.is_none());
    assert!(listed[1].problem.as_deref().unwrap().contains("99"));
    assert_eq!(listed[2].problem, None);
    assert_eq!(listed[2].track_count, 1);

    assert!(matches!(registry.get("broken"), Err(Error::Unreadable { .. })));
    assert!(matches!(registry.update("future"), Err(Error::Unreadable { .. })));
    assert!(matches!(
        registry.create("broken", fx.music.path()),
        Err(Error::AlreadyExists(_))
    ));

    registry.delete("broken").unwrap();
    assert!(!dir.join("broken.toml").exists());
    assert_eq!(registry.list().len(), 2);
    assert_eq!(registry.get("good").unwrap().read().len(), 1);
}

#[cfg(target_os = "linux")]
#[test]
fn create_skips_file_names_that_are_not_utf8() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let mut fx = Fixture::new();
    fx.add("good.mp3", "Good");
    fs::write(fx.music.path().join(OsStr::from_bytes(b"caf\xe9.mp3")), "Cafe").unwrap();

    let lib = fx.registry.create("main", fx.music.path()).unwrap();
    assert_eq!(lib.read().len(), 1);
    assert_eq!(fx.registry.update("main").unwrap(), report(0, 0, 1));
    assert_eq!(fx.reopen().get("main").unwrap().read().len(), 1);
}

#[test]
fn apply_played_and_toggle_favourite_on_index() {
    let root = PathBuf::from("/music");
    let p = root.join("a.mp3");
    let mut index =
        LibraryIndex::from_tracks(root.clone(), [Track::new(p.clone(), TrackMetadata::default())]);

    let later = UNIX_EPOCH + Duration::from_secs(200);
    let earlier = UNIX_EPOCH + Duration::from_secs(100);
    index.apply_played(&p, later).unwrap();
    let t = index.apply_played(&p, earlier).unwrap();
    assert_eq!(t.play_count, 2);
    // last_played never moves backwards.
    assert_eq!(t.last_played, Some(later));

    assert!(index.toggle_favourite(&p).unwrap().favourite);
    assert_eq!(index.favourites().count(), 1);
    assert!(!index.toggle_favourite(&p).unwrap().favourite);

    let missing = root.join("missing.mp3");
    assert!(matches!(index.get(&missing), Err(Error::TrackNotFound(_))));
    assert!(matches!(
        index.apply_played(&missing, later),
        Err(Error::TrackNotFound(_))
    ));
    assert!(matches!(
        index.toggle_favourite(&missing),
        Err(Error::TrackNotFound(_))
    ));
}

fn track(title: Option<&str>, artist: Option<&str>) -> Track {
    Track::new(
        PathBuf::from("/tmp/Song File.mp3"),
        TrackMetadata {
            title: title.map(String::from),
            artist: artist.map(String::from),
            album: Some("Album".into()),
            ..TrackMetadata::default()
        },
    )
}

#[test]
fn display_from_fields_can_format_artist_title() {
    let fields = [TrackDisplayField::Artist, TrackDisplayField::Title];
    assert_eq!(
        display_from_fields(&track(Some("Song"), Some("Artist")), &fields, " - "),
        "Artist - Song"
    );
    assert_eq!(
        display_from_fields(&track(Some("Song"), Some("  Artist  ")), &fields, " - "),
        "Artist - Song"
    );
    assert_eq!(
        display_from_fields(&track(Some("Song"), None), &fields, " - "),
        "Song"
    );
    assert_eq!(
        display_from_fields(&track(None, None), &fields, " - "),
        "Song File"
    );
    assert_eq!(
        display_from_fields(
            &track(Some("Song"), None),
            &[TrackDisplayField::Filename, TrackDisplayField::Album],
            " | "
        ),
        "Song File.mp3 | Album"
    );
}

#[test]
fn format_duration_is_minutes_and_seconds() {
    assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
    assert_eq!(format_duration(Duration::from_secs(65)), "1:05");
    assert_eq!(format_duration(Duration::from_millis(599_600)), "10:00");
}
