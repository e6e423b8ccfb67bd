//! Debounced hot-reload of skill directories.
//!
//! The notification backend is used in non-recursive mode: every directory
//! under the watched roots is registered individually at start, and
//! directories created later are registered as their events arrive.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use walkdir::WalkDir;

use crate::error::SkillError;
use crate::types::SKILL_FILE_NAME;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Something that can be reloaded when skill files change.
pub trait ReloadTarget: Send + Sync + 'static {
    /// Rescan and return the number of skills now available.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the rescan.
    fn reload(&self) -> Result<usize, SkillError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Quiet period required after the last qualifying event before reloading.
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl WatcherConfig {
    /// # Errors
    ///
    /// Returns [`SkillError::Config`] for a zero debounce.
    pub fn new(debounce: Duration) -> Result<Self, SkillError> {
        if debounce.is_zero() {
            return Err(SkillError::Config("debounce must be greater than zero".into()));
        }
        Ok(Self { debounce })
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Watches skill roots and reloads a [`ReloadTarget`] after bursts of changes.
pub struct SkillWatcher {
    dirs: Vec<PathBuf>,
    config: WatcherConfig,
    target: Arc<dyn ReloadTarget>,
    cancel: Option<watch::Receiver<bool>>,
    running: Option<Running>,
}

impl SkillWatcher {
    #[must_use]
    pub fn new(target: Arc<dyn ReloadTarget>, dirs: Vec<PathBuf>, config: WatcherConfig) -> Self {
        Self {
            dirs,
            config,
            target,
            cancel: None,
            running: None,
        }
    }

    /// Stop the event loop when `cancel` flips to `true`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Register the watched directories and spawn the event loop.
    ///
    /// Missing roots are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::AlreadyRunning`] if the loop is active,
    /// [`SkillError::NoRuntime`] outside a Tokio runtime, or an error if the
    /// notification backend cannot be created.
    pub fn start(&mut self) -> Result<(), SkillError> {
        if self.is_running() {
            return Err(SkillError::AlreadyRunning);
        }
        self.running = None;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SkillError::NoRuntime)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut backend = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        })?;

        for dir in &self.dirs {
            if dir.is_dir() {
                register_tree(&mut backend, dir);
            } else {
                tracing::warn!(dir = %dir.display(), "skill directory does not exist, not watching");
            }
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let event_loop = EventLoop {
            registrar: backend,
            events: event_rx,
            target: Arc::clone(&self.target),
            debounce: self.config.debounce,
            shutdown: shutdown_rx,
            cancel: self.cancel.clone(),
        };
        let handle = runtime.spawn(event_loop.run());

        tracing::info!(
            dirs = self.dirs.len(),
            debounce_ms = self.config.debounce.as_millis(),
            "skill watcher started"
        );
        self.running = Some(Running {
            shutdown: shutdown_tx,
            handle,
        });
        Ok(())
    }

    /// Signal the event loop and wait until it has exited and released the
    /// notification backend. No reload runs after this returns.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.shutdown.send(true);
        if let Err(e) = running.handle.await {
            tracing::warn!("skill watcher task failed: {e}");
        }
        tracing::info!("skill watcher stopped");
    }
}

/// Directory registration seam over the notification backend.
trait DirRegistrar: Send + 'static {
    fn register(&mut self, dir: &Path) -> notify::Result<()>;
}

impl<W: Watcher + Send + 'static> DirRegistrar for W {
    fn register(&mut self, dir: &Path) -> notify::Result<()> {
        self.watch(dir, RecursiveMode::NonRecursive)
    }
}

/// Register `root` and every directory below it. Returns whether a skill
/// document already exists in the tree.
fn register_tree<R: DirRegistrar>(registrar: &mut R, root: &Path) -> bool {
    let mut has_skill = false;
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(root = %root.display(), "skipping unreadable entry: {e}");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            if let Err(e) = registrar.register(entry.path()) {
                tracing::warn!(dir = %entry.path().display(), "failed to watch directory: {e}");
            }
        } else if entry.file_name() == SKILL_FILE_NAME {
            has_skill = true;
        }
    }
    has_skill
}

#[derive(Debug, PartialEq, Eq)]
enum EventAction {
    Reload,
    Register(Vec<PathBuf>),
    Ignore,
}

fn classify(event: &Event) -> EventAction {
    let writes = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Any | ModifyKind::Data(_) | ModifyKind::Name(_))
    );
    if writes
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == SKILL_FILE_NAME))
    {
        return EventAction::Reload;
    }

    let may_be_new_dir = matches!(
        event.kind,
        EventKind::Create(CreateKind::Folder | CreateKind::Any)
            | EventKind::Modify(ModifyKind::Name(_))
    );
    if may_be_new_dir {
        let dirs: Vec<PathBuf> = event.paths.iter().filter(|p| p.is_dir()).cloned().collect();
        if !dirs.is_empty() {
            return EventAction::Register(dirs);
        }
    }

    EventAction::Ignore
}

struct EventLoop<R> {
    registrar: R,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    target: Arc<dyn ReloadTarget>,
    debounce: Duration,
    shutdown: watch::Receiver<bool>,
    cancel: Option<watch::Receiver<bool>>,
}

impl<R: DirRegistrar> EventLoop<R> {
    async fn run(mut self) {
        let timer = tokio::time::sleep(self.debounce);
        tokio::pin!(timer);
        let mut pending = false;

        loop {
            tokio::select! {
                () = shutdown_requested(&mut self.shutdown) => break,
                () = cancelled(self.cancel.as_mut()) => {
                    tracing::debug!("skill watcher cancelled");
                    break;
                }
                event = self.events.recv() => {
                    let Some(event) = event else { break };
                    match event {
                        Ok(event) => {
                            if self.handle_event(&event) {
                                timer.as_mut().reset(Instant::now() + self.debounce);
                                pending = true;
                            }
                        }
                        Err(e) => tracing::warn!("skill watcher error: {e}"),
                    }
                }
                () = &mut timer, if pending => {
                    pending = false;
                    self.reload().await;
                }
            }
        }
        // Dropping `self` releases the notification backend.
    }

    /// Returns true when the event should (re)arm the debounce timer.
    fn handle_event(&mut self, event: &Event) -> bool {
        match classify(event) {
            EventAction::Reload => {
                tracing::debug!(paths = ?event.paths, "skill file changed");
                true
            }
            EventAction::Register(dirs) => {
                let mut has_skill = false;
                for dir in dirs {
                    tracing::debug!(dir = %dir.display(), "watching new directory");
                    has_skill |= register_tree(&mut self.registrar, &dir);
                }
                has_skill
            }
            EventAction::Ignore => false,
        }
    }

    async fn reload(&self) {
        let target = Arc::clone(&self.target);
        match tokio::task::spawn_blocking(move || target.reload()).await {
            Ok(Ok(count)) => tracing::info!(count, "skills reloaded"),
            Ok(Err(e)) => tracing::warn!("skill reload failed: {e}"),
            Err(e) => tracing::warn!("skill reload task failed: {e}"),
        }
    }
}

async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    // Also resolves when the sender is dropped together with its `SkillWatcher`.
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn cancelled(rx: Option<&mut watch::Receiver<bool>>) {
    let Some(rx) = rx else {
        return std::future::pending().await;
    };
    if rx.wait_for(|cancel| *cancel).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use notify::event::{AccessKind, DataChange, MetadataKind, RemoveKind};

    use super::*;

    #[derive(Default)]
    struct Counter {
        reloads: AtomicUsize,
    }

    impl Counter {
        fn count(&self) -> usize {
            self.reloads.load(Ordering::SeqCst)
        }
    }

    impl ReloadTarget for Counter {
        fn reload(&self) -> Result<usize, SkillError> {
            Ok(self.reloads.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    struct Failing;

    impl ReloadTarget for Failing {
        fn reload(&self) -> Result<usize, SkillError> {
            Err(SkillError::InvalidFormat("boom".into()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        dirs: Arc<std::sync::Mutex<Vec<PathBuf>>>,
    }

    impl DirRegistrar for Recorder {
        fn register(&mut self, dir: &Path) -> notify::Result<()> {
            self.dirs.lock().unwrap().push(dir.to_path_buf());
            Ok(())
        }
    }

    fn event(kind: EventKind, path: impl Into<PathBuf>) -> Event {
        Event::new(kind).add_path(path.into())
    }

    fn skill_write() -> Event {
        event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/skills/x/SKILL.md",
        )
    }

    struct Harness {
        events: mpsc::UnboundedSender<notify::Result<Event>>,
        shutdown: watch::Sender<bool>,
        handle: JoinHandle<()>,
        registered: Arc<std::sync::Mutex<Vec<PathBuf>>>,
    }

    impl Harness {
        fn spawn(target: Arc<dyn ReloadTarget>, debounce: Duration) -> Self {
            let recorder = Recorder::default();
            let registered = Arc::clone(&recorder.dirs);
            let (events, rx) = mpsc::unbounded_channel();
            let (shutdown, shutdown_rx) = watch::channel(false);
            let handle = tokio::spawn(
                EventLoop {
                    registrar: recorder,
                    events: rx,
                    target,
                    debounce,
                    shutdown: shutdown_rx,
                    cancel: None,
                }
                .run(),
            );
            Self {
                events,
                shutdown,
                handle,
                registered,
            }
        }

        fn send(&self, event: Event) {
            self.events.send(Ok(event)).unwrap();
        }

        async fn finish(self) {
            self.shutdown.send(true).unwrap();
            self.handle.await.unwrap();
        }
    }

    #[test]
    fn classify_skill_writes() {
        assert_eq!(classify(&skill_write()), EventAction::Reload);
        assert_eq!(
            classify(&event(
                EventKind::Create(CreateKind::File),
                "/skills/x/SKILL.md"
            )),
            EventAction::Reload
        );
        assert_eq!(
            classify(&event(
                EventKind::Modify(ModifyKind::Name(notify::event::RenameMode::To)),
                "/skills/x/SKILL.md"
            )),
            EventAction::Reload
        );
    }

    #[test]
    fn classify_ignores_other_events() {
        assert_eq!(
            classify(&event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                "/skills/x/README.md"
            )),
            EventAction::Ignore
        );
        assert_eq!(
            classify(&event(
                EventKind::Remove(RemoveKind::File),
                "/skills/x/SKILL.md"
            )),
            EventAction::Ignore
        );
        assert_eq!(
            classify(&event(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                "/skills/x/SKILL.md"
            )),
            EventAction::Ignore
        );
        assert_eq!(
            classify(&event(
                EventKind::Access(AccessKind::Any),
                "/skills/x/SKILL.md"
            )),
            EventAction::Ignore
        );
    }

    #[test]
    fn classify_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("new-skill");
        std::fs::create_dir(&sub).unwrap();

        assert_eq!(
            classify(&event(EventKind::Create(CreateKind::Folder), &sub)),
            EventAction::Register(vec![sub.clone()])
        );
        // Vanished before the event was handled.
        assert_eq!(
            classify(&event(
                EventKind::Create(CreateKind::Folder),
                dir.path().join("gone")
            )),
            EventAction::Ignore
        );
    }

    #[test]
    fn register_tree_visits_every_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/scripts")).unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("a/notes.txt"), "n").unwrap();

        let mut recorder = Recorder::default();
        assert!(!register_tree(&mut recorder, dir.path()));
        let mut dirs = recorder.dirs.lock().unwrap().clone();
        dirs.sort();
        assert_eq!(
            dirs,
            vec![
                dir.path().to_path_buf(),
                dir.path().join("a"),
                dir.path().join("a/scripts"),
                dir.path().join("b"),
            ]
        );

        std::fs::write(dir.path().join("b/SKILL.md"), "---").unwrap();
        assert!(register_tree(&mut Recorder::default(), dir.path()));
    }

    #[test]
    fn zero_debounce_rejected() {
        assert!(WatcherConfig::new(Duration::ZERO).is_err());
        assert_eq!(
            WatcherConfig::new(Duration::from_millis(50)).unwrap().debounce,
            Duration::from_millis(50)
        );
        assert_eq!(WatcherConfig::default().debounce, DEFAULT_DEBOUNCE);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_coalesces_into_one_reload() {
        let counter = Arc::new(Counter::default());
        let harness = Harness::spawn(counter.clone(), Duration::from_millis(100));

        for _ in 0..10 {
            harness.send(skill_write());
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        harness.finish().await;
        assert_eq!(counter.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_reload_separately() {
        let counter = Arc::new(Counter::default());
        let harness = Harness::spawn(counter.clone(), Duration::from_millis(100));

        harness.send(skill_write());
        harness.send(skill_write());
        tokio::time::sleep(Duration::from_millis(300)).await;
        harness.send(skill_write());
        tokio::time::sleep(Duration::from_millis(300)).await;

        harness.finish().await;
        assert_eq!(counter.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn no_reload_before_quiet_period() {
        let counter = Arc::new(Counter::default());
        let harness = Harness::spawn(counter.clone(), Duration::from_millis(100));

        harness.send(skill_write());
        tokio::time::sleep(Duration::from_millis(50)).await;

        harness.finish().await;
        assert_eq!(counter.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn irrelevant_events_never_reload() {
        let counter = Arc::new(Counter::default());
        let harness = Harness::spawn(counter.clone(), Duration::from_millis(100));

        harness.send(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/skills/x/notes.md",
        ));
        harness.send(event(EventKind::Remove(RemoveKind::File), "/skills/x/SKILL.md"));
        harness.events.send(Err(notify::Error::generic("backend hiccup"))).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        harness.finish().await;
        assert_eq!(counter.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reload_keeps_loop_alive() {
        let harness = Harness::spawn(Arc::new(Failing), Duration::from_millis(100));

        harness.send(skill_write());
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!harness.handle.is_finished());

        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn new_directory_is_registered() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("late");
        std::fs::create_dir(&sub).unwrap();

        let counter = Arc::new(Counter::default());
        let harness = Harness::spawn(counter.clone(), Duration::from_millis(100));
        harness.send(event(EventKind::Create(CreateKind::Folder), &sub));
        tokio::time::sleep(Duration::from_millis(300)).await;

        let registered = harness.registered.lock().unwrap().clone();
        harness.finish().await;
        assert_eq!(registered, vec![sub]);
        assert_eq!(counter.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn new_directory_with_skill_triggers_reload() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("copied");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join(SKILL_FILE_NAME), "---").unwrap();

        let counter = Arc::new(Counter::default());
        let harness = Harness::spawn(counter.clone(), Duration::from_millis(100));
        harness.send(event(EventKind::Create(CreateKind::Folder), &sub));
        tokio::time::sleep(Duration::from_millis(300)).await;

        harness.finish().await;
        assert_eq!(counter.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_event_channel_ends_loop() {
        let harness = Harness::spawn(Arc::new(Counter::default()), Duration::from_millis(100));
        let Harness { events, handle, .. } = harness;
        drop(events);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn external_cancellation_stops_loop() {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (_events_tx, events) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown) = watch::channel(false);
        let handle = tokio::spawn(
            EventLoop {
                registrar: Recorder::default(),
                events,
                target: Arc::new(Counter::default()),
                debounce: Duration::from_millis(100),
                shutdown,
                cancel: Some(cancel_rx),
            }
            .run(),
        );

        cancel_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    async fn wait_for_reloads(counter: &Counter, expected: usize) -> bool {
        for _ in 0..60 {
            if counter.count() >= expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    fn write_skill(dir: &Path, body: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join(SKILL_FILE_NAME),
            format!("---\nname: x\ndescription: d\n---\n{body}"),
        )
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn detects_skill_file_change() {
        let root = tempfile::tempdir().unwrap();
        let skill_dir = root.path().join("x");
        write_skill(&skill_dir, "initial");

        let counter = Arc::new(Counter::default());
        let mut watcher = SkillWatcher::new(
            counter.clone(),
            vec![root.path().to_path_buf()],
            WatcherConfig::default(),
        );
        watcher.start().unwrap();
        assert!(watcher.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        write_skill(&skill_dir, "updated");

        assert!(wait_for_reloads(&counter, 1).await, "expected a reload");
        watcher.stop().await;
        assert!(!watcher.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn detects_skill_in_directory_created_after_start() {
        let root = tempfile::tempdir().unwrap();
        let counter = Arc::new(Counter::default());
        let mut watcher = SkillWatcher::new(
            counter.clone(),
            vec![root.path().to_path_buf()],
            WatcherConfig::default(),
        );
        watcher.start().unwrap();

        let late = root.path().join("late");
        std::fs::create_dir(&late).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        write_skill(&late, "hello");

        assert!(wait_for_reloads(&counter, 1).await, "expected a reload");
        watcher.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ignores_non_skill_file_change() {
        let root = tempfile::tempdir().unwrap();
        let counter = Arc::new(Counter::default());
        let mut watcher = SkillWatcher::new(
            counter.clone(),
            vec![root.path().to_path_buf()],
            WatcherConfig::default(),
        );
        watcher.start().unwrap();

        std::fs::write(root.path().join("README.md"), "content").unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        watcher.stop().await;
        assert_eq!(counter.count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_start_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let mut watcher = SkillWatcher::new(
            Arc::new(Counter::default()),
            vec![root.path().to_path_buf()],
            WatcherConfig::default(),
        );
        watcher.start().unwrap();
        assert!(matches!(watcher.start(), Err(SkillError::AlreadyRunning)));

        watcher.stop().await;
        watcher.start().unwrap();
        watcher.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn no_reload_after_stop() {
        let root = tempfile::tempdir().unwrap();
        let skill_dir = root.path().join("x");
        write_skill(&skill_dir, "v1");

        let counter = Arc::new(Counter::default());
        let mut watcher = SkillWatcher::new(
            counter.clone(),
            vec![root.path().to_path_buf()],
            WatcherConfig::default(),
        );
        watcher.start().unwrap();
        watcher.stop().await;

        write_skill(&skill_dir, "v2");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(counter.count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_root_is_not_fatal() {
        let mut watcher = SkillWatcher::new(
            Arc::new(Counter::default()),
            vec![PathBuf::from("/nonexistent/skills/xyz")],
            WatcherConfig::default(),
        );
        watcher.start().unwrap();
        assert!(watcher.is_running());
        watcher.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_without_start_is_noop() {
        let mut watcher = SkillWatcher::new(
            Arc::new(Counter::default()),
            Vec::new(),
            WatcherConfig::default(),
        );
        watcher.stop().await;
        assert!(!watcher.is_running());
    }

    #[test]
    fn start_outside_runtime_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let mut watcher = SkillWatcher::new(
            Arc::new(Counter::default()),
            vec![root.path().to_path_buf()],
            WatcherConfig::default(),
        );
        assert!(matches!(watcher.start(), Err(SkillError::NoRuntime)));
        assert!(!watcher.is_running());
    }
}
