//! Live terminal views for `--watch`.
//!
//! The loops are generic over the scanner, the ratatui backend and the event
//! source so they can be driven by a `TestBackend` and scripted events.

mod ui;

use std::future::Future;
use std::io;
use std::sync::Once;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, terminal};
use futures::StreamExt;
use portwarden_core::{Error, PortWatchState, Scanner, WatchConfig, WatchState};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::Position;
use ratatui::Terminal;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

// ============================================================================
// Terminal mode
// ============================================================================

/// Raw mode with a hidden cursor for as long as the guard lives.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn acquire() -> Result<Self> {
        install_panic_hook();

        terminal::enable_raw_mode()
            .map_err(|e| Error::Terminal(format!("Failed to enable raw mode: {}", e)))?;

        if let Err(e) = execute!(io::stdout(), cursor::Hide) {
            restore_terminal();
            return Err(Error::Terminal(format!("Failed to hide cursor: {}", e)).into());
        }

        Ok(Self { _private: () })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
        println!();
    }
}

fn restore_terminal() {
    let _ = execute!(io::stdout(), cursor::Show);
    let _ = terminal::disable_raw_mode();
}

/// Release builds abort on panic, so `Drop` never runs there.
fn install_panic_hook() {
    static INSTALLED: Once = Once::new();
    INSTALLED.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_terminal();
            previous(info);
        }));
    });
}

// ============================================================================
// Events
// ============================================================================

/// Shortest refresh period the ticker accepts.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// What wakes the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    Tick,
    Key(char),
    Interrupt,
}

/// Source of watch loop events.
pub trait EventSource {
    fn next_event(&mut self) -> impl Future<Output = WatchEvent>;
}

#[cfg(unix)]
type StopSignal = tokio::signal::unix::Signal;
#[cfg(not(unix))]
type StopSignal = std::convert::Infallible;

/// SIGINT and SIGTERM streams, registered once so a signal delivered while
/// the loop is busy scanning is still seen on the next poll.
pub struct StopSignals {
    interrupt: Option<StopSignal>,
    terminate: Option<StopSignal>,
}

impl StopSignals {
    #[cfg(unix)]
    pub fn install() -> Self {
        use tokio::signal::unix::SignalKind;

        Self {
            interrupt: listen(SignalKind::interrupt(), "SIGINT"),
            terminate: listen(SignalKind::terminate(), "SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    pub fn install() -> Self {
        Self {
            interrupt: None,
            terminate: None,
        }
    }

    /// Resolves once either signal has arrived.
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = wait_for(&mut self.interrupt) => {}
            _ = wait_for(&mut self.terminate) => {}
        }
    }
}

#[cfg(unix)]
fn listen(kind: tokio::signal::unix::SignalKind, name: &str) -> Option<StopSignal> {
    match tokio::signal::unix::signal(kind) {
        Ok(sig) => Some(sig),
        Err(e) => {
            warn!(signal = name, error = %e, "Failed to install signal handler");
            None
        }
    }
}

async fn wait_for(sig: &mut Option<StopSignal>) {
    match sig {
        #[cfg(unix)]
        Some(sig) => {
            if sig.recv().await.is_some() {
                return;
            }
            std::future::pending::<()>().await
        }
        _ => std::future::pending::<()>().await,
    }
}

/// Tick timer, keyboard, SIGINT and SIGTERM.
pub struct LiveEvents {
    ticker: Interval,
    keys: EventStream,
    keys_open: bool,
    stop: StopSignals,
}

impl LiveEvents {
    /// The first tick fires one `interval` from now.
    pub fn new(interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            ticker,
            keys: EventStream::new(),
            keys_open: true,
            stop: StopSignals::install(),
        }
    }
}

impl EventSource for LiveEvents {
    async fn next_event(&mut self) -> WatchEvent {
        loop {
            tokio::select! {
                biased;

                _ = self.stop.recv() => return WatchEvent::Interrupt,
                _ = self.ticker.tick() => return WatchEvent::Tick,
                event = self.keys.next(), if self.keys_open => match event {
                    Some(Ok(Event::Key(key))) => {
                        if let Some(event) = key_event(key) {
                            return event;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "Keyboard input unavailable");
                        self.keys_open = false;
                    }
                    None => self.keys_open = false,
                },
            }
        }
    }
}

/// Raw mode swallows SIGINT, so Ctrl+C arrives as a key.
fn key_event(key: KeyEvent) -> Option<WatchEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(WatchEvent::Interrupt)
        }
        KeyCode::Char(c) => Some(WatchEvent::Key(c)),
        _ => None,
    }
}

fn is_quit(event: WatchEvent) -> bool {
    matches!(
        event,
        WatchEvent::Interrupt | WatchEvent::Key('q') | WatchEvent::Key('Q')
    )
}

// ============================================================================
// Loops
// ============================================================================

/// Drive the all-ports view until quit.
///
/// A failed first scan is returned; later failed ticks keep the last frame.
pub async fn run_watch<S, B, E>(
    scanner: &S,
    terminal: &mut Terminal<B>,
    events: &mut E,
    state: &mut WatchState,
) -> Result<()>
where
    S: Scanner,
    B: Backend,
    E: EventSource,
{
    let interval = state.config().interval;

    let snapshot = state.refresh(scanner).await?;
    terminal.clear()?;
    terminal.draw(|f| ui::draw_watch(f, snapshot, interval))?;

    loop {
        let event = events.next_event().await;
        if is_quit(event) {
            break;
        }
        if event != WatchEvent::Tick {
            continue;
        }

        match state.refresh(scanner).await {
            Ok(snapshot) => {
                terminal.draw(|f| ui::draw_watch(f, snapshot, interval))?;
            }
            Err(e) => debug!(error = %e, "Watch tick failed, keeping previous frame"),
        }
    }

    Ok(())
}

/// Drive the single-port view until quit.
pub async fn run_port_watch<S, B, E>(
    scanner: &S,
    terminal: &mut Terminal<B>,
    events: &mut E,
    state: &mut PortWatchState,
    interval: Duration,
) -> Result<()>
where
    S: Scanner,
    B: Backend,
    E: EventSource,
{
    let frame = state.refresh(scanner).await?;
    terminal.clear()?;
    terminal.draw(|f| ui::draw_port(f, &frame, interval))?;

    loop {
        let event = events.next_event().await;
        if is_quit(event) {
            break;
        }
        if event != WatchEvent::Tick {
            continue;
        }

        match state.refresh(scanner).await {
            Ok(frame) => {
                terminal.draw(|f| ui::draw_port(f, &frame, interval))?;
            }
            Err(e) => debug!(port = state.port(), error = %e, "Port watch tick failed"),
        }
    }

    Ok(())
}

// ============================================================================
// Entry points
// ============================================================================

pub async fn watch_all<S: Scanner>(scanner: &S, config: WatchConfig) -> Result<()> {
    ensure_tty()?;
    let _guard = TerminalGuard::acquire()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let mut events = LiveEvents::new(config.interval);
    let mut state = WatchState::new(config);

    run_watch(scanner, &mut terminal, &mut events, &mut state).await?;
    park_cursor(&mut terminal)
}

pub async fn watch_port<S: Scanner>(scanner: &S, port: u16, interval: Duration) -> Result<()> {
    ensure_tty()?;
    let _guard = TerminalGuard::acquire()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let mut events = LiveEvents::new(interval);
    let mut state = PortWatchState::new(port);

    run_port_watch(scanner, &mut terminal, &mut events, &mut state, interval).await?;
    park_cursor(&mut terminal)
}

fn ensure_tty() -> Result<()> {
    if atty::is(atty::Stream::Stdout) {
        Ok(())
    } else {
        Err(Error::Terminal("--watch needs an interactive terminal".to_string()).into())
    }
}

/// Leave the final frame on screen with the shell prompt below it.
fn park_cursor<B: Backend>(terminal: &mut Terminal<B>) -> Result<()> {
    let size = terminal.size()?;
    terminal.set_cursor_position(Position::new(0, size.height.saturating_sub(1)))?;
    Ok(())
}
