//! Watch mode: spawns the push-channel session and the polling backstop,
//! then runs the terminal event loop until the operator quits.

use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures_util::StreamExt;
use parking_lot::Mutex;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::{mpsc, Notify};

use crate::client::commands::CommandClient;
use crate::client::live::LiveConnection;
use crate::client::poller::PollingScheduler;
use crate::client::router::{MessageRouter, RefreshHandle};
use crate::client::Redraw;
use crate::config::Config;
use crate::state::{FilterSet, LogBuffer, Severity, SharedLog, SharedStore, SnapshotStore};
use crate::ui;

const REPAINT_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy)]
enum HotCommand {
    Stop,
    Pause,
    Resume,
}

impl HotCommand {
    fn label(self) -> &'static str {
        match self {
            HotCommand::Stop => "STOP",
            HotCommand::Pause => "PAUSE",
            HotCommand::Resume => "RESUME",
        }
    }
}

pub async fn run(config: Config) -> Result<()> {
    let store: SharedStore = Arc::new(Mutex::new(SnapshotStore::default()));
    let logs: SharedLog = Arc::new(Mutex::new(LogBuffer::new(config.log_capacity)));
    let redraw: Redraw = Arc::new(Notify::new());
    let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();

    let router = MessageRouter::new(
        store.clone(),
        logs.clone(),
        RefreshHandle::new(refresh_tx, config.refresh_delay),
        redraw.clone(),
    );
    let live = LiveConnection::new(
        config.push_url()?,
        config.reconnect_delay,
        router,
        logs.clone(),
    );
    tokio::spawn(live.run());

    let poller = PollingScheduler::new(
        &config.server_base,
        store.clone(),
        redraw.clone(),
        config.poll_interval,
    );
    tokio::spawn(poller.run(refresh_rx));

    let mut app = App {
        store,
        logs,
        redraw,
        commands: CommandClient::new(config.server_base.clone()),
        filters: FilterSet::default(),
        selected: 0,
    };
    app.run_tui().await
}

struct App {
    store: SharedStore,
    logs: SharedLog,
    redraw: Redraw,
    commands: CommandClient,
    filters: FilterSet,
    selected: usize,
}

impl App {
    async fn run_tui(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut out = std::io::stdout();
        execute!(out, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(out))?;

        let result = self.event_loop(&mut terminal).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> Result<()> {
        let mut input = EventStream::new();
        let mut repaint = tokio::time::interval(REPAINT_INTERVAL);
        let redraw = self.redraw.clone();

        loop {
            self.draw(terminal)?;

            tokio::select! {
                _ = redraw.notified() => {}
                _ = repaint.tick() => {}
                maybe_event = input.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            if self.handle_key(key) == Flow::Quit {
                                return Ok(());
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => return Err(err.into()),
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    fn draw(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let store = self.store.lock();
        let logs = self.logs.lock();
        let visible = ui::visible_channels(store.channels(), &self.filters).len();
        if self.selected >= visible {
            self.selected = visible.saturating_sub(1);
        }
        let selected = self.selected;
        let filters = self.filters;
        terminal.draw(|frame| ui::draw(frame, &store, &logs, &filters, selected))?;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Flow::Quit;
            }
            KeyCode::Char('1') => self.filters.running = !self.filters.running,
            KeyCode::Char('2') => self.filters.standby = !self.filters.standby,
            KeyCode::Char('3') => self.filters.alarm = !self.filters.alarm,
            KeyCode::Char('4') => self.filters.offline = !self.filters.offline,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = self.selected.saturating_add(1),
            KeyCode::Char('c') => self.logs.lock().clear(),
            KeyCode::Char('x') => self.issue_channel_command(HotCommand::Stop),
            KeyCode::Char('p') => self.issue_channel_command(HotCommand::Pause),
            KeyCode::Char('r') => self.issue_channel_command(HotCommand::Resume),
            KeyCode::Char('g') => self.issue_status_request(),
            _ => {}
        }
        Flow::Continue
    }

    fn selected_channel(&self) -> Option<String> {
        let store = self.store.lock();
        ui::visible_channels(store.channels(), &self.filters)
            .get(self.selected)
            .map(|channel| channel.channel_id.clone())
    }

    fn issue_channel_command(&self, command: HotCommand) {
        let Some(channel) = self.selected_channel() else {
            self.logs
                .lock()
                .push("error", "no channel selected", Severity::Error);
            self.redraw.notify_one();
            return;
        };
        let commands = self.commands.clone();
        let logs = self.logs.clone();
        let redraw = self.redraw.clone();
        tokio::spawn(async move {
            let label = command.label();
            let result = match command {
                HotCommand::Stop => commands.stop(&channel).await,
                HotCommand::Pause => commands.pause(&channel).await,
                HotCommand::Resume => commands.resume(&channel).await,
            };
            match result {
                Ok(()) => logs.lock().push(
                    "command",
                    format!("{label} sent to {channel}"),
                    Severity::Success,
                ),
                Err(err) => logs.lock().push(
                    "error",
                    format!("{label} {channel}: {err}"),
                    Severity::Error,
                ),
            }
            redraw.notify_one();
        });
    }

    fn issue_status_request(&self) {
        let commands = self.commands.clone();
        let logs = self.logs.clone();
        let redraw = self.redraw.clone();
        tokio::spawn(async move {
            match commands.request_status().await {
                Ok(()) => logs
                    .lock()
                    .push("command", "RSP_STATUS sent", Severity::Success),
                Err(err) => logs
                    .lock()
                    .push("error", format!("RSP_STATUS: {err}"), Severity::Error),
            }
            redraw.notify_one();
        });
    }
}
