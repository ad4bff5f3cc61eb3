pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use codetype::{
    app_dirs::AppDirs,
    codec::{decode_result, encode_result, DecodedResult},
    config::{Config, ConfigStore, FileConfigStore},
    game::Game,
    history::{HistoryEntry, HistorySink, SessionHistory},
    prompts::{Catalogue, FixedTarget, Prompt, TargetProvider},
    runtime::{Clock, CrosstermEventSource, FixedTicker, GameEvent, MonotonicClock, Runner},
    score::{Difficulty, ScoringMode},
    session::RunId,
    submit::{LocalScoreService, Scored, Submitter},
};
use crossterm::{
    event::{
        DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    sync::Mutex,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 100;

/// type code snippets keystroke-for-keystroke and get scored on speed, accuracy and rhythm
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal typing game for code: reproduce a snippet exactly, fix every mistake before moving on, and get a score that rewards speed, accuracy, difficulty and a steady rhythm."
)]
pub struct Cli {
    /// snippet length in lines
    #[clap(short = 'l', long, value_parser = clap::value_parser!(u8).range(1..=3))]
    lines: Option<u8>,

    /// snippet difficulty
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// scoring formula: plain cWPM x accuracy, or with difficulty/consistency multipliers
    #[clap(long, value_enum)]
    scoring: Option<ScoringMode>,

    /// custom snippet to type instead of the built-in catalogue
    #[clap(short = 'p', long)]
    prompt: Option<String>,
}

impl Cli {
    /// CLI flags win over stored preferences
    fn merge_into(&self, mut config: Config) -> Config {
        if let Some(lines) = self.lines {
            config.lines = lines;
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(scoring) = self.scoring {
            config.scoring_mode = scoring;
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Typing,
    Results,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Quit,
    Restart,
    NewSnippet,
    CycleLines,
    CycleDifficulty,
    ToggleScoring,
    ShowHistory,
    CloseHistory,
    HistoryUp,
    HistoryDown,
    DeleteEntry,
    ClearHistory,
}

/// Global shortcuts, checked before a key reaches the game.
const SHORTCUTS: &[(KeyModifiers, KeyCode, Command)] = &[
    (KeyModifiers::NONE, KeyCode::Esc, Command::Quit),
    (KeyModifiers::CONTROL, KeyCode::Char('q'), Command::Quit),
    (KeyModifiers::CONTROL, KeyCode::Char('r'), Command::Restart),
    (KeyModifiers::CONTROL, KeyCode::Char('n'), Command::NewSnippet),
    (KeyModifiers::CONTROL, KeyCode::Char('l'), Command::CycleLines),
    (KeyModifiers::CONTROL, KeyCode::Char('d'), Command::CycleDifficulty),
    (KeyModifiers::CONTROL, KeyCode::Char('s'), Command::ToggleScoring),
];

/// Single-key commands available once a run is over.
const RESULT_KEYS: &[(KeyCode, Command)] = &[
    (KeyCode::Char('r'), Command::Restart),
    (KeyCode::Char('n'), Command::NewSnippet),
    (KeyCode::Enter, Command::NewSnippet),
    (KeyCode::Char('l'), Command::CycleLines),
    (KeyCode::Char('d'), Command::CycleDifficulty),
    (KeyCode::Char('s'), Command::ToggleScoring),
    (KeyCode::Char('h'), Command::ShowHistory),
    (KeyCode::Char('q'), Command::Quit),
];

/// Keys of the recent-results list; these shadow the global table.
const HISTORY_KEYS: &[(KeyCode, Command)] = &[
    (KeyCode::Esc, Command::CloseHistory),
    (KeyCode::Char('h'), Command::CloseHistory),
    (KeyCode::Up, Command::HistoryUp),
    (KeyCode::Char('k'), Command::HistoryUp),
    (KeyCode::Down, Command::HistoryDown),
    (KeyCode::Char('j'), Command::HistoryDown),
    (KeyCode::Delete, Command::DeleteEntry),
    (KeyCode::Char('x'), Command::DeleteEntry),
    (KeyCode::Char('c'), Command::ClearHistory),
];

fn lookup(table: &[(KeyCode, Command)], code: KeyCode) -> Option<Command> {
    table.iter().find(|(c, _)| *c == code).map(|(_, cmd)| *cmd)
}

pub fn dispatch(state: AppState, key: &KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let mods = key.modifiers.difference(KeyModifiers::SHIFT);
    let code = match key.code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    };

    if state == AppState::History && mods.is_empty() {
        if let Some(cmd) = lookup(HISTORY_KEYS, code) {
            return Some(cmd);
        }
    }

    SHORTCUTS
        .iter()
        .find(|(m, c, _)| *m == mods && *c == code)
        .map(|(_, _, cmd)| *cmd)
        .or_else(|| match state {
            AppState::Results if mods.is_empty() => lookup(RESULT_KEYS, code),
            _ => None,
        })
}

pub struct App {
    pub game: Game,
    pub state: AppState,
    pub config: Config,
    pub history: SessionHistory,
    /// Selected row of the recent-results list
    pub history_cursor: usize,
    /// History entry of the finished run still waiting for its score
    pending_entry: Option<(RunId, String)>,
    provider: Box<dyn TargetProvider>,
    clock: Box<dyn Clock>,
}

impl App {
    pub fn new(config: Config, provider: Box<dyn TargetProvider>, clock: Box<dyn Clock>) -> Self {
        let now = clock.now_ms();
        let prompt = provider.first(config.lines, config.difficulty);
        Self {
            game: Game::new(prompt, config.scoring_mode, now),
            state: AppState::Typing,
            config,
            history: SessionHistory::new(),
            history_cursor: 0,
            pending_entry: None,
            provider,
            clock,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn new_snippet(&mut self) {
        let prompt = self
            .provider
            .random(self.config.lines, self.config.difficulty);
        let now = self.now_ms();
        self.game.reset(prompt, now);
        self.state = AppState::Typing;
    }

    /// Apply a command; returns false when the app should exit.
    pub fn apply(&mut self, command: Command, store: &dyn ConfigStore) -> bool {
        match command {
            Command::Quit => return false,
            Command::Restart => {
                let now = self.now_ms();
                self.game.restart(now);
                self.state = AppState::Typing;
            }
            Command::NewSnippet => self.new_snippet(),
            Command::ShowHistory => {
                self.history_cursor = 0;
                self.state = AppState::History;
            }
            Command::CloseHistory => {
                self.state = if self.game.has_finished() {
                    AppState::Results
                } else {
                    AppState::Typing
                };
            }
            Command::HistoryUp => self.history_cursor = self.history_cursor.saturating_sub(1),
            Command::HistoryDown => {
                let last = self.decoded_history().len().saturating_sub(1);
                self.history_cursor = (self.history_cursor + 1).min(last);
            }
            Command::DeleteEntry => {
                let id = self
                    .decoded_history()
                    .get(self.history_cursor)
                    .map(|(entry, _)| entry.id.clone());
                if let Some(id) = id {
                    self.history.remove(&id);
                    let last = self.decoded_history().len().saturating_sub(1);
                    self.history_cursor = self.history_cursor.min(last);
                }
            }
            Command::ClearHistory => {
                self.history.clear();
                self.history_cursor = 0;
            }
            Command::CycleLines | Command::CycleDifficulty | Command::ToggleScoring => {
                match command {
                    Command::CycleLines => self.config.cycle_lines(),
                    Command::CycleDifficulty => self.config.cycle_difficulty(),
                    _ => {
                        self.config.scoring_mode = match self.config.scoring_mode {
                            ScoringMode::Simple => ScoringMode::Tuned,
                            ScoringMode::Tuned => ScoringMode::Simple,
                        };
                        self.game.set_scoring_mode(self.config.scoring_mode);
                    }
                }
                if let Err(err) = store.save(&self.config) {
                    warn!(error = %err, "could not save config");
                }
                self.new_snippet();
            }
        }
        true
    }

    /// Route a key to the game. Returns true when this key finished the run.
    pub fn on_typing_key(&mut self, key: &KeyEvent) -> bool {
        if self.state != AppState::Typing {
            return false;
        }
        let now = self.now_ms();
        if self.game.on_key(key, now).is_some() {
            self.state = AppState::Results;
            return true;
        }
        false
    }

    /// Record the finished run in history with its provisional score.
    pub fn record_result(&mut self) {
        if let Some(result) = self.game.result() {
            let encoded = encode_result(&result.prompt, &result.stats, Some(result.score()));
            let id = self.history.record(encoded).id.clone();
            self.pending_entry = Some((result.run_id, id));
        }
    }

    /// Apply a scorer reply and rewrite the run's history entry with it.
    pub fn on_scored(&mut self, scored: Scored) {
        if !self.game.apply_remote_score(scored) {
            return;
        }
        let Some(result) = self.game.result() else {
            return;
        };
        if let Some((run_id, id)) = self.pending_entry.take() {
            if run_id == result.run_id {
                let encoded = encode_result(&result.prompt, &result.stats, Some(result.score()));
                self.history.update(&id, encoded);
            }
        }
    }

    /// History entries that decode, newest first.
    pub fn decoded_history(&self) -> Vec<(&HistoryEntry, DecodedResult)> {
        self.history
            .entries()
            .filter_map(|entry| decode_result(&entry.encoded).map(|decoded| (entry, decoded)))
            .collect()
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(dir) = path.parent() {
        if fs::create_dir_all(dir).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let store = FileConfigStore::new();
    let config = cli.merge_into(store.load());
    let provider: Box<dyn TargetProvider> = match cli.prompt.clone() {
        Some(code) if !code.is_empty() => {
            Box::new(FixedTarget(Prompt::custom(code, config.difficulty)))
        }
        _ => Box::new(Catalogue::embedded()?),
    };

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, provider, Box::new(MonotonicClock::new()));
    info!(prompt = %app.game.prompt().id, "starting");
    let res = start_tui(&mut terminal, &mut app, &store);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    res
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    store: &dyn ConfigStore,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let submitter = Submitter::new(LocalScoreService);

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        match runner.step() {
            GameEvent::Tick => {
                if let Some(scored) = submitter.poll() {
                    app.on_scored(scored);
                }
            }
            GameEvent::Resize => {}
            GameEvent::Paste(text) => app.game.on_paste(&text),
            GameEvent::Key(key) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    break;
                }
                if let Some(command) = dispatch(app.state, &key) {
                    if !app.apply(command, store) {
                        break;
                    }
                    continue;
                }
                if app.on_typing_key(&key) {
                    if let Some(result) = app.game.result() {
                        submitter.submit(result.run_id, result.score_input(app.config.scoring_mode));
                    }
                    app.record_result();
                }
            }
        }
    }

    Ok(())
}
