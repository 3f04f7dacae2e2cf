use std::io::Stdout;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::config::{
    Settings, config_path, data_dir, load_settings, log_path, save_settings, session_dir,
};
use crate::dashboard::{Dashboard, Tab, reset_stored};
use crate::gate::{Gate, GateOutcome};
use crate::logging;
use crate::medium::{DirMedium, StorageMedium};
use crate::store::PersistentStore;
use crate::ui::{
    DashboardView, GateView, SHAKE_OFFSETS, copy_url_to_clipboard, draw_dashboard, draw_gate,
    open_in_browser,
};

const STATUS_MESSAGE_SECS: u64 = 2;
const GATE_TICK_MS: u64 = 60;
const DASHBOARD_TICK_MS: u64 = 200;
pub(crate) const GATE_REJECTED: &str = "Wrong password. Try again.";
const NAV_HINT: &str = "Tab/1-3 switch | ↑/↓ move | n add | e edit | d delete | Esc quit";
const LINKS_NAV_HINT: &str =
    "Tab/1-3 switch | ↑/↓ move | Enter/o open | c copy | n add | e edit | d delete | Esc quit";
const GATE_HINT: &str = "Enter the passphrase to unlock (Ctrl+h show/hide, Esc quit)";

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Command-line overrides on top of `config.json`.
#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    persistence: Option<bool>,
    gate: Option<bool>,
    data_dir: Option<String>,
    init_config: bool,
    reset: bool,
    version: bool,
    help: bool,
}

impl CliArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(on) = self.persistence {
            settings.persistence_enabled = on;
        }
        if let Some(on) = self.gate {
            settings.gate_enabled = on;
        }
        if let Some(dir) = &self.data_dir {
            settings.data_dir = Some(dir.clone());
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => cli.version = true,
            "--help" | "-h" => cli.help = true,
            "--memory" => cli.persistence = Some(false),
            "--persist" => cli.persistence = Some(true),
            "--no-gate" => cli.gate = Some(false),
            "--gate" => cli.gate = Some(true),
            "--data-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| anyhow!("--data-dir requires a path"))?;
                cli.data_dir = Some(dir);
            }
            "--init-config" => cli.init_config = true,
            "--reset" => cli.reset = true,
            _ => {}
        }
    }
    Ok(cli)
}

pub fn run() -> Result<()> {
    let bin_name = executable_name();
    let cli = parse_args(std::env::args().skip(1))?;

    if cli.version {
        println!("{bin_name} v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if cli.help {
        print_usage(&bin_name);
        return Ok(());
    }

    let mut settings = load_settings()?;
    cli.apply(&mut settings);

    if cli.init_config {
        save_settings(&settings)?;
        println!("Wrote settings to {}", config_path()?.display());
        return Ok(());
    }

    if let Err(e) = logging::init(&log_path()?, &settings.log_level) {
        eprintln!("Logging disabled: {e}");
    }

    let data = data_medium(&settings, cli.reset)?;

    if cli.reset {
        let cleared = data.is_some_and(reset_stored);
        if cleared {
            println!("Stored links, reminders and roadmap were reset.");
        } else {
            println!("Some stored collections could not be removed; see the log.");
        }
        return Ok(());
    }

    let store = data.map(PersistentStore::new);
    let mut gate = if settings.gate_enabled {
        let session = session_dir();
        debug!(session = %session.display(), "using session directory");
        Gate::new(settings.gate_secret()?, Rc::new(DirMedium::new(session)))
    } else {
        Gate::disabled()
    };
    info!(
        persistence = settings.persistence_enabled,
        gate = settings.gate_enabled,
        "starting dashboard"
    );

    let mut terminal = setup_terminal()?;
    let result = (|| -> Result<()> {
        if !gate.is_unlocked() && !gate_screen(&mut terminal, &mut gate)? {
            return Ok(());
        }
        let mut dashboard = Dashboard::open(store);
        dashboard_screen(&mut terminal, &mut dashboard)
    })();
    teardown_terminal(&mut terminal);

    result
}

/// The data directory is only resolved when something will read or write it.
fn data_medium(settings: &Settings, reset: bool) -> Result<Option<Rc<dyn StorageMedium>>> {
    if !settings.persistence_enabled && !reset {
        return Ok(None);
    }
    let medium = DirMedium::new(data_dir(settings)?);
    debug!(data = %medium.dir().display(), "using data directory");
    Ok(Some(Rc::new(medium)))
}

fn setup_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, crossterm::cursor::Hide)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn teardown_terminal(terminal: &mut Term) {
    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        crossterm::cursor::Show
    )
    .ok();
    terminal.show_cursor().ok();
}

/// Returns `false` when the user backs out instead of unlocking.
fn gate_screen(terminal: &mut Term, gate: &mut Gate) -> Result<bool> {
    let mut input = String::new();
    let mut status = GATE_HINT.to_string();
    let mut show_input = false;
    let mut rejected = false;
    let mut shake_frame: Option<usize> = None;
    let mut last_tick = Instant::now();
    let tick = Duration::from_millis(GATE_TICK_MS);

    loop {
        if last_tick.elapsed() >= tick {
            shake_frame = shake_frame
                .map(|frame| frame + 1)
                .filter(|frame| *frame < SHAKE_OFFSETS.len());
            last_tick = Instant::now();
        }
        let input_display = if show_input {
            input.clone()
        } else {
            "•".repeat(input.chars().count())
        };
        terminal.draw(|f| {
            let view = GateView {
                status: status.clone(),
                input_display: &input_display,
                input_visible: show_input,
                shake_offset: shake_frame.map(|i| SHAKE_OFFSETS[i]).unwrap_or(0),
                rejected,
            };
            draw_gate(f, &view);
        })?;

        if !event::poll(tick)? {
            continue;
        }
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }
        if is_ctrl(&key_event, 'h') {
            show_input = !show_input;
            continue;
        }
        match key_event.code {
            KeyCode::Esc => {
                input.zeroize();
                return Ok(false);
            }
            KeyCode::Enter => match gate.submit(&mut input) {
                GateOutcome::Unlocked | GateOutcome::AlreadyUnlocked => return Ok(true),
                GateOutcome::Rejected => {
                    rejected = true;
                    shake_frame = Some(0);
                    last_tick = Instant::now();
                    status = GATE_REJECTED.to_string();
                }
            },
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => {
                input.push(c);
                rejected = false;
            }
            _ => {}
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

#[derive(Default)]
struct CardForm {
    active: bool,
    tab: Option<Tab>,
    target: Option<u64>,
    step: usize,
    fields: [String; 2],
}

struct PendingDelete {
    tab: Tab,
    id: u64,
    label: String,
}

/// Everything on screen that is not a record.
struct Screen {
    tab: Tab,
    selected: [usize; 3],
    form: CardForm,
    pending_delete: Option<PendingDelete>,
    quit_overlay: bool,
    status: String,
    status_until: Option<Instant>,
}

impl Screen {
    fn new() -> Self {
        Self {
            tab: Tab::Links,
            selected: [0; 3],
            form: CardForm::default(),
            pending_delete: None,
            quit_overlay: false,
            status: nav_hint(Tab::Links).to_string(),
            status_until: None,
        }
    }

    fn selected(&self) -> usize {
        self.selected[self.tab.index()]
    }

    fn select(&mut self, idx: usize) {
        self.selected[self.tab.index()] = idx;
    }

    fn clamp_selection(&mut self, dashboard: &Dashboard) {
        let max = dashboard.len(self.tab).saturating_sub(1);
        let idx = self.selected().min(max);
        self.select(idx);
    }

    fn switch_tab(&mut self, tab: Tab, dashboard: &Dashboard) {
        self.tab = tab;
        self.clamp_selection(dashboard);
        self.status = nav_hint(tab).to_string();
        self.status_until = None;
    }

    fn flash(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.status_until = Some(Instant::now() + Duration::from_secs(STATUS_MESSAGE_SECS));
    }

    fn expire_status(&mut self) {
        if let Some(until) = self.status_until {
            if Instant::now() >= until {
                self.status = nav_hint(self.tab).to_string();
                self.status_until = None;
            }
        }
    }
}

fn nav_hint(tab: Tab) -> &'static str {
    match tab {
        Tab::Links => LINKS_NAV_HINT,
        _ => NAV_HINT,
    }
}

fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char(k) if k.eq_ignore_ascii_case(&c))
}

fn dashboard_screen(terminal: &mut Term, dashboard: &mut Dashboard) -> Result<()> {
    let mut screen = Screen::new();
    let persistent = dashboard.links.is_persistent();

    loop {
        screen.expire_status();
        terminal.draw(|f| {
            let (overlay, overlay_title) = build_form_overlay(&screen.form, dashboard);
            let view = DashboardView {
                dashboard,
                tab: screen.tab,
                selected: screen.selected(),
                persistent,
                overlay,
                overlay_title,
                delete_overlay: screen.pending_delete.as_ref().map(|p| p.label.clone()),
                quit_overlay: screen.quit_overlay.then(|| {
                    vec![
                        "Quit?".to_string(),
                        "".to_string(),
                        "[y] Yes   [n] No".to_string(),
                    ]
                }),
                status: screen.status.clone(),
            };
            draw_dashboard(f, &view);
        })?;

        if !event::poll(Duration::from_millis(DASHBOARD_TICK_MS))? {
            continue;
        }
        if let Event::Key(key_event) = event::read()? {
            if key_event.kind != KeyEventKind::Press {
                continue;
            }
            if handle_key(&mut screen, dashboard, key_event) == Flow::Quit {
                break;
            }
        }
    }
    Ok(())
}

fn handle_key(screen: &mut Screen, dashboard: &mut Dashboard, key: KeyEvent) -> Flow {
    if screen.quit_overlay {
        match key.code {
            KeyCode::Char('y') => return Flow::Quit,
            KeyCode::Char('n') | KeyCode::Esc => screen.quit_overlay = false,
            _ => {}
        }
        return Flow::Continue;
    }
    if screen.pending_delete.is_some() {
        handle_delete_confirm(screen, dashboard, key.code);
        return Flow::Continue;
    }
    if screen.form.active {
        handle_form(screen, dashboard, key);
        return Flow::Continue;
    }

    match key.code {
        KeyCode::Esc => screen.quit_overlay = true,
        KeyCode::Tab | KeyCode::Right => screen.switch_tab(screen.tab.next(), dashboard),
        KeyCode::BackTab | KeyCode::Left => screen.switch_tab(screen.tab.prev(), dashboard),
        KeyCode::Char('1') => screen.switch_tab(Tab::Links, dashboard),
        KeyCode::Char('2') => screen.switch_tab(Tab::Reminders, dashboard),
        KeyCode::Char('3') => screen.switch_tab(Tab::Roadmap, dashboard),
        KeyCode::Up => {
            let idx = screen.selected().saturating_sub(1);
            screen.select(idx);
        }
        KeyCode::Down => {
            let max = dashboard.len(screen.tab).saturating_sub(1);
            let idx = (screen.selected() + 1).min(max);
            screen.select(idx);
        }
        KeyCode::Char('n') => {
            screen.form = CardForm {
                active: true,
                tab: Some(screen.tab),
                ..CardForm::default()
            };
        }
        KeyCode::Char('e') => {
            let Some(card) = dashboard.card_at(screen.tab, screen.selected()) else {
                return Flow::Continue;
            };
            if let Some(fields) = dashboard.form_fields(screen.tab, card.id) {
                screen.form = CardForm {
                    active: true,
                    tab: Some(screen.tab),
                    target: Some(card.id),
                    step: 0,
                    fields,
                };
            }
        }
        KeyCode::Char('d') => {
            if let Some(card) = dashboard.card_at(screen.tab, screen.selected()) {
                screen.pending_delete = Some(PendingDelete {
                    tab: screen.tab,
                    id: card.id,
                    label: card.label,
                });
            }
        }
        KeyCode::Enter | KeyCode::Char('o') if screen.tab == Tab::Links => {
            if let Some(card) = dashboard.card_at(Tab::Links, screen.selected()) {
                match open_in_browser(&card.detail) {
                    Ok(()) => screen.flash(format!("Opened {}", card.label)),
                    Err(e) => {
                        warn!(error = %e, "could not open link");
                        screen.flash(e.to_string());
                    }
                }
            }
        }
        KeyCode::Char('c') if screen.tab == Tab::Links => {
            if let Some(card) = dashboard.card_at(Tab::Links, screen.selected()) {
                match copy_url_to_clipboard(&card.detail) {
                    Ok(()) => screen.flash(format!("Copied {}", card.detail)),
                    Err(e) => screen.flash(format!("Clipboard error: {e}")),
                }
            }
        }
        _ => {}
    }
    Flow::Continue
}

fn handle_delete_confirm(screen: &mut Screen, dashboard: &mut Dashboard, code: KeyCode) {
    match code {
        KeyCode::Char('y') => {
            if let Some(target) = screen.pending_delete.take() {
                if dashboard.remove(target.tab, target.id) {
                    screen.clamp_selection(dashboard);
                    screen.flash(format!("Deleted \"{}\"", target.label));
                }
            }
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            screen.pending_delete = None;
            screen.flash("Delete cancelled");
        }
        _ => {}
    }
}

fn handle_form(screen: &mut Screen, dashboard: &mut Dashboard, key: KeyEvent) {
    let form = &mut screen.form;
    if is_ctrl(&key, 'j') {
        if form.step == 1 {
            form.fields[1].push('\n');
        }
        return;
    }
    match key.code {
        KeyCode::Esc => {
            screen.form = CardForm::default();
            screen.flash("Cancelled");
        }
        KeyCode::Up | KeyCode::BackTab => form.step = 0,
        KeyCode::Down | KeyCode::Tab => form.step = 1,
        KeyCode::Backspace => {
            form.fields[form.step].pop();
        }
        KeyCode::Enter if form.step == 0 => form.step = 1,
        KeyCode::Enter => submit_form(screen, dashboard),
        KeyCode::Char(c) => form.fields[form.step].push(c),
        _ => {}
    }
}

/// Blank required fields keep the form open without any message.
fn submit_form(screen: &mut Screen, dashboard: &mut Dashboard) {
    let tab = screen.form.tab.unwrap_or(screen.tab);
    let target = screen.form.target;
    if let Some(id) = target {
        if dashboard.label_of(tab, id).is_none() {
            screen.form = CardForm::default();
            return;
        }
    }
    let fields = screen.form.fields.clone();
    let Some(id) = dashboard.save_form(tab, target, fields) else {
        return;
    };
    screen.form = CardForm::default();
    if let Some(pos) = dashboard.position(tab, id) {
        screen.select(pos);
    }
    let label = dashboard.label_of(tab, id).unwrap_or_default();
    if target.is_some() {
        screen.flash(format!("Updated \"{label}\""));
    } else {
        screen.flash(format!("Added \"{label}\""));
    }
}

fn build_form_overlay(form: &CardForm, dashboard: &Dashboard) -> (Option<Vec<String>>, Option<String>) {
    if !form.active {
        return (None, None);
    }
    let tab = form.tab.unwrap_or(Tab::Links);
    let noun = match tab {
        Tab::Links => "link",
        Tab::Reminders => "reminder",
        Tab::Roadmap => "chapter",
    };
    let title = match form.target {
        Some(id) => format!(
            "Edit {noun}: {}",
            dashboard.label_of(tab, id).unwrap_or_default()
        ),
        None => format!("New {noun}"),
    };
    let mut lines = vec![title.clone(), "".to_string()];
    for (idx, label) in tab.field_labels().iter().enumerate() {
        let marker = if idx == form.step { ">" } else { " " };
        let value = form.fields[idx].replace('\n', " ⏎ ");
        lines.push(format!("{marker} {label}: {value}"));
    }
    lines.push("".to_string());
    lines.push(if tab == Tab::Links {
        "Enter next/save; ↑/↓ move fields; Esc cancels".to_string()
    } else {
        "Enter next/save; Ctrl+j new line; ↑/↓ move fields; Esc cancels".to_string()
    });
    (Some(lines), Some(title))
}

fn print_usage(bin_name: &str) {
    eprintln!("Usage: {bin_name} [OPTIONS]");
    eprintln!("      --memory            Keep records in memory only for this run");
    eprintln!("      --persist           Save records to the data directory");
    eprintln!("      --no-gate           Skip the passphrase gate");
    eprintln!("      --gate              Require the passphrase gate");
    eprintln!("      --data-dir <PATH>   Store records under PATH (inside home)");
    eprintln!("      --init-config       Write the effective settings to config.json");
    eprintln!("      --reset             Forget stored links, reminders and roadmap");
    eprintln!("  -V, --version           Show version and exit");
    eprintln!("  -h, --help              Show this help");
}

fn executable_name() -> String {
    let fallback = "mine".to_string();
    let arg0 = match std::env::args().next() {
        Some(v) => v,
        None => return fallback,
    };
    let path = Path::new(&arg0);
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => fallback,
    }
}
