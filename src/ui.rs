use crate::session::{AuthError, Session};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph},
    Terminal,
};
use std::io;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(200);
const TOAST_DURATION: Duration = Duration::from_secs(3);
const CELEBRATION_DURATION: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Login,
    Register,
    Dashboard,
    Manage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToastKind {
    Success,
    Error,
    Info,
}

struct Toast {
    message: String,
    kind: ToastKind,
    expires: Instant,
}

#[derive(Debug, Clone, Copy)]
enum Confirm {
    Logout,
    Delete(u32),
}

struct Ui {
    screen: Screen,
    field: Field,
    username: String,
    password: String,
    selected: usize,
    toasts: Vec<Toast>,
    celebration_until: Option<Instant>,
    confirm: Option<Confirm>,
}

impl Ui {
    fn new(screen: Screen) -> Self {
        Self {
            screen,
            field: Field::Username,
            username: String::new(),
            password: String::new(),
            selected: 0,
            toasts: Vec::new(),
            celebration_until: None,
            confirm: None,
        }
    }

    fn toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toasts.push(Toast {
            message: message.into(),
            kind,
            expires: Instant::now() + TOAST_DURATION,
        });
    }

    // Timed visuals only; nothing here affects stored state.
    fn tick(&mut self) {
        let now = Instant::now();
        self.toasts.retain(|t| t.expires > now);
        if self.celebration_until.is_some_and(|until| until <= now) {
            self.celebration_until = None;
        }
    }

    fn clear_form(&mut self) {
        self.username.clear();
        self.password.clear();
        self.field = Field::Username;
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn accent(session: &Session) -> Color {
    match session.theme().as_deref() {
        Some("pink") => Color::Magenta,
        Some("blue") => Color::Blue,
        Some("green") => Color::Green,
        Some("yellow") => Color::Yellow,
        _ => Color::Cyan,
    }
}

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    session: &mut Session,
    startup_error: Option<String>,
) -> io::Result<()> {
    let mut ui = Ui::new(if session.current_user().is_some() {
        Screen::Dashboard
    } else {
        Screen::Login
    });
    if let Some(message) = startup_error {
        ui.toast(message, ToastKind::Error);
    }
    if let Some(user) = session.current_user() {
        ui.toast(
            format!("Welcome back, {}! ✨", capitalize(user)),
            ToastKind::Success,
        );
    }

    loop {
        ui.tick();
        terminal.draw(|f| draw(f, session, &ui))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        // A pending confirm dialog swallows every key.
        if let Some(confirm) = ui.confirm {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    ui.confirm = None;
                    match confirm {
                        Confirm::Logout => {
                            session.logout();
                            ui.clear_form();
                            ui.screen = Screen::Login;
                        }
                        Confirm::Delete(id) => {
                            if session.delete_task(id) {
                                ui.toast("Task deleted.", ToastKind::Info);
                            } else {
                                ui.toast("That task cannot be deleted.", ToastKind::Error);
                            }
                            ui.selected = ui
                                .selected
                                .min(session.visible_tasks().len().saturating_sub(1));
                        }
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => ui.confirm = None,
                _ => {}
            }
            continue;
        }

        match ui.screen {
            Screen::Login | Screen::Register => {
                if handle_form_key(&mut ui, session, key.code, key.modifiers) {
                    return Ok(());
                }
            }
            Screen::Dashboard => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Up => ui.selected = ui.selected.saturating_sub(1),
                KeyCode::Down => {
                    let max = session.visible_tasks().len();
                    if ui.selected + 1 < max {
                        ui.selected += 1;
                    }
                }
                KeyCode::Char(' ') | KeyCode::Enter => {
                    let tasks = session.visible_tasks();
                    if let Some(task) = tasks.get(ui.selected) {
                        if let Some(outcome) = session.toggle_task(task.id) {
                            if outcome.now_completed {
                                // The confetti-and-sound stand-in.
                                ui.toast("Nice! Task done 🎉", ToastKind::Success);
                            }
                            if outcome.all_done {
                                ui.celebration_until = Some(Instant::now() + CELEBRATION_DURATION);
                            }
                        }
                    }
                }
                KeyCode::Char('m') => {
                    ui.screen = Screen::Manage;
                    ui.selected = 0;
                }
                KeyCode::Char('l') => ui.confirm = Some(Confirm::Logout),
                _ => {}
            },
            Screen::Manage => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Esc | KeyCode::Char('m') => {
                    ui.screen = Screen::Dashboard;
                    ui.selected = 0;
                }
                KeyCode::Up => ui.selected = ui.selected.saturating_sub(1),
                KeyCode::Down => {
                    let max = session.visible_tasks().len();
                    if ui.selected + 1 < max {
                        ui.selected += 1;
                    }
                }
                KeyCode::Char('a') => {
                    if let Some(title) = prompt("Enter task title") {
                        if session.add_task(&title).is_some() {
                            ui.toast("Task added.", ToastKind::Success);
                        } else {
                            ui.toast("A task needs a title.", ToastKind::Error);
                        }
                        terminal.clear()?;
                    }
                }
                KeyCode::Char('d') => {
                    let tasks = session.visible_tasks();
                    if let Some(task) = tasks.get(ui.selected) {
                        ui.confirm = Some(Confirm::Delete(task.id));
                    }
                }
                _ => {}
            },
        }
    }
}

/// Returns true when the user asked to quit.
fn handle_form_key(
    ui: &mut Ui,
    session: &mut Session,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> bool {
    match code {
        KeyCode::Esc => return true,
        KeyCode::Tab => {
            ui.field = match ui.field {
                Field::Username => Field::Password,
                Field::Password => Field::Username,
            };
        }
        KeyCode::Backspace => {
            match ui.field {
                Field::Username => ui.username.pop(),
                Field::Password => ui.password.pop(),
            };
        }
        KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
            ui.screen = match ui.screen {
                Screen::Register => Screen::Login,
                _ => Screen::Register,
            };
            ui.clear_form();
        }
        KeyCode::Char(c) => match ui.field {
            Field::Username => ui.username.push(c),
            Field::Password => ui.password.push(c),
        },
        KeyCode::Enter => {
            let result = if ui.screen == Screen::Register {
                session.register(&ui.username, &ui.password)
            } else {
                session.login(&ui.username, &ui.password)
            };
            match result {
                Ok(()) => {
                    let user = session.current_user().unwrap_or_default().to_string();
                    ui.toast(
                        format!("Hello, {}! ✨", capitalize(&user)),
                        ToastKind::Success,
                    );
                    ui.clear_form();
                    ui.screen = Screen::Dashboard;
                    ui.selected = 0;
                }
                Err(AuthError::BadCredentials) => {
                    ui.toast("Oops! Wrong name or password.", ToastKind::Error);
                }
                Err(err) => ui.toast(err.to_string(), ToastKind::Error),
            }
        }
        _ => {}
    }
    false
}

fn draw(f: &mut ratatui::Frame, session: &Session, ui: &Ui) {
    match ui.screen {
        Screen::Login | Screen::Register => draw_form(f, ui),
        Screen::Dashboard => draw_checklist(f, session, ui, false),
        Screen::Manage => draw_checklist(f, session, ui, true),
    }
    draw_toasts(f, ui);
    if let Some(confirm) = ui.confirm {
        draw_confirm(f, confirm);
    }
    if ui.celebration_until.is_some() {
        draw_celebration(f);
    }
}

fn draw_form(f: &mut ratatui::Frame, ui: &Ui) {
    let title = if ui.screen == Screen::Register {
        "Create account"
    } else {
        "Sign in"
    };
    let area = centered_rect(46, 7, f.area());

    let focused = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::from(vec![
            Span::styled(
                " Username: ",
                if ui.field == Field::Username {
                    focused
                } else {
                    Style::default()
                },
            ),
            Span::raw(ui.username.as_str()),
            Span::raw(if ui.field == Field::Username { "_" } else { "" }),
        ]),
        Line::from(vec![
            Span::styled(
                " Password: ",
                if ui.field == Field::Password {
                    focused
                } else {
                    Style::default()
                },
            ),
            Span::raw("*".repeat(ui.password.chars().count())),
            Span::raw(if ui.field == Field::Password { "_" } else { "" }),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " Tab: field  Enter: submit  Ctrl+R: switch  Esc: quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(format!("Dayboard — {title}"))
                .borders(Borders::ALL),
        ),
        area,
    );
}

fn draw_checklist(f: &mut ratatui::Frame, session: &Session, ui: &Ui, manage: bool) {
    let color = accent(session);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let user = session.current_user().unwrap_or_default();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", capitalize(user)),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("· {}", session.today().format("%A, %B %-d"))),
    ]))
    .block(Block::default().borders(Borders::ALL).title(if manage {
        "Manage tasks"
    } else {
        "Today"
    }));
    f.render_widget(header, chunks[0]);

    let tasks = session.visible_tasks();
    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let done = session.is_completed(t.id);
            let mark = if done { "[x]" } else { "[ ]" };
            let mut style = Style::default().fg(Color::White);
            if done {
                style = style.fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT);
            }
            let cursor = if i == ui.selected {
                Span::styled("›", Style::default().fg(color))
            } else {
                Span::raw(" ")
            };
            ListItem::new(Line::from(vec![
                cursor,
                Span::raw(format!(" {mark} ")),
                Span::styled(t.title.clone(), style),
            ]))
        })
        .collect();
    let items = if items.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            " Nothing to do today!",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )))]
    } else {
        items
    };
    f.render_widget(
        List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        ),
        chunks[1],
    );

    let (done, total) = session.counts();
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(color))
        .percent(session.percentage().round() as u16)
        .label(format!("{done}/{total} done"));
    f.render_widget(gauge, chunks[2]);

    let help = if manage {
        " a: add  d: delete  m/Esc: back  q: quit"
    } else {
        " Space: toggle  m: manage  l: logout  q: quit"
    };
    f.render_widget(
        Paragraph::new(Span::styled(help, Style::default().fg(Color::DarkGray))),
        chunks[3],
    );
}

fn draw_toasts(f: &mut ratatui::Frame, ui: &Ui) {
    let area = f.area();
    for (i, toast) in ui.toasts.iter().rev().take(3).enumerate() {
        let width = (toast.message.chars().count() as u16 + 4).min(area.width);
        let rect = Rect {
            x: area.width.saturating_sub(width + 1),
            y: 1 + i as u16,
            width,
            height: 1,
        };
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
            ToastKind::Info => Color::Blue,
        };
        f.render_widget(Clear, rect);
        f.render_widget(
            Paragraph::new(Span::styled(
                format!(" {} ", toast.message),
                Style::default().fg(Color::Black).bg(color),
            )),
            rect,
        );
    }
}

fn draw_confirm(f: &mut ratatui::Frame, confirm: Confirm) {
    let message = match confirm {
        Confirm::Logout => "Really sign out?",
        Confirm::Delete(_) => "Delete this task?",
    };
    let area = centered_rect(30, 5, f.area());
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::raw(message)).alignment(Alignment::Center),
            Line::from(Span::styled(
                "y: yes  n: no",
                Style::default().fg(Color::DarkGray),
            ))
            .alignment(Alignment::Center),
        ])
        .block(Block::default().title("Confirm").borders(Borders::ALL)),
        area,
    );
}

fn draw_celebration(f: &mut ratatui::Frame) {
    let area = centered_rect(36, 5, f.area());
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "🎉 All done for today! 🎉",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        ),
        area,
    );
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn prompt(message: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{}", message);
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        enable_raw_mode().ok();
        Some(input.trim().to_string())
    } else {
        enable_raw_mode().ok();
        None
    }
}
