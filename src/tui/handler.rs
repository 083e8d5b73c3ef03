use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Link,
    Search,
    ConfirmSave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    MoveUp,
    MoveDown,
    EditLink,
    GenerateSummary,
    GenerateVoice,
    ReplayAudio,
    StopAudio,
    ShowLatest,
    IncreaseBrowseLimit,
    DecreaseBrowseLimit,
    StartSearch,
    OpenSelected,
    OpenThumbnail,
    SaveCurrent,
    ShowHelp,
    HideHelp,
    Paste(String),
    // Link input actions
    LinkInputChar(char),
    LinkInputBackspace,
    LinkInputConfirm,
    LinkInputCancel,
    // Search input actions
    SearchInputChar(char),
    SearchInputBackspace,
    SearchInputConfirm,
    SearchInputCancel,
    // Save confirmation
    ConfirmSave(bool),
}

pub fn handle_key_event(key: KeyEvent, mode: InputMode, show_help: bool) -> Option<AppAction> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(AppAction::Quit);
    }

    // If help is showing, any key closes it
    if show_help {
        return Some(AppAction::HideHelp);
    }

    match mode {
        InputMode::Link => match key.code {
            KeyCode::Enter => Some(AppAction::LinkInputConfirm),
            KeyCode::Esc => Some(AppAction::LinkInputCancel),
            KeyCode::Backspace => Some(AppAction::LinkInputBackspace),
            KeyCode::Char(c) => Some(AppAction::LinkInputChar(c)),
            _ => None,
        },

        InputMode::Search => match key.code {
            KeyCode::Enter => Some(AppAction::SearchInputConfirm),
            KeyCode::Esc => Some(AppAction::SearchInputCancel),
            KeyCode::Backspace => Some(AppAction::SearchInputBackspace),
            KeyCode::Char(c) => Some(AppAction::SearchInputChar(c)),
            _ => None,
        },

        InputMode::ConfirmSave => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(AppAction::ConfirmSave(true)),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                Some(AppAction::ConfirmSave(false))
            }
            _ => None,
        },

        InputMode::Normal => match key.code {
            KeyCode::Char('q') => Some(AppAction::Quit),

            KeyCode::Char('j') | KeyCode::Down => Some(AppAction::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(AppAction::MoveUp),

            KeyCode::Char('l') | KeyCode::Char('i') => Some(AppAction::EditLink),
            KeyCode::Enter | KeyCode::Char('g') => Some(AppAction::GenerateSummary),
            KeyCode::Char('v') => Some(AppAction::GenerateVoice),
            KeyCode::Char('p') => Some(AppAction::ReplayAudio),
            KeyCode::Char('x') => Some(AppAction::StopAudio),
            KeyCode::Char('s') => Some(AppAction::SaveCurrent),

            KeyCode::Char('b') => Some(AppAction::ShowLatest),
            KeyCode::Char('+') | KeyCode::Char('=') => Some(AppAction::IncreaseBrowseLimit),
            KeyCode::Char('-') => Some(AppAction::DecreaseBrowseLimit),
            KeyCode::Char('/') => Some(AppAction::StartSearch),

            KeyCode::Char('o') => Some(AppAction::OpenSelected),
            KeyCode::Char('t') => Some(AppAction::OpenThumbnail),

            KeyCode::Char('?') => Some(AppAction::ShowHelp),

            _ => None,
        },
    }
}
