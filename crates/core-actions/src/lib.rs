//! Enumerated viewer commands.
//!
//! An action is a tag plus a free-form parameter string; the keybinding
//! layer, the CLI, and any request socket all reduce to these. Actions
//! compose into `;`-delimited sequences executed in order. The parameter is
//! not interpreted here; each mode handler reads what it needs (a zoom
//! percentage, a shell command line, an export path).

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    FirstFile,
    LastFile,
    PrevFile,
    NextFile,
    PrevDir,
    NextDir,
    RandFile,
    SkipFile,
    PrevFrame,
    NextFrame,
    Animation,
    Slideshow,
    Fullscreen,
    Mode,
    StepLeft,
    StepRight,
    StepUp,
    StepDown,
    PageUp,
    PageDown,
    Zoom,
    Scale,
    KeepZoom,
    RotateLeft,
    RotateRight,
    FlipVertical,
    FlipHorizontal,
    Reload,
    Antialiasing,
    Info,
    Exec,
    Export,
    Status,
    Exit,
    Help,
    None,
}

impl ActionKind {
    pub const ALL: [ActionKind; 36] = [
        ActionKind::FirstFile,
        ActionKind::LastFile,
        ActionKind::PrevFile,
        ActionKind::NextFile,
        ActionKind::PrevDir,
        ActionKind::NextDir,
        ActionKind::RandFile,
        ActionKind::SkipFile,
        ActionKind::PrevFrame,
        ActionKind::NextFrame,
        ActionKind::Animation,
        ActionKind::Slideshow,
        ActionKind::Fullscreen,
        ActionKind::Mode,
        ActionKind::StepLeft,
        ActionKind::StepRight,
        ActionKind::StepUp,
        ActionKind::StepDown,
        ActionKind::PageUp,
        ActionKind::PageDown,
        ActionKind::Zoom,
        ActionKind::Scale,
        ActionKind::KeepZoom,
        ActionKind::RotateLeft,
        ActionKind::RotateRight,
        ActionKind::FlipVertical,
        ActionKind::FlipHorizontal,
        ActionKind::Reload,
        ActionKind::Antialiasing,
        ActionKind::Info,
        ActionKind::Exec,
        ActionKind::Export,
        ActionKind::Status,
        ActionKind::Exit,
        ActionKind::Help,
        ActionKind::None,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::FirstFile => "first_file",
            ActionKind::LastFile => "last_file",
            ActionKind::PrevFile => "prev_file",
            ActionKind::NextFile => "next_file",
            ActionKind::PrevDir => "prev_dir",
            ActionKind::NextDir => "next_dir",
            ActionKind::RandFile => "rand_file",
            ActionKind::SkipFile => "skip_file",
            ActionKind::PrevFrame => "prev_frame",
            ActionKind::NextFrame => "next_frame",
            ActionKind::Animation => "animation",
            ActionKind::Slideshow => "slideshow",
            ActionKind::Fullscreen => "fullscreen",
            ActionKind::Mode => "mode",
            ActionKind::StepLeft => "step_left",
            ActionKind::StepRight => "step_right",
            ActionKind::StepUp => "step_up",
            ActionKind::StepDown => "step_down",
            ActionKind::PageUp => "page_up",
            ActionKind::PageDown => "page_down",
            ActionKind::Zoom => "zoom",
            ActionKind::Scale => "scale",
            ActionKind::KeepZoom => "keep_zoom",
            ActionKind::RotateLeft => "rotate_left",
            ActionKind::RotateRight => "rotate_right",
            ActionKind::FlipVertical => "flip_vertical",
            ActionKind::FlipHorizontal => "flip_horizontal",
            ActionKind::Reload => "reload",
            ActionKind::Antialiasing => "antialiasing",
            ActionKind::Info => "info",
            ActionKind::Exec => "exec",
            ActionKind::Export => "export",
            ActionKind::Status => "status",
            ActionKind::Exit => "exit",
            ActionKind::Help => "help",
            ActionKind::None => "none",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionKind {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| ActionParseError::UnknownAction(s.to_string()))
    }
}

/// One command with its raw parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    pub param: String,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            param: String::new(),
        }
    }

    pub fn with_param(kind: ActionKind, param: impl Into<String>) -> Self {
        Self {
            kind,
            param: param.into(),
        }
    }

    /// Parameter parsed as a number, when present and valid.
    pub fn param_f64(&self) -> Option<f64> {
        self.param.trim().trim_end_matches('%').parse().ok()
    }

    pub fn param_isize(&self) -> Option<isize> {
        self.param.trim().parse().ok()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.param.is_empty() {
            f.write_str(self.kind.name())
        } else {
            write!(f, "{} {}", self.kind.name(), self.param)
        }
    }
}

pub type ActionSeq = Vec<Action>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionParseError {
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("empty action sequence")]
    Empty,
}

/// Parse a `;`-delimited action sequence: `"zoom +10; next_file"`. Empty
/// segments are skipped; a fully empty input is an error.
pub fn parse_sequence(input: &str) -> Result<ActionSeq, ActionParseError> {
    let mut seq = Vec::new();
    for segment in input.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (name, param) = match segment.split_once(char::is_whitespace) {
            Some((name, param)) => (name, param.trim()),
            None => (segment, ""),
        };
        seq.push(Action::with_param(name.parse::<ActionKind>()?, param));
    }
    if seq.is_empty() {
        return Err(ActionParseError::Empty);
    }
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_by_name() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.name().parse::<ActionKind>(), Ok(kind));
        }
    }

    #[test]
    fn parses_single_action_with_param() {
        let seq = parse_sequence("zoom +10").unwrap();
        assert_eq!(seq, vec![Action::with_param(ActionKind::Zoom, "+10")]);
        assert_eq!(seq[0].param_f64(), Some(10.0));
    }

    #[test]
    fn parses_sequences_in_order() {
        let seq = parse_sequence("exec convert x.png y.png; reload ;next_file").unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq[0].kind, ActionKind::Exec);
        assert_eq!(seq[0].param, "convert x.png y.png");
        assert_eq!(seq[1].kind, ActionKind::Reload);
        assert_eq!(seq[2].kind, ActionKind::NextFile);
    }

    #[test]
    fn unknown_action_is_an_error() {
        let err = parse_sequence("warp_speed").unwrap_err();
        assert_eq!(err, ActionParseError::UnknownAction("warp_speed".into()));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(parse_sequence(" ; ;"), Err(ActionParseError::Empty));
    }

    #[test]
    fn percent_suffix_is_tolerated() {
        let action = Action::with_param(ActionKind::Scale, "150%");
        assert_eq!(action.param_f64(), Some(150.0));
    }
}
