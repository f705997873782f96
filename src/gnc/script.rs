//! Mission script language.
//!
//! A script is a list of lines of the form `WHEN <condition> THEN <action>`.
//! Blank lines and lines starting with `//` or `#` are skipped. A condition
//! is a chain of `VARIABLE OPERATOR VALUE` clauses joined by `AND` / `OR`,
//! combined strictly left to right: `A OR B AND C` means `(A OR B) AND C`.

use std::fmt;

use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use super::attitude::SasMode;

/// Absolute tolerance for `==` and `!=`.
pub const EQUALITY_TOLERANCE: f64 = 0.001;

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Variable {
    Altitude,
    Velocity,
    VerticalVel,
    HorizontalVel,
    Apogee,
    Fuel,
    Time,
    Throttle,
    DynamicPressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Comparator {
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">=")]
    GreaterEq,
    #[strum(serialize = "<=")]
    LessEq,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
}

impl Comparator {
    pub fn compare(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparator::Greater => lhs > rhs,
            Comparator::Less => lhs < rhs,
            Comparator::GreaterEq => lhs >= rhs,
            Comparator::LessEq => lhs <= rhs,
            Comparator::Equal => (lhs - rhs).abs() <= EQUALITY_TOLERANCE,
            Comparator::NotEqual => (lhs - rhs).abs() > EQUALITY_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Logic {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clause {
    pub variable: Variable,
    pub comparator: Comparator,
    pub threshold: f64,
}

impl Clause {
    pub fn evaluate(&self, lookup: &impl Fn(Variable) -> f64) -> bool {
        self.comparator.compare(lookup(self.variable), self.threshold)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.variable, self.comparator, self.threshold)
    }
}

/// Clause chain evaluated left to right with no operator precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub first: Clause,
    pub rest: Vec<(Logic, Clause)>,
}

impl Condition {
    pub fn evaluate(&self, lookup: impl Fn(Variable) -> f64) -> bool {
        self.rest.iter().fold(self.first.evaluate(&lookup), |acc, (logic, clause)| match logic {
            Logic::And => acc && clause.evaluate(&lookup),
            Logic::Or => acc || clause.evaluate(&lookup),
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        for (logic, clause) in &self.rest {
            write!(f, " {logic} {clause}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Target pitch above the horizon, rad.
    Pitch(f64),
    /// Throttle fraction, 0..1.
    Throttle(f64),
    Stage,
    Sas(SasMode),
    Abort,
}

impl Action {
    /// Stage and abort execute at most once per activation.
    pub fn is_one_shot(&self) -> bool {
        matches!(self, Action::Stage | Action::Abort)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Pitch(rad) => write!(f, "PITCH {}", rad.to_degrees()),
            Action::Throttle(frac) => write!(f, "THROTTLE {frac}"),
            Action::Stage => write!(f, "STAGE"),
            Action::Sas(mode) => write!(f, "SAS {mode}"),
            Action::Abort => write!(f, "ABORT"),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Execution state of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum CommandState {
    #[default]
    Pending,
    Active,
    Completed,
}

impl CommandState {
    /// Next state given whether the condition holds this tick, plus whether
    /// the action fires. `Completed` absorbs every input.
    pub fn transition(self, satisfied: bool, one_shot: bool) -> (CommandState, bool) {
        match (self, satisfied) {
            (CommandState::Completed, _) => (CommandState::Completed, false),
            (CommandState::Pending, true) if one_shot => (CommandState::Completed, true),
            (CommandState::Pending, true) => (CommandState::Active, true),
            (CommandState::Pending, false) => (CommandState::Pending, false),
            (CommandState::Active, true) => (CommandState::Active, false),
            (CommandState::Active, false) => (CommandState::Pending, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCommand {
    pub id: usize,
    pub condition: Condition,
    pub action: Action,
    pub state: CommandState,
    pub one_shot: bool,
    pub source_text: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ScriptErrorKind {
    #[strum(to_string = "Invalid syntax")]
    InvalidSyntax,
    #[strum(to_string = "Invalid condition")]
    InvalidCondition,
    #[strum(to_string = "Invalid action")]
    InvalidAction,
}

/// One rejected line, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ScriptError {
    pub line: usize,
    pub kind: ScriptErrorKind,
}

/// Every error found in a rejected script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("script rejected with {} error(s)", .0.len())]
pub struct ParseErrors(pub Vec<ScriptError>);

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MissionScript {
    pub name: String,
    pub commands: Vec<ScriptCommand>,
}

impl MissionScript {
    /// Parse a whole script. Either every line parses or the full list of
    /// line errors is returned.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<MissionScript, ParseErrors> {
        let mut commands = Vec::new();
        let mut errors = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
                continue;
            }
            match parse_line(line) {
                Ok((condition, action)) => commands.push(ScriptCommand {
                    id: commands.len(),
                    condition,
                    one_shot: action.is_one_shot(),
                    action,
                    state: CommandState::Pending,
                    source_text: line.to_string(),
                }),
                Err(kind) => errors.push(ScriptError { line: idx + 1, kind }),
            }
        }

        if errors.is_empty() {
            Ok(MissionScript { name: name.into(), commands })
        } else {
            Err(ParseErrors(errors))
        }
    }

    /// Script text that parses back into the same commands.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for cmd in &self.commands {
            out.push_str(&cmd.source_text);
            out.push('\n');
        }
        out
    }

    /// Put every command back to `Pending`.
    pub fn reset(&mut self) {
        for cmd in &mut self.commands {
            cmd.state = CommandState::Pending;
        }
    }

    pub fn pending(&self) -> usize {
        self.commands.iter().filter(|c| c.state == CommandState::Pending).count()
    }
}

fn parse_line(line: &str) -> Result<(Condition, Action), ScriptErrorKind> {
    let tokens: Vec<String> = line.split_whitespace().map(str::to_ascii_uppercase).collect();
    if tokens.first().map(String::as_str) != Some("WHEN") {
        return Err(ScriptErrorKind::InvalidSyntax);
    }
    let then_at = tokens
        .iter()
        .position(|t| t == "THEN")
        .ok_or(ScriptErrorKind::InvalidSyntax)?;
    let cond_tokens = &tokens[1..then_at];
    let action_tokens = &tokens[then_at + 1..];
    if cond_tokens.is_empty() || action_tokens.is_empty() {
        return Err(ScriptErrorKind::InvalidSyntax);
    }

    let condition = parse_condition(cond_tokens).ok_or(ScriptErrorKind::InvalidCondition)?;
    let action = parse_action(action_tokens).ok_or(ScriptErrorKind::InvalidAction)?;
    Ok((condition, action))
}

fn parse_condition(tokens: &[String]) -> Option<Condition> {
    // clause (logic clause)*  =>  3 + 4k tokens
    if tokens.len() < 3 || (tokens.len() - 3) % 4 != 0 {
        return None;
    }
    let first = parse_clause(&tokens[0..3])?;
    let mut rest = Vec::new();
    for chunk in tokens[3..].chunks(4) {
        let logic: Logic = chunk[0].parse().ok()?;
        rest.push((logic, parse_clause(&chunk[1..4])?));
    }
    Some(Condition { first, rest })
}

fn parse_clause(tokens: &[String]) -> Option<Clause> {
    let variable: Variable = tokens[0].parse().ok()?;
    let comparator: Comparator = tokens[1].parse().ok()?;
    let threshold = parse_number(&tokens[2])?;
    Some(Clause { variable, comparator, threshold })
}

fn parse_action(tokens: &[String]) -> Option<Action> {
    let keyword = tokens[0].as_str();
    match (keyword, tokens.len()) {
        ("PITCH", 2) => parse_number(&tokens[1]).map(|deg| Action::Pitch(deg.to_radians())),
        ("THROTTLE", 2) => parse_number(&tokens[1]).map(|v| {
            let frac = if v > 1.0 { v / 100.0 } else { v };
            Action::Throttle(frac.clamp(0.0, 1.0))
        }),
        ("STAGE", 1) => Some(Action::Stage),
        ("ABORT", 1) => Some(Action::Abort),
        ("SAS", 2) => tokens[1].parse::<SasMode>().ok().map(Action::Sas),
        _ => None,
    }
}

fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}
