use std::{fmt::Write as _, sync::OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use crate::{
    commands::{
        dispatcher::{CommandHandler, DispatchContext, Outcome},
        handlers::HandlerDeps,
    },
    reminders::{format_time, ReminderScheduler},
    Result,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalcError {
    #[error("Empty expression")]
    Empty,
    #[error("Unexpected character '{0}'")]
    Unexpected(char),
    #[error("Unexpected end of expression")]
    UnexpectedEnd,
    #[error("Invalid number '{0}'")]
    BadNumber(String),
    #[error("Missing closing parenthesis")]
    Unbalanced,
    #[error("Result is not a finite number")]
    NotFinite,
    #[error("Expression is nested too deeply")]
    TooDeep,
}

/// Maximum parenthesis nesting accepted by [`evaluate`].
pub const MAX_NESTING: usize = 100;

/// Drop anything that is not a digit, operator, parenthesis, dot or whitespace.
pub fn sanitize_expression(expr: &str) -> String {
    static STRIP_RE: OnceLock<Regex> = OnceLock::new();
    let re = STRIP_RE.get_or_init(|| Regex::new(r"[^0-9+\-*/().\s]").expect("valid regex"));
    re.replace_all(expr, "").trim().to_string()
}

/// Evaluate `+ - * /` with the usual precedence, parentheses and unary minus.
pub fn evaluate(expr: &str) -> std::result::Result<f64, CalcError> {
    let tokens: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }
    let mut p = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = p.expr()?;
    if let Some(c) = p.peek() {
        return Err(CalcError::Unexpected(c));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

struct Parser {
    tokens: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expr(&mut self) -> std::result::Result<f64, CalcError> {
        let mut acc = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            acc = if op == '+' { acc + rhs } else { acc - rhs };
        }
        Ok(acc)
    }

    fn term(&mut self) -> std::result::Result<f64, CalcError> {
        let mut acc = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            acc = if op == '*' { acc * rhs } else { acc / rhs };
        }
        Ok(acc)
    }

    fn factor(&mut self) -> std::result::Result<f64, CalcError> {
        // Sign runs are folded here; only parentheses recurse.
        let mut negate = false;
        while let Some(sign @ ('-' | '+')) = self.peek() {
            self.pos += 1;
            negate ^= sign == '-';
        }
        let value = self.atom()?;
        Ok(if negate { -value } else { value })
    }

    fn atom(&mut self) -> std::result::Result<f64, CalcError> {
        match self.bump() {
            None => Err(CalcError::UnexpectedEnd),
            Some('(') => {
                if self.depth >= MAX_NESTING {
                    return Err(CalcError::TooDeep);
                }
                self.depth += 1;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.bump() {
                    Some(')') => Ok(inner),
                    _ => Err(CalcError::Unbalanced),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos - 1;
                while matches!(self.peek(), Some(d) if d.is_ascii_digit() || d == '.') {
                    self.pos += 1;
                }
                let literal: String = self.tokens[start..self.pos].iter().collect();
                literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::BadNumber(literal))
            }
            Some(c) => Err(CalcError::Unexpected(c)),
        }
    }
}

/// Whole numbers print without a fractional part.
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

pub struct CalcHandler {
    prefix: char,
}

impl CalcHandler {
    pub fn new(prefix: char) -> Self {
        Self { prefix }
    }

    pub fn render(&self, input: &str) -> String {
        let sanitized = sanitize_expression(input);
        match evaluate(&sanitized) {
            Ok(v) => format!(
                "🧮 *Calculator Result*\n\n📝 *Expression:* {sanitized}\n🔢 *Result:* {}\n\n💡 *Calculation completed successfully!*",
                format_number(v)
            ),
            Err(e) => format!(
                "❌ *Calculator Error*\n\n📝 *Expression:* {input}\n🚫 *Error:* {e}\n\n💡 *Please check your expression and try again.*"
            ),
        }
    }
}

#[async_trait]
impl CommandHandler for CalcHandler {
    async fn handle(&self, args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
        if args.is_empty() {
            let pf = self.prefix;
            return Ok(Outcome::Reply(format!(
                "🧮 *Calculator*\n\nUsage: {pf}calc [expression]\nExample: {pf}calc 2 + 2 * 3\n\n\
                 📝 *Supported operators:*\n• + (addition)\n• - (subtraction)\n• * (multiplication)\n\
                 • / (division)\n• () (parentheses)"
            )));
        }
        Ok(Outcome::Reply(self.render(&args.join(" "))))
    }
}

/// Applied in order, so earlier keywords win over later overlaps.
const EMOJI_KEYWORDS: &[(&str, &str)] = &[
    ("hello", "👋"),
    ("hi", "👋"),
    ("love", "❤️"),
    ("heart", "💖"),
    ("happy", "😊"),
    ("smile", "😄"),
    ("sad", "😢"),
    ("cry", "😭"),
    ("fire", "🔥"),
    ("hot", "🔥"),
    ("star", "⭐"),
    ("cool", "😎"),
    ("good", "👍"),
    ("bad", "👎"),
    ("morning", "🌅"),
    ("night", "🌙"),
    ("sun", "☀️"),
    ("moon", "🌙"),
    ("music", "🎵"),
    ("dance", "💃"),
    ("party", "🎉"),
    ("food", "🍕"),
    ("coffee", "☕"),
    ("water", "💧"),
    ("car", "🚗"),
    ("home", "🏠"),
    ("work", "💼"),
    ("money", "💰"),
    ("time", "⏰"),
    ("phone", "📱"),
    ("computer", "💻"),
    ("book", "📚"),
    ("game", "🎮"),
];

pub fn emojify(text: &str) -> String {
    static KEYWORD_RES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let res = KEYWORD_RES.get_or_init(|| {
        EMOJI_KEYWORDS
            .iter()
            .map(|(word, emoji)| {
                (
                    Regex::new(&format!("(?i){word}")).expect("valid regex"),
                    *emoji,
                )
            })
            .collect()
    });
    res.iter().fold(text.to_string(), |acc, (re, emoji)| {
        re.replace_all(&acc, *emoji).into_owned()
    })
}

pub struct EmojiHandler {
    prefix: char,
}

impl EmojiHandler {
    pub fn new(prefix: char) -> Self {
        Self { prefix }
    }
}

#[async_trait]
impl CommandHandler for EmojiHandler {
    async fn handle(&self, args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
        let pf = self.prefix;
        if args.is_empty() {
            return Ok(Outcome::Reply(format!(
                "😀 *Emoji Converter*\n\nUsage: {pf}emoji [text]\n\nExamples:\n{pf}emoji hello world\n\
                 {pf}emoji I love coding\n{pf}emoji good morning\n\n\
                 💡 *Try different words to see various emoji combinations!*"
            )));
        }
        let text = args.join(" ");
        Ok(Outcome::Reply(format!(
            "😀 *Emoji Conversion Result*\n\n📝 *Original:* {text}\n😊 *With Emojis:* {}\n\n\
             💡 *Tip:* Try words like love, fire, star, happy, cool for more emojis!",
            emojify(&text)
        )))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontStyle {
    Bold,
    Italic,
    Monospace,
}

impl FontStyle {
    /// Code point bases for `A`, `a` and `0`.
    fn bases(self) -> (u32, u32, Option<u32>) {
        match self {
            Self::Bold => (0x1D400, 0x1D41A, Some(0x1D7CE)),
            Self::Italic => (0x1D434, 0x1D44E, None),
            Self::Monospace => (0x1D670, 0x1D68A, Some(0x1D7F6)),
        }
    }

    pub fn apply(self, text: &str) -> String {
        let (upper, lower, digit) = self.bases();
        text.chars()
            .map(|c| {
                // Italic small h lives in the letterlike block.
                if self == Self::Italic && c == 'h' {
                    return 'ℎ';
                }
                let mapped = match c {
                    'A'..='Z' => Some(upper + (c as u32 - 'A' as u32)),
                    'a'..='z' => Some(lower + (c as u32 - 'a' as u32)),
                    '0'..='9' => digit.map(|d| d + (c as u32 - '0' as u32)),
                    _ => None,
                };
                mapped.and_then(char::from_u32).unwrap_or(c)
            })
            .collect()
    }
}

pub struct FontHandler {
    prefix: char,
}

impl FontHandler {
    pub fn new(prefix: char) -> Self {
        Self { prefix }
    }
}

#[async_trait]
impl CommandHandler for FontHandler {
    async fn handle(&self, args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
        let pf = self.prefix;
        if args.is_empty() {
            return Ok(Outcome::Reply(format!(
                "🔤 *Stylish Font Generator*\n\nUsage: {pf}font [text]\n\nExamples:\n{pf}font Hello World\n\n\
                 🎨 *Available styles:*\n• Bold\n• Italic\n• Monospace"
            )));
        }
        let text = args.join(" ");
        Ok(Outcome::Reply(format!(
            "🔤 *Stylish Fonts Generated*\n\n📝 *Original:* {text}\n\n\
             🔥 *Bold:* {}\n✨ *Italic:* {}\n💻 *Monospace:* {}\n\n\
             💡 *Copy and paste the style you like!*",
            FontStyle::Bold.apply(&text),
            FontStyle::Italic.apply(&text),
            FontStyle::Monospace.apply(&text),
        )))
    }
}

/// `remind <spec> <message...>`.
pub struct RemindHandler {
    prefix: char,
    reminders: ReminderScheduler,
}

impl RemindHandler {
    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            prefix: deps.prefix,
            reminders: deps.reminders.clone(),
        }
    }
}

#[async_trait]
impl CommandHandler for RemindHandler {
    async fn handle(&self, args: &[String], ctx: &DispatchContext) -> Result<Outcome> {
        let pf = self.prefix;
        if args.len() < 2 {
            return Ok(Outcome::Reply(format!(
                "⏰ *Reminder System*\n\nUsage: {pf}remind [time] [message]\n\nExamples:\n\
                 {pf}remind 5m Take a break\n{pf}remind 1h Meeting with team\n{pf}remind 2d Pay bills\n\n\
                 ⏱️ *Time formats:*\n• m = minutes\n• h = hours\n• d = days\n\n\
                 📝 *Note:* Maximum reminder time is 7 days."
            )));
        }

        let spec = &args[0];
        let message = args[1..].join(" ");
        match self.reminders.schedule(spec, &message, &ctx.identity) {
            Ok(r) => {
                info!(identity = %ctx.identity, id = %r.id, spec = %spec, "reminder scheduled");
                Ok(Outcome::Reply(format!(
                    "⏰ *Reminder Set Successfully*\n\n⏱️ *Time:* {}\n📝 *Message:* {}\n\
                     📅 *Will remind at:* {}\n🆔 *Reminder ID:* {}\n\n\
                     ✅ *You will be reminded when the time comes!*",
                    r.spec,
                    r.message,
                    format_time(r.due_at),
                    r.id
                )))
            }
            Err(e) => Ok(Outcome::Reply(format!(
                "❌ *Reminder Setup Failed*\n\n🚫 *Error:* {e}\n\n💡 *Please check the time format and try again.*"
            ))),
        }
    }
}

pub struct ListRemindersHandler {
    prefix: char,
    reminders: ReminderScheduler,
}

impl ListRemindersHandler {
    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            prefix: deps.prefix,
            reminders: deps.reminders.clone(),
        }
    }
}

#[async_trait]
impl CommandHandler for ListRemindersHandler {
    async fn handle(&self, _args: &[String], ctx: &DispatchContext) -> Result<Outcome> {
        let live = self.reminders.list_for(&ctx.identity);
        if live.is_empty() {
            return Ok(Outcome::Reply(format!(
                "⏰ *Your Reminders*\n\nYou have no active reminders.\nSet one with {}remind 5m Take a break",
                self.prefix
            )));
        }
        let mut out = format!("⏰ *Your Reminders* ({})\n", live.len());
        for r in &live {
            let _ = write!(
                out,
                "\n🆔 {}\n📝 {}\n📅 {}\n",
                r.id,
                r.message,
                format_time(r.due_at)
            );
        }
        let _ = write!(out, "\n💡 *Cancel with {}cancelreminder [id]*", self.prefix);
        Ok(Outcome::Reply(out))
    }
}

pub struct CancelReminderHandler {
    prefix: char,
    reminders: ReminderScheduler,
}

impl CancelReminderHandler {
    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            prefix: deps.prefix,
            reminders: deps.reminders.clone(),
        }
    }
}

#[async_trait]
impl CommandHandler for CancelReminderHandler {
    async fn handle(&self, args: &[String], ctx: &DispatchContext) -> Result<Outcome> {
        let Some(id) = args.first() else {
            return Ok(Outcome::Reply(format!(
                "⏰ *Cancel Reminder*\n\nUsage: {pf}cancelreminder [id]\n\nSee your ids with {pf}reminders",
                pf = self.prefix
            )));
        };
        if self.reminders.cancel_owned(&ctx.identity, id) {
            info!(identity = %ctx.identity, id = %id, "reminder cancelled");
            Ok(Outcome::Reply(format!(
                "✅ *Reminder Cancelled*\n\n🆔 *Reminder ID:* {id}"
            )))
        } else {
            Ok(Outcome::Reply(format!(
                "❌ *Reminder Not Found*\n\nNo active reminder with id {id}."
            )))
        }
    }
}
