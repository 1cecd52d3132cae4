//! Console rendering of agent output and checkpoint history.

use std::io::{self, Write};

use owo_colors::{OwoColorize, Style};
use scout_core::{Checkpoint, Message, Role, Stage, StreamChunk, ToolCall};
use serde_json::Value;

const RULE: &str =
    "==========================================================";

/// Why the query could not be read from a tool call.
#[derive(Debug, thiserror::Error)]
pub enum ArgumentsError {
    /// The payload is not valid JSON.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The payload has no string `query` field.
    #[error("no string `query` field")]
    MissingQuery,
}

/// Extracts the search query from a tool call's argument payload.
pub fn tool_query(call: &ToolCall) -> Result<String, ArgumentsError> {
    let arguments: Value = serde_json::from_str(&call.arguments)?;
    arguments
        .get("query")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(ArgumentsError::MissingQuery)
}

enum Speaker {
    User,
    Agent,
    Other(Role),
}

impl From<Role> for Speaker {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Speaker::User,
            Role::Agent => Speaker::Agent,
            other => Speaker::Other(other),
        }
    }
}

/// Writes agent output and checkpoints in a human readable form.
///
/// Rendering never mutates what it renders, so the same input always
/// produces the same output.
#[derive(Clone, Copy, Debug, Default)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// Creates a renderer, optionally with terminal colors.
    #[inline]
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Creates a renderer without colors.
    #[inline]
    pub fn plain() -> Self {
        Self::new(false)
    }

    /// Writes the input prompt.
    pub fn render_prompt<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "\nUser:")?;
        out.flush()
    }

    /// Writes the goodbye message.
    pub fn render_farewell<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let style = Style::new().black().on_white();
        writeln!(out, "\n{}", self.paint("Agent:", style))?;
        writeln!(out, "{}", self.paint("Have a nice day! 👋", style))
    }

    /// Writes the visible part of one stream chunk.
    ///
    /// Only chunks from the agent stage are shown. Each message either
    /// announces the tools it calls or, when it calls none, is shown as
    /// the agent's answer.
    pub fn render_chunk<W: Write>(
        &self,
        out: &mut W,
        chunk: &StreamChunk,
    ) -> io::Result<()> {
        if chunk.stage != Stage::Agent {
            return Ok(());
        }

        for message in &chunk.messages {
            if message.tool_calls().is_empty() {
                self.render_answer(out, message)?;
                continue;
            }
            for call in message.tool_calls() {
                match tool_query(call) {
                    Ok(query) => self.render_tool_notice(out, call, &query)?,
                    Err(err) => {
                        warn!("bad arguments for tool `{}`: {err}", call.name);
                        writeln!(
                            out,
                            "\nCould not read the arguments of tool {}: {err}",
                            call.name
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Writes every checkpoint in the given order, with its messages.
    pub fn render_checkpoints<W: Write>(
        &self,
        out: &mut W,
        checkpoints: &[Checkpoint],
    ) -> io::Result<()> {
        writeln!(out, "\n{RULE}\n")?;

        for checkpoint in checkpoints {
            let meta = Style::new().bright_black();
            let header = self.paint("Checkpoint:", Style::new().white());
            writeln!(out, "{header}")?;
            writeln!(
                out,
                "{}",
                self.paint(
                    &format!("Timestamp: {}", checkpoint.ts().to_rfc3339()),
                    meta
                )
            )?;
            writeln!(
                out,
                "{}",
                self.paint(&format!("Checkpoint ID: {}", checkpoint.id()), meta)
            )?;

            for message in checkpoint.messages() {
                self.render_message(out, message)?;
            }
            writeln!(out)?;
        }

        writeln!(out, "{RULE}")
    }
}

impl Renderer {
    fn render_answer<W: Write>(
        &self,
        out: &mut W,
        message: &Message,
    ) -> io::Result<()> {
        let style = Style::new().black().on_white();
        writeln!(out, "\n{}", self.paint("Agent:", style))?;
        writeln!(out, "{}", self.paint(message.content(), style))
    }

    fn render_tool_notice<W: Write>(
        &self,
        out: &mut W,
        call: &ToolCall,
        query: &str,
    ) -> io::Result<()> {
        let text = Style::new().truecolor(0, 175, 255);
        let highlight = Style::new().on_truecolor(0, 175, 255);
        writeln!(
            out,
            "\n{}{}{}{}{}",
            self.paint("The agent is calling the tool ", text),
            self.paint(&call.name, highlight),
            self.paint(" with the query ", text),
            self.paint(query, highlight),
            self.paint(". Please wait for the agent's answer...", text),
        )
    }

    fn render_message<W: Write>(
        &self,
        out: &mut W,
        message: &Message,
    ) -> io::Result<()> {
        let label = match Speaker::from(message.role()) {
            Speaker::User => "User".to_owned(),
            Speaker::Agent => "Agent".to_owned(),
            Speaker::Other(role) => format!("Other ({role})"),
        };
        writeln!(
            out,
            "{} {}",
            self.paint(
                &format!("{label}: {}", message.content()),
                Style::new().bright_magenta()
            ),
            self.paint(
                &format!("(Message ID: {})", message.id()),
                Style::new().bright_cyan()
            ),
        )
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.style(style).to_string()
        } else {
            text.to_owned()
        }
    }
}
