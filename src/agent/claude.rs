//! Claude CLI turn executor
//!
//! Spawns the `claude` CLI in non-interactive stream-json mode for exactly
//! one conversational turn, accumulates the assistant text fragments,
//! captures the session id for continuation, and publishes tool-use notices
//! to the event bus side channel as they stream past.
//!
//! Each spawn is an independent request/response against the external
//! service; resuming a conversation happens purely via `--resume <session>`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use super::error::AgentError;
use super::executor::TurnExecutor;
use super::types::{ToolGrant, TurnOutput, TurnRequest};
use crate::events::EventBus;
use crate::session::SessionId;

/// Longest tool-input preview shown in the activity log
const TOOL_DETAIL_LIMIT: usize = 40;

/// Turn executor backed by the `claude` CLI
pub struct ClaudeTurnExecutor {
    binary: PathBuf,
    bus: Arc<EventBus>,
}

impl ClaudeTurnExecutor {
    /// Create an executor using `claude` from PATH
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            binary: PathBuf::from("claude"),
            bus,
        }
    }

    /// Override the agent binary path
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    fn build_command(&self, request: &TurnRequest) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-p")
            .arg(&request.prompt)
            .arg("--output-format")
            .arg("stream-json")
            .arg("--verbose");

        if !request.system_prompt.is_empty() {
            cmd.arg("--system-prompt").arg(&request.system_prompt);
        }

        cmd.arg("--allowed-tools").arg(request.tools.allowed_tools().join(","));
        if request.tools == ToolGrant::Write {
            cmd.arg("--permission-mode").arg("acceptEdits");
        }

        if let Some(session) = &request.session {
            cmd.arg("--resume").arg(session.as_str());
        }

        cmd.current_dir(&request.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl TurnExecutor for ClaudeTurnExecutor {
    async fn run_turn(&self, request: TurnRequest) -> Result<TurnOutput, AgentError> {
        debug!(
            cwd = %request.cwd.display(),
            resuming = request.session.is_some(),
            tools = ?request.tools,
            "ClaudeTurnExecutor::run_turn: spawning agent"
        );

        let mut child = self.build_command(&request).spawn().map_err(AgentError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Malformed("agent stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AgentError::Malformed("agent stderr not captured".to_string()))?;

        // Drain stderr concurrently so the child never blocks on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut accumulator = TurnAccumulator::default();
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await.map_err(AgentError::Io)? {
            if line.trim().is_empty() {
                continue;
            }
            for notice in accumulator.feed_line(&line) {
                self.bus.tool_used(notice.tool, notice.detail);
            }
        }

        let status = child.wait().await.map_err(AgentError::Io)?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            warn!(code = ?status.code(), "ClaudeTurnExecutor: agent exited non-zero");
            return Err(AgentError::Exit {
                code: status.code(),
                stderr: tail(&stderr_text, 400),
            });
        }

        accumulator.into_output()
    }
}

/// A tool-use notice observed in the stream (side channel only)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolNotice {
    pub tool: String,
    pub detail: String,
}

/// Incremental parser for the agent's stream-json output
///
/// Feeds one JSONL line at a time: assistant text fragments accumulate,
/// tool-use blocks surface as notices, and the terminal `result` line
/// carries the canonical final text, session id, and turn count.
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    text: String,
    result_text: Option<String>,
    session: Option<String>,
    num_turns: u32,
    result_is_error: bool,
}

impl TurnAccumulator {
    /// Parse one stream line, returning any tool-use notices it contained
    ///
    /// Unparseable lines are skipped: the CLI interleaves diagnostics with
    /// the JSON stream and a single bad line must not abort the turn.
    pub fn feed_line(&mut self, line: &str) -> Vec<ToolNotice> {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => {
                debug!(line_len = line.len(), "TurnAccumulator: skipping non-JSON line");
                return Vec::new();
            }
        };

        let mut notices = Vec::new();
        match value.get("type").and_then(Value::as_str) {
            Some("system") => {
                if let Some(sid) = value.get("session_id").and_then(Value::as_str) {
                    self.session = Some(sid.to_string());
                }
            }
            Some("assistant") => {
                let blocks = value
                    .pointer("/message/content")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                for block in blocks {
                    match block.get("type").and_then(Value::as_str) {
                        Some("text") => {
                            if let Some(text) = block.get("text").and_then(Value::as_str) {
                                self.text.push_str(text);
                            }
                        }
                        Some("tool_use") => {
                            let tool = block
                                .get("name")
                                .and_then(Value::as_str)
                                .unwrap_or("unknown")
                                .to_string();
                            let detail = summarize_tool_input(&tool, block.get("input"));
                            notices.push(ToolNotice { tool, detail });
                        }
                        _ => {}
                    }
                }
            }
            Some("result") => {
                self.result_is_error = value
                    .get("is_error")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if let Some(text) = value.get("result").and_then(Value::as_str) {
                    self.result_text = Some(text.to_string());
                }
                if let Some(sid) = value.get("session_id").and_then(Value::as_str) {
                    self.session = Some(sid.to_string());
                }
                if let Some(turns) = value.get("num_turns").and_then(Value::as_u64) {
                    self.num_turns = turns as u32;
                }
            }
            _ => {}
        }
        notices
    }

    /// Finalize the turn: the result line's text wins over accumulated
    /// fragments, and an empty turn is an error
    pub fn into_output(self) -> Result<TurnOutput, AgentError> {
        if self.result_is_error {
            let detail = self.result_text.unwrap_or_else(|| "agent reported an error".to_string());
            return Err(AgentError::Malformed(detail));
        }

        let text = match self.result_text {
            Some(t) if !t.is_empty() => t,
            _ => self.text,
        };
        if text.is_empty() {
            return Err(AgentError::EmptyResponse);
        }

        Ok(TurnOutput {
            text,
            session: self.session.and_then(SessionId::new),
            num_turns: self.num_turns.max(1),
        })
    }
}

/// Build a short activity-log preview of a tool invocation
fn summarize_tool_input(tool: &str, input: Option<&Value>) -> String {
    let Some(input) = input else {
        return String::new();
    };
    let field = match tool {
        "Read" | "Write" => "file_path",
        "Grep" | "Glob" => "pattern",
        "Bash" => "command",
        _ => return String::new(),
    };
    let raw = input.get(field).and_then(Value::as_str).unwrap_or_default();
    truncate_chars(raw, TOOL_DETAIL_LIMIT)
}

fn truncate_chars(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        s.to_string()
    } else {
        let prefix: String = s.chars().take(limit.saturating_sub(3)).collect();
        format!("{}...", prefix)
    }
}

fn tail(s: &str, limit: usize) -> String {
    let trimmed = s.trim();
    if trimmed.len() <= limit {
        trimmed.to_string()
    } else {
        let start = trimmed.len() - limit;
        // Avoid splitting a UTF-8 sequence
        let start = (start..trimmed.len())
            .find(|i| trimmed.is_char_boundary(*i))
            .unwrap_or(start);
        trimmed[start..].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_text_fragments() {
        let mut acc = TurnAccumulator::default();
        acc.feed_line(r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Hello "}]}}"#);
        acc.feed_line(r#"{"type":"assistant","message":{"content":[{"type":"text","text":"world"}]}}"#);

        let out = acc.into_output().unwrap();
        assert_eq!(out.text, "Hello world");
        assert!(out.session.is_none());
    }

    #[test]
    fn test_result_text_wins_and_session_is_captured() {
        let mut acc = TurnAccumulator::default();
        acc.feed_line(r#"{"type":"assistant","message":{"content":[{"type":"text","text":"partial"}]}}"#);
        acc.feed_line(r#"{"type":"result","result":"final answer","session_id":"sess-1","num_turns":3}"#);

        let out = acc.into_output().unwrap();
        assert_eq!(out.text, "final answer");
        assert_eq!(out.session.unwrap().as_str(), "sess-1");
        assert_eq!(out.num_turns, 3);
    }

    #[test]
    fn test_tool_use_emits_notice() {
        let mut acc = TurnAccumulator::default();
        let notices = acc.feed_line(
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Read","input":{"file_path":"src/main.rs"}}]}}"#,
        );
        assert_eq!(
            notices,
            vec![ToolNotice {
                tool: "Read".to_string(),
                detail: "src/main.rs".to_string()
            }]
        );
    }

    #[test]
    fn test_long_bash_command_is_truncated() {
        let command = "a".repeat(100);
        let line = format!(
            r#"{{"type":"assistant","message":{{"content":[{{"type":"tool_use","name":"Bash","input":{{"command":"{}"}}}}]}}}}"#,
            command
        );
        let mut acc = TurnAccumulator::default();
        let notices = acc.feed_line(&line);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].detail.len() <= TOOL_DETAIL_LIMIT);
        assert!(notices[0].detail.ends_with("..."));
    }

    #[test]
    fn test_non_json_lines_are_skipped() {
        let mut acc = TurnAccumulator::default();
        assert!(acc.feed_line("warning: something informational").is_empty());
        acc.feed_line(r#"{"type":"result","result":"ok","session_id":"s"}"#);
        assert_eq!(acc.into_output().unwrap().text, "ok");
    }

    #[test]
    fn test_empty_turn_is_error() {
        let acc = TurnAccumulator::default();
        assert!(matches!(acc.into_output(), Err(AgentError::EmptyResponse)));
    }

    #[test]
    fn test_error_result_is_error() {
        let mut acc = TurnAccumulator::default();
        acc.feed_line(r#"{"type":"result","is_error":true,"result":"rate limited"}"#);
        match acc.into_output() {
            Err(AgentError::Malformed(detail)) => assert_eq!(detail, "rate limited"),
            other => panic!("expected Malformed, got {:?}", other.map(|o| o.text)),
        }
    }

    #[test]
    fn test_system_init_session_id() {
        let mut acc = TurnAccumulator::default();
        acc.feed_line(r#"{"type":"system","subtype":"init","session_id":"boot-7"}"#);
        acc.feed_line(r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi"}]}}"#);
        let out = acc.into_output().unwrap();
        assert_eq!(out.session.unwrap().as_str(), "boot-7");
    }
}
