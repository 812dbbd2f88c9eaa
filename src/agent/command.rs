use crate::agent::prompt::storyboard_prompt;
use crate::agent::{AgentError, StoryboardAgent};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Options for [`CommandAgent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandAgentOpts {
    pub program: String,
    pub args: Vec<String>,
    /// Upper bound on one model call. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for CommandAgentOpts {
    fn default() -> Self {
        Self {
            program: "ollama".to_owned(),
            args: vec!["run".to_owned(), "llama3".to_owned()],
            timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// Agent backed by an external program that reads the prompt on stdin and writes its answer to
/// stdout, e.g. `ollama run llama3`.
#[derive(Clone, Debug, Default)]
pub struct CommandAgent {
    opts: CommandAgentOpts,
}

impl CommandAgent {
    pub fn new(opts: CommandAgentOpts) -> Self {
        Self { opts }
    }

    /// Build an agent from a whitespace-separated command line.
    pub fn from_command_line(line: &str, timeout: Option<Duration>) -> Result<Self, AgentError> {
        let mut words = line.split_whitespace().map(str::to_owned);
        let program = words
            .next()
            .ok_or_else(|| AgentError::Command("agent command is empty".to_owned()))?;
        Ok(Self::new(CommandAgentOpts {
            program,
            args: words.collect(),
            timeout,
        }))
    }

    /// Run the command with `input` on stdin and return its stdout.
    pub(crate) fn run(&self, input: &str) -> Result<String, AgentError> {
        let mut child = Command::new(&self.opts.program)
            .args(&self.opts.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AgentError::Command(format!(
                    "failed to spawn '{}' (is it installed and on PATH?): {e}",
                    self.opts.program
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::Command("failed to open agent stdin".to_owned()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Command("failed to open agent stdout".to_owned()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AgentError::Command("failed to open agent stderr".to_owned()))?;

        let input = input.to_owned();
        let feed = std::thread::spawn(move || stdin.write_all(input.as_bytes()));
        let stdout_drain = std::thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).map(|_| buf)
        });

        let deadline = self.opts.timeout.map(|t| Instant::now() + t);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    return Err(AgentError::Command(format!("failed to wait for agent: {e}")));
                }
            }
            if let (Some(deadline), Some(after)) = (deadline, self.opts.timeout)
                && Instant::now() >= deadline
            {
                let _ = child.kill();
                let _ = child.wait();
                return Err(AgentError::Timeout(after));
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        // A program that exits without reading its input closes the pipe; that is not our error.
        let _ = feed.join();
        let stdout = stdout_drain
            .join()
            .map_err(|_| AgentError::Command("agent stdout drain thread panicked".to_owned()))?
            .map_err(|e| AgentError::Command(format!("agent stdout read failed: {e}")))?;
        let stderr = stderr_drain
            .join()
            .map(|r| r.unwrap_or_default())
            .unwrap_or_default();

        if !status.success() {
            return Err(AgentError::Command(format!(
                "'{}' exited with status {status}: {}",
                self.opts.program,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        String::from_utf8(stdout)
            .map_err(|_| AgentError::Command("agent output is not valid UTF-8".to_owned()))
    }
}

impl StoryboardAgent for CommandAgent {
    fn generate(&self, transcript: &str) -> Result<String, AgentError> {
        tracing::debug!(program = %self.opts.program, "asking agent for a storyboard");
        self.run(&storyboard_prompt(transcript))
    }

    fn regenerate(&self, transcript: &str, problem: &str) -> Result<String, AgentError> {
        tracing::debug!(program = %self.opts.program, %problem, "asking agent to retry");
        self.run(&crate::agent::prompt::retry_prompt(transcript, problem))
    }
}
