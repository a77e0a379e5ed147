//! [`CompilerInvoker`] backed by a child process.
//!
//! The command line is the persisted [`CompilerArgs`] (executable first),
//! followed by the mode flag and the source paths. Stderr is drained on a
//! helper thread while stdout is read to completion on the calling thread, so
//! a compiler that fills both pipes cannot deadlock the build.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::SystemTime;

use idlmake_common::{file_mtime, CompilerArgs};
use idlmake_diagnostics::classify_output;
use idlmake_state::{parse_dependencies, parse_generated, StateError};
use tracing::{debug, info, warn};

use crate::error::InvokeError;
use crate::invoker::{CompilerInvoker, Invocation, InvokeMode};

/// Runs the real compiler executable.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    executable: PathBuf,
    args: CompilerArgs,
    depend_flag: String,
    generate_flag: String,
}

impl ProcessInvoker {
    /// Creates an invoker from an argument vector whose first element is the
    /// compiler executable.
    pub fn new(
        args: CompilerArgs,
        depend_flag: impl Into<String>,
        generate_flag: impl Into<String>,
    ) -> Result<Self, InvokeError> {
        let executable = args
            .iter()
            .next()
            .map(PathBuf::from)
            .ok_or_else(|| InvokeError::ToolNotFound {
                path: PathBuf::new(),
            })?;
        Ok(Self {
            executable,
            args,
            depend_flag: depend_flag.into(),
            generate_flag: generate_flag.into(),
        })
    }

    /// Returns the compiler executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Returns the full argument vector for one invocation, executable first.
    pub fn command_line(&self, sources: &[PathBuf], mode: InvokeMode) -> Vec<String> {
        let flag = match mode {
            InvokeMode::Depend => &self.depend_flag,
            InvokeMode::Generate => &self.generate_flag,
        };
        let mut argv: Vec<String> = self.args.iter().cloned().collect();
        argv.push(flag.clone());
        argv.extend(sources.iter().map(|s| s.display().to_string()));
        argv
    }

    fn failed(&self, source: std::io::Error) -> InvokeError {
        InvokeError::ToolInvocationFailed {
            tool: self.executable.clone(),
            source,
        }
    }

    fn run(&self, argv: &[String]) -> Result<(String, String, i32), InvokeError> {
        let mut child = Command::new(&self.executable)
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    InvokeError::ToolNotFound {
                        path: self.executable.clone(),
                    }
                } else {
                    self.failed(e)
                }
            })?;

        let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
            self.failed(std::io::Error::new(ErrorKind::BrokenPipe, "no stderr pipe"))
        })?;
        let stderr_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            stderr_pipe.read_to_end(&mut buf).map(|_| buf)
        });

        let mut stdout = Vec::new();
        let stdout_result = match child.stdout.take() {
            Some(mut pipe) => pipe.read_to_end(&mut stdout).map(|_| ()),
            None => Err(std::io::Error::new(ErrorKind::BrokenPipe, "no stdout pipe")),
        };

        let status = child.wait().map_err(|e| self.failed(e))?;
        let stderr = stderr_reader
            .join()
            .map_err(|_| self.failed(std::io::Error::other("stderr reader panicked")))?
            .map_err(|e| self.failed(e))?;
        stdout_result.map_err(|e| self.failed(e))?;

        Ok((
            String::from_utf8_lossy(&stdout).into_owned(),
            String::from_utf8_lossy(&stderr).into_owned(),
            status.code().unwrap_or(-1),
        ))
    }
}

impl CompilerInvoker for ProcessInvoker {
    fn invoke(&mut self, sources: &[PathBuf], mode: InvokeMode) -> Result<Invocation, InvokeError> {
        if sources.is_empty() {
            return Ok(Invocation::default());
        }

        let argv = self.command_line(sources, mode);
        info!(%mode, sources = sources.len(), "running {}", self.executable.display());
        debug!(argv = ?argv, "compiler command line");

        let (stdout, stderr, exit_code) = self.run(&argv)?;
        let diagnostics = classify_output(&stderr, exit_code);

        let mut invocation = Invocation {
            diagnostics,
            exit_code,
            ..Default::default()
        };

        let parsed: Result<(), StateError> = match mode {
            InvokeMode::Depend => parse_dependencies(&stdout).map(|m| invocation.dependencies = m),
            InvokeMode::Generate => parse_generated(&stdout).map(|m| invocation.generated = m),
        };
        if let Err(e) = parsed {
            if exit_code == 0 {
                return Err(self.failed(std::io::Error::new(ErrorKind::InvalidData, e)));
            }
            warn!(%mode, error = %e, "ignoring unparsable output from failed compiler run");
        }

        debug!(%mode, exit_code, diagnostics = invocation.diagnostics.len(), "compiler finished");
        Ok(invocation)
    }

    fn compiler_mtime(&self) -> Option<SystemTime> {
        file_mtime(&self.executable)
    }
}
